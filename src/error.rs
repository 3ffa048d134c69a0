//! Error types for gitai modules using thiserror.

use thiserror::Error;

/// Errors from the version-control collaborator.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository (or any parent directory): {0}")]
    NotARepository(#[source] git2::Error),

    #[error("Failed to read staged diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Bare repositories are not supported")]
    BareRepository,

    #[error("Failed to run git: {0}")]
    GitUnavailable(#[source] std::io::Error),

    #[error("git commit failed: {0}")]
    CommitFailed(String),
}

/// Errors from the configuration store.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine a configuration directory for this platform")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Errors from the inference endpoint.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error(
        "Missing Hugging Face token. Set it via 'gitai config set-token' or the HF_API_TOKEN environment variable"
    )]
    MissingCredential,

    #[error("Failed to generate commit message: {0}")]
    RequestFailed(String),

    #[error("Inference endpoint returned an unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Errors that end a commit flow in the failed state.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("The model returned an empty commit message")]
    EmptyMessage,

    #[error("Failed to read your choice: {0}")]
    Prompt(String),
}
