//! gitai - propose commit messages for staged changes using a hosted LLM.
//!
//! # Overview
//!
//! gitai reads the staged diff, asks a chat completion endpoint for a one-line
//! commit message, and lets the user accept it, reject it, or ask for another
//! one. Accepted messages are committed with the git CLI.

pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;

// Re-export commonly used types
pub use commit::{CommitFlow, DecisionPrompter, FlowOutcome, TerminalPrompter, UserDecision};
pub use config::{ConfigStore, FileConfigStore, GenerationConfig, MemoryConfigStore, Provider};
pub use error::{ConfigError, FlowError, GitError, InferenceError};
pub use git::{DiffBundle, DiffOutcome, GitRepository, VersionControl};
pub use llm::{HfInferenceClient, InferenceClient, ProposedMessage};
