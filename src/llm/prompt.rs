//! Chat request construction for commit message generation.

use serde::Serialize;

use crate::config::{GenerationConfig, Provider};
use crate::git::DiffBundle;

/// Cue at the end of the user turn that biases the model toward a bare message.
pub const COMPLETION_CUE: &str = "Commit message:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// One stateless chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub provider: Provider,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The message the user rejected on the previous attempt, if any.
///
/// Only the latest rejection is kept; earlier ones are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryContext {
    previous_message: Option<String>,
}

impl RetryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for the next attempt after `message` was sent back for another try.
    pub fn after_rejection(message: impl Into<String>) -> Self {
        Self {
            previous_message: Some(message.into()),
        }
    }

    pub fn previous_message(&self) -> Option<&str> {
        self.previous_message.as_deref().filter(|m| !m.is_empty())
    }
}

/// Text appended to the system prompt when retrying.
pub fn feedback_clause(previous_message: &str) -> String {
    format!(
        " The previous suggestion was: \"{previous_message}\". The user rejected it, \
so generate a different, more accurate commit message."
    )
}

/// Build the system and user turns from the stored prompt and the staged diff.
pub fn build_request(
    diff: &DiffBundle,
    config: &GenerationConfig,
    retry: &RetryContext,
) -> ChatRequest {
    let mut system = config.system_prompt.clone();
    if let Some(previous) = retry.previous_message() {
        system.push_str(&feedback_clause(previous));
    }

    let user = format!(
        "Files changed summary:\n{}\n\nDiff:\n{}\n\n{}",
        diff.summary_text, diff.diff_text, COMPLETION_CUE
    );

    ChatRequest {
        model: config.model.clone(),
        provider: config.provider,
        messages: vec![
            ChatMessage {
                role: Role::System,
                content: system,
            },
            ChatMessage {
                role: Role::User,
                content: user,
            },
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}
