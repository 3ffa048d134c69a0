//! Prompt construction, the inference endpoint client, and response cleanup.

pub mod client;
pub mod prompt;
pub mod sanitize;

pub use client::{HfInferenceClient, InferenceClient};
pub use prompt::{ChatMessage, ChatRequest, RetryContext, Role, build_request};
pub use sanitize::{ELLIPSIS, ProposedMessage, sanitize};
