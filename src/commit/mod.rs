//! The interactive commit flow: propose a message, let the user decide, commit.

pub mod flow;
pub mod prompter;

pub use flow::{CommitFlow, FlowOutcome, UserDecision};
pub use prompter::{DecisionPrompter, TerminalPrompter};
