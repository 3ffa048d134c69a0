//! Asking the user what to do with a proposed message.

use dialoguer::Select;

use crate::error::FlowError;
use crate::llm::ProposedMessage;

use super::flow::UserDecision;

/// Shows a proposal and reads one decision.
///
/// When `retry_allowed` is false the implementation must not offer Retry.
pub trait DecisionPrompter {
    fn decide(
        &mut self,
        proposal: &ProposedMessage,
        retry_allowed: bool,
    ) -> Result<UserDecision, FlowError>;
}

/// Interactive prompt on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

/// Menu entries in display order, limited by whether retry is on offer.
fn choices(retry_allowed: bool) -> Vec<(&'static str, UserDecision)> {
    let mut items = vec![("Commit with this message", UserDecision::Accept)];
    if retry_allowed {
        items.push(("Generate another message", UserDecision::Retry));
    }
    items.push(("Abort", UserDecision::Reject));
    items
}

impl DecisionPrompter for TerminalPrompter {
    fn decide(
        &mut self,
        proposal: &ProposedMessage,
        retry_allowed: bool,
    ) -> Result<UserDecision, FlowError> {
        println!();
        println!("Suggested commit message:");
        println!("> {}", proposal.sanitized_text);
        println!();

        let items = choices(retry_allowed);
        let labels: Vec<&str> = items.iter().map(|(label, _)| *label).collect();

        let selection = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact_opt()
            .map_err(|e| FlowError::Prompt(e.to_string()))?;

        // Esc or q dismisses the menu, which reads as a rejection.
        Ok(selection
            .and_then(|i| items.get(i).map(|(_, decision)| *decision))
            .unwrap_or(UserDecision::Reject))
    }
}
