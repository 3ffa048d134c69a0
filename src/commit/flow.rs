//! The accept / reject / retry loop around one staged change set.

use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::error::FlowError;
use crate::git::{DiffBundle, DiffOutcome, VersionControl, collect_diff};
use crate::llm::{InferenceClient, ProposedMessage, RetryContext, build_request};

use super::prompter::DecisionPrompter;

/// What the user chose to do with a proposed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDecision {
    Accept,
    Reject,
    Retry,
}

/// How a commit flow ended, short of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The accepted message was committed. `summary` is git's first output line.
    Committed { message: String, summary: String },
    /// Nothing was staged; no request was sent.
    NoChanges,
    /// The user rejected the proposal; nothing was committed.
    Aborted,
}

enum FlowState {
    Collecting,
    Generating {
        diff: DiffBundle,
        retry: RetryContext,
    },
    AwaitingDecision {
        diff: DiffBundle,
        proposal: ProposedMessage,
    },
    Committing {
        message: String,
    },
    Finished(FlowOutcome),
}

/// Drives one `commit` invocation from diff collection to a terminal outcome.
///
/// An `Err` from [`CommitFlow::run`] is the failed terminal state. Only the
/// most recent proposal is carried into a retry.
pub struct CommitFlow<'a> {
    vcs: &'a dyn VersionControl,
    client: &'a dyn InferenceClient,
    prompter: &'a mut dyn DecisionPrompter,
    config: GenerationConfig,
    attempts: u32,
}

impl<'a> CommitFlow<'a> {
    pub fn new(
        vcs: &'a dyn VersionControl,
        client: &'a dyn InferenceClient,
        prompter: &'a mut dyn DecisionPrompter,
        config: GenerationConfig,
    ) -> Self {
        Self {
            vcs,
            client,
            prompter,
            config,
            attempts: 0,
        }
    }

    /// Number of inference requests made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn retry_allowed(&self) -> bool {
        match self.config.max_retries {
            Some(cap) => self.attempts.saturating_sub(1) < cap,
            None => true,
        }
    }

    pub async fn run(&mut self) -> Result<FlowOutcome, FlowError> {
        let mut state = FlowState::Collecting;

        loop {
            state = match state {
                FlowState::Collecting => match collect_diff(self.vcs)? {
                    DiffOutcome::NoChanges => {
                        debug!("No staged changes");
                        FlowState::Finished(FlowOutcome::NoChanges)
                    }
                    DiffOutcome::Staged(diff) => {
                        if diff.truncated {
                            info!("Staged diff was truncated before sending");
                        }
                        FlowState::Generating {
                            diff,
                            retry: RetryContext::new(),
                        }
                    }
                },

                FlowState::Generating { diff, retry } => {
                    let proposal = self.generate(&diff, &retry).await?;
                    FlowState::AwaitingDecision { diff, proposal }
                }

                FlowState::AwaitingDecision { diff, proposal } => {
                    let retry_allowed = self.retry_allowed();
                    match self.prompter.decide(&proposal, retry_allowed)? {
                        UserDecision::Accept => FlowState::Committing {
                            message: proposal.sanitized_text,
                        },
                        UserDecision::Retry if retry_allowed => FlowState::Generating {
                            diff,
                            retry: RetryContext::after_rejection(proposal.sanitized_text),
                        },
                        UserDecision::Retry => {
                            warn!("Retry limit reached, treating retry as reject");
                            FlowState::Finished(FlowOutcome::Aborted)
                        }
                        UserDecision::Reject => FlowState::Finished(FlowOutcome::Aborted),
                    }
                }

                FlowState::Committing { message } => {
                    let summary = self.vcs.commit(&message)?;
                    info!("Committed: {}", summary);
                    FlowState::Finished(FlowOutcome::Committed { message, summary })
                }

                FlowState::Finished(outcome) => return Ok(outcome),
            };
        }
    }

    async fn generate(
        &mut self,
        diff: &DiffBundle,
        retry: &RetryContext,
    ) -> Result<ProposedMessage, FlowError> {
        let request = build_request(diff, &self.config, retry);
        self.attempts += 1;
        debug!(attempt = self.attempts, "Requesting commit message");

        let raw = self.client.generate(&request).await?;
        let proposal = ProposedMessage::new(raw, self.config.max_length);
        if proposal.sanitized_text.is_empty() {
            return Err(FlowError::EmptyMessage);
        }
        Ok(proposal)
    }
}
