use super::backend::SynthesisBackend;
use super::classifier::{classify_backend, require_credential, Stage};
use super::job::{checkpoint, CancelToken, JobTag, ProgressReporter};
use crate::credentials::CredentialResolver;
use crate::error::{LuminaError, Result};
use crate::models::{FinishedOperation, Operation, OperationOutcome, ProgressEvent};
use std::time::Duration;
use uuid::Uuid;

/// Cosmetic status lines cycled while a job renders.
pub const STATUS_VOCABULARY: &[&str] = &[
    "Synthesizing motion...",
    "Applying cinematic lighting...",
    "Rendering temporal consistency...",
    "Optimizing frame transitions...",
    "Finalizing pixels...",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Submitted,
    Polling,
    DoneSuccess,
    DoneError,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::DoneSuccess | PollState::DoneError)
    }

    /// Next state after observing `operation`. Terminal states absorb.
    pub fn advance(self, operation: &Operation) -> PollState {
        if self.is_terminal() {
            return self;
        }
        match &operation.outcome {
            Some(OperationOutcome::Succeeded(_)) => PollState::DoneSuccess,
            Some(OperationOutcome::Failed(_)) => PollState::DoneError,
            None => PollState::Polling,
        }
    }
}

pub fn status_for_tick(tick: u32) -> &'static str {
    STATUS_VOCABULARY[tick as usize % STATUS_VOCABULARY.len()]
}

/// Drives an operation to a terminal state.
pub struct Poller<'a> {
    backend: &'a dyn SynthesisBackend,
    credentials: &'a dyn CredentialResolver,
    interval: Duration,
    max_polls: Option<u32>,
    progress: &'a ProgressReporter,
    cancel: Option<&'a CancelToken>,
    tag: JobTag,
}

impl<'a> Poller<'a> {
    pub fn new(
        backend: &'a dyn SynthesisBackend,
        credentials: &'a dyn CredentialResolver,
        interval: Duration,
        progress: &'a ProgressReporter,
    ) -> Self {
        Self {
            backend,
            credentials,
            interval,
            max_polls: None,
            progress,
            cancel: None,
            tag: JobTag::default(),
        }
    }

    pub fn with_job(mut self, job_id: Uuid) -> Self {
        self.tag = JobTag::new(job_id);
        self
    }

    pub fn with_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn with_cancel(mut self, cancel: Option<&'a CancelToken>) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self, operation: Operation) -> Result<FinishedOperation> {
        let mut state = PollState::Submitted;
        let mut pending = match operation.finish() {
            Ok(finished) => {
                log::debug!(
                    "{}Operation {} finished on submit",
                    self.tag,
                    finished.handle().name()
                );
                return Ok(finished);
            }
            Err(pending) => pending,
        };

        let mut tick = 0u32;
        loop {
            if let Some(max) = self.max_polls {
                if tick >= max {
                    return Err(LuminaError::Backend(format!(
                        "operation {} still running after {} polls",
                        pending.handle.name(),
                        max
                    )));
                }
            }

            self.wait().await;
            checkpoint(self.cancel)?;

            let api_key = require_credential(self.credentials.resolve())?;
            tick += 1;
            let polled = self
                .backend
                .poll(&pending.handle, &api_key)
                .await
                .map_err(|e| {
                    log::error!("{}Polling {} failed: {}", self.tag, pending.handle.name(), e);
                    classify_backend(Stage::Poll, e)
                })?;

            let next = state.advance(&polled);
            if next != state {
                log::debug!(
                    "{}Operation {}: {:?} -> {:?}",
                    self.tag,
                    polled.handle.name(),
                    state,
                    next
                );
            }
            state = next;

            match polled.finish() {
                Ok(finished) => {
                    log::info!(
                        "{}Operation {} reached {:?} after {} polls",
                        self.tag,
                        finished.handle().name(),
                        state,
                        tick
                    );
                    return Ok(finished);
                }
                Err(still_running) => {
                    self.progress.emit(ProgressEvent::Polling {
                        tick,
                        status: status_for_tick(tick - 1).to_string(),
                    });
                    pending = still_running;
                }
            }
        }
    }

    async fn wait(&self) {
        match self.cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = cancel.cancelled() => {}
                }
            }
            None => tokio::time::sleep(self.interval).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OperationFailure, OperationHandle, SynthesisOutput};

    fn op(outcome: Option<OperationOutcome>) -> Operation {
        Operation {
            handle: OperationHandle::new("operations/t"),
            outcome,
        }
    }

    #[test]
    fn test_state_transitions() {
        let pending = op(None);
        let success = op(Some(OperationOutcome::Succeeded(SynthesisOutput::default())));
        let failure = op(Some(OperationOutcome::Failed(OperationFailure {
            code: 13,
            message: "boom".into(),
        })));

        let state = PollState::Submitted.advance(&pending);
        assert_eq!(state, PollState::Polling);
        assert_eq!(state.advance(&pending), state);
        assert_eq!(state.advance(&success), PollState::DoneSuccess);
        assert_eq!(state.advance(&failure), PollState::DoneError);
    }

    #[test]
    fn test_terminal_states_absorb() {
        let pending = op(None);
        assert_eq!(PollState::DoneSuccess.advance(&pending), PollState::DoneSuccess);
        assert_eq!(PollState::DoneError.advance(&pending), PollState::DoneError);
    }

    #[test]
    fn test_status_vocabulary_rotates() {
        assert_eq!(status_for_tick(0), STATUS_VOCABULARY[0]);
        assert_eq!(
            status_for_tick(STATUS_VOCABULARY.len() as u32),
            STATUS_VOCABULARY[0]
        );
        assert_eq!(status_for_tick(1), STATUS_VOCABULARY[1]);
    }
}
