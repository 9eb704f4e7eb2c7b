//! Settlement of one invocation: state write, callbacks, then the pending
//! result, in that order.

use super::state_cell::StateCell;
use super::{InvocationId, MutationResult, OverlapPolicy, Sequence};
use crate::config::{CompletedCallback, ErrorCallback};
use crate::error::{FieldErrors, MutationError};
use crate::executor::CommitOutcome;
use crate::liveness::LivenessGuard;
use crate::model::{MutationDocument, MutationState, Operation};
use std::rc::Rc;
use tokio::sync::oneshot;

/// Consumed by value, so it can settle at most once.
pub(super) struct Settlement<O: Operation> {
    pub(super) id: InvocationId,
    pub(super) document: MutationDocument<O>,
    pub(super) state: StateCell<O::Response>,
    pub(super) liveness: LivenessGuard,
    pub(super) sequence: Rc<Sequence>,
    pub(super) overlap: OverlapPolicy,
    pub(super) on_completed: Option<CompletedCallback<O::Response>>,
    pub(super) on_error: Option<ErrorCallback>,
    pub(super) tx: oneshot::Sender<MutationResult<O::Response>>,
}

impl<O: Operation> Settlement<O> {
    pub(super) fn settle(self, outcome: CommitOutcome<O::Response>) {
        match outcome {
            CommitOutcome::Completed { response, errors } => {
                // A present collection fails the call even when it is empty.
                match errors {
                    Some(errors) => self.fail(MutationError::Field(FieldErrors(errors))),
                    None => self.complete(response),
                }
            }
            CommitOutcome::Failed(error) => self.fail(MutationError::transport(error)),
            CommitOutcome::Dropped => self.fail(MutationError::Abandoned),
        }
    }

    fn complete(self, response: O::Response) {
        tracing::debug!(
            mutation = self.document.name(),
            invocation = %self.id,
            "mutation completed"
        );
        self.write_state(|| MutationState::completed(response.clone()));

        if let Some(on_completed) = &self.on_completed {
            on_completed(&response);
        }
        // A dropped receiver just means nobody awaited the result.
        let _ = self.tx.send(Ok(Some(response)));
    }

    fn fail(self, error: MutationError) {
        tracing::debug!(
            mutation = self.document.name(),
            invocation = %self.id,
            error = %error,
            "mutation failed"
        );
        self.write_state(|| MutationState::failed(error.clone()));

        let Settlement {
            id,
            document,
            on_error,
            tx,
            ..
        } = self;
        match on_error {
            Some(on_error) => {
                on_error(&error);
                let _ = tx.send(Ok(None));
            }
            None => {
                if let Err(Err(error)) = tx.send(Err(error)) {
                    tracing::warn!(
                        mutation = document.name(),
                        invocation = %id,
                        error = %error,
                        "mutation failed with no error handler and nobody awaiting the result"
                    );
                }
            }
        }
    }

    /// Replace the snapshot unless the consumer is gone or, under
    /// [`OverlapPolicy::LatestInvocationWins`], a newer invocation started.
    fn write_state(&self, next: impl FnOnce() -> MutationState<O::Response>) {
        if !self.liveness.is_live() {
            return;
        }
        if self.overlap == OverlapPolicy::LatestInvocationWins && !self.sequence.is_latest(self.id)
        {
            tracing::trace!(
                mutation = self.document.name(),
                invocation = %self.id,
                "skipping state write from superseded invocation"
            );
            return;
        }
        self.state.replace(next());
    }
}
