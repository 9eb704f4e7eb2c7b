//! Executor contract.
//!
//! An executor receives a [`CommitRequest`] and a single-use [`CommitSink`].
//! It must eventually call exactly one of [`CommitSink::complete`] or
//! [`CommitSink::fail`]; both consume the sink. A sink dropped without either
//! call settles the invocation as [`MutationError::Abandoned`].
//!
//! [`MutationError::Abandoned`]: crate::error::MutationError::Abandoned

mod manual;
mod scripted;
mod store;

pub use manual::{ManualExecutor, PendingCommit};
pub use scripted::{ScriptedExecutor, ScriptedOutcome, ScriptedResult};
pub use store::{MemoryStore, RecordStore};

use crate::config::{DeclarativeConfigs, OptimisticUpdater, Updater, Uploadables};
use crate::model::{FieldError, MutationDocument, Operation};
use std::fmt;
use std::rc::Rc;

/// Commits mutations against the remote graph.
pub trait Executor<O: Operation> {
    fn commit(&self, request: CommitRequest<O>, sink: CommitSink<O>);
}

/// Shared executor handle.
pub type Environment<O> = Rc<dyn Executor<O>>;

/// Everything an executor needs to send one mutation. Completion callbacks are
/// not part of the request; results flow back through the sink.
pub struct CommitRequest<O: Operation> {
    pub document: MutationDocument<O>,
    pub variables: O::Variables,
    pub uploadables: Option<Uploadables>,
    pub configs: Option<DeclarativeConfigs>,
    pub optimistic_response: Option<O::Response>,
    pub optimistic_updater: Option<OptimisticUpdater>,
    pub updater: Option<Updater<O::Response>>,
}

impl<O: Operation> fmt::Debug for CommitRequest<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitRequest")
            .field("document", &self.document)
            .field("variables", &self.variables)
            .field("uploadables", &self.uploadables.as_ref().map(|u| u.len()))
            .field("configs", &self.configs)
            .field("optimistic_response", &self.optimistic_response)
            .field("optimistic_updater", &self.optimistic_updater.is_some())
            .field("updater", &self.updater.is_some())
            .finish()
    }
}

/// What the executor reported.
#[derive(Debug)]
pub enum CommitOutcome<T> {
    Completed {
        response: T,
        errors: Option<Vec<FieldError>>,
    },
    Failed(anyhow::Error),
    Dropped,
}

/// Single-use completion channel handed to [`Executor::commit`].
pub struct CommitSink<O: Operation> {
    settle: Option<Box<dyn FnOnce(CommitOutcome<O::Response>)>>,
}

impl<O: Operation> CommitSink<O> {
    pub fn from_fn(settle: impl FnOnce(CommitOutcome<O::Response>) + 'static) -> Self {
        Self {
            settle: Some(Box::new(settle)),
        }
    }

    /// Report a response, optionally with field-level errors.
    pub fn complete(mut self, response: O::Response, errors: Option<Vec<FieldError>>) {
        self.settle_with(CommitOutcome::Completed { response, errors });
    }

    /// Report a transport failure.
    pub fn fail(mut self, error: anyhow::Error) {
        self.settle_with(CommitOutcome::Failed(error));
    }

    fn settle_with(&mut self, outcome: CommitOutcome<O::Response>) {
        if let Some(settle) = self.settle.take() {
            settle(outcome);
        }
    }
}

impl<O: Operation> Drop for CommitSink<O> {
    fn drop(&mut self) {
        self.settle_with(CommitOutcome::Dropped);
    }
}

impl<O: Operation> fmt::Debug for CommitSink<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitSink")
            .field("settled", &self.settle.is_none())
            .finish()
    }
}

/// Ambient provider of a default environment.
pub struct ExecutionContext<O: Operation> {
    environment: Option<Environment<O>>,
}

impl<O: Operation> ExecutionContext<O> {
    pub fn empty() -> Self {
        Self { environment: None }
    }

    pub fn with_environment(environment: Environment<O>) -> Self {
        Self {
            environment: Some(environment),
        }
    }

    pub fn environment(&self) -> Option<&Environment<O>> {
        self.environment.as_ref()
    }
}

impl<O: Operation> Clone for ExecutionContext<O> {
    fn clone(&self) -> Self {
        Self {
            environment: self.environment.clone(),
        }
    }
}

impl<O: Operation> Default for ExecutionContext<O> {
    fn default() -> Self {
        Self::empty()
    }
}
