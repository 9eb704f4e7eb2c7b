use super::{CommitRequest, CommitSink, Executor};
use crate::model::{FieldError, Operation};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// Executor that queues every commit until the caller settles it by hand.
///
/// Useful wherever the order and timing of executor callbacks must be exact,
/// e.g. overlapping invocations or teardown before completion.
pub struct ManualExecutor<O: Operation> {
    pending: RefCell<VecDeque<PendingCommit<O>>>,
    commits: Cell<usize>,
}

impl<O: Operation> ManualExecutor<O> {
    pub fn new() -> Self {
        Self {
            pending: RefCell::new(VecDeque::new()),
            commits: Cell::new(0),
        }
    }

    /// Total number of commits received so far.
    pub fn commit_count(&self) -> usize {
        self.commits.get()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Oldest commit not yet taken.
    pub fn next(&self) -> Option<PendingCommit<O>> {
        self.pending.borrow_mut().pop_front()
    }

    /// Newest commit not yet taken.
    pub fn latest(&self) -> Option<PendingCommit<O>> {
        self.pending.borrow_mut().pop_back()
    }
}

impl<O: Operation> Default for ManualExecutor<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Operation> Executor<O> for ManualExecutor<O> {
    fn commit(&self, request: CommitRequest<O>, sink: CommitSink<O>) {
        self.commits.set(self.commits.get() + 1);
        self.pending
            .borrow_mut()
            .push_back(PendingCommit { request, sink });
    }
}

/// A queued commit. Settle it with one of the consuming methods.
pub struct PendingCommit<O: Operation> {
    pub request: CommitRequest<O>,
    sink: CommitSink<O>,
}

impl<O: Operation> PendingCommit<O> {
    pub fn complete(self, response: O::Response) {
        self.sink.complete(response, None);
    }

    pub fn complete_with_errors(self, response: O::Response, errors: Vec<FieldError>) {
        self.sink.complete(response, Some(errors));
    }

    pub fn fail(self, error: anyhow::Error) {
        self.sink.fail(error);
    }

    /// Drop the sink without reporting anything.
    pub fn abandon(self) {}
}
