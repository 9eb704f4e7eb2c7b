//! Client-side lifecycle of a single mutation against a remote data graph.
//!
//! [`MutationRunner`] owns the observable [`MutationState`], merges base and
//! call-time [`MutationConfig`], drives an [`Executor`], and settles a
//! [`PendingMutation`] exactly once. [`LivenessGuard`] keeps state writes from
//! landing after the consumer is torn down. [`MutationRenderer`] wraps a runner
//! for render-callback style consumers.
//!
//! Everything here is single-threaded (`Rc`-based); executors that defer work
//! run on a [`tokio::task::LocalSet`].

pub mod adapter;
pub mod config;
pub mod error;
pub mod executor;
pub mod liveness;
pub mod model;
pub mod runner;

pub use adapter::{MutationProps, MutationRenderer};
pub use config::{MutationConfig, Uploadable};
pub use error::{FieldErrors, MutationError, PreconditionError};
pub use executor::{
    CommitOutcome, CommitRequest, CommitSink, Environment, ExecutionContext, Executor,
    ManualExecutor, MemoryStore, RecordStore, ScriptedExecutor,
};
pub use liveness::{Liveness, LivenessGuard, LivenessHandle};
pub use model::{
    FieldError, JsonOperation, MutationDocument, MutationState, MutationStatus, Operation,
    PathSegment,
};
pub use runner::{
    InvocationId, Invoke, MutationResult, MutationRunner, OverlapPolicy, PendingMutation,
    Subscription,
};
