//! Mutation runner: per-capability state, config merging, and settlement.
//!
//! A [`MutationRunner`] is created once per consumer. Each call to
//! [`Invoke::mutate`] merges the call config over the base config, resets the
//! state to in-flight, commits through the executor, and hands back a
//! [`PendingMutation`] that settles exactly once:
//!
//! | executor reports            | state (if live)      | callback        | pending result    |
//! |-----------------------------|----------------------|-----------------|-------------------|
//! | response                    | `completed(resp)`    | `on_completed`  | `Ok(Some(resp))`  |
//! | failure, `on_error` set     | `failed(err)`        | `on_error(err)` | `Ok(None)`        |
//! | failure, no `on_error`      | `failed(err)`        | -               | `Err(err)`        |
//!
//! Field errors and dropped sinks count as failures. Liveness gates only the
//! state write; callbacks and settlement always happen.

mod settlement;
mod state_cell;

pub use state_cell::Subscription;

use crate::config::MutationConfig;
use crate::error::{MutationError, PreconditionError};
use crate::executor::{CommitRequest, CommitSink, Environment, ExecutionContext};
use crate::liveness::LivenessGuard;
use crate::model::{MutationDocument, MutationState, Operation};
use settlement::Settlement;
use state_cell::StateCell;
use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Settled value of a [`PendingMutation`]. `Ok(None)` means the failure was
/// handed to `on_error`.
pub type MutationResult<T> = Result<Option<T>, MutationError>;

/// Which invocation may write the state snapshot when invocations overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Every settlement writes; whichever lands last is what the UI sees.
    #[default]
    LastSettledWins,
    /// Only the most recently started invocation writes. Older settlements
    /// still run callbacks and settle their pending result.
    LatestInvocationWins,
}

/// Monotonic per-runner invocation number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvocationId(u64);

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Sequence {
    latest: Cell<u64>,
}

impl Sequence {
    fn begin(&self) -> InvocationId {
        let id = self.latest.get() + 1;
        self.latest.set(id);
        InvocationId(id)
    }

    fn is_latest(&self, id: InvocationId) -> bool {
        self.latest.get() == id.0
    }
}

/// Owns the state snapshot of one mutation capability.
pub struct MutationRunner<O: Operation> {
    invoke: Invoke<O>,
    state: StateCell<O::Response>,
    liveness: LivenessGuard,
    sequence: Rc<Sequence>,
}

impl<O: Operation> MutationRunner<O> {
    /// Resolve the environment (explicit first, then the context) and set up
    /// an idle runner.
    pub fn new(
        document: MutationDocument<O>,
        base: MutationConfig<O>,
        environment: Option<Environment<O>>,
        context: &ExecutionContext<O>,
        liveness: LivenessGuard,
    ) -> Result<Self, PreconditionError> {
        let environment = environment
            .or_else(|| context.environment().cloned())
            .ok_or_else(|| PreconditionError::MissingEnvironment {
                mutation: document.name().to_string(),
            })?;

        let state = StateCell::new();
        let sequence = Rc::new(Sequence::default());
        let invoke = Invoke {
            bound: Rc::new(Bound {
                document,
                config: base,
                environment,
                state: state.clone(),
                liveness: liveness.clone(),
                sequence: sequence.clone(),
                overlap: OverlapPolicy::default(),
            }),
        };
        Ok(Self {
            invoke,
            state,
            liveness,
            sequence,
        })
    }

    pub fn with_overlap_policy(mut self, overlap: OverlapPolicy) -> Self {
        self.rebind(|b| b.overlap = overlap);
        self
    }

    /// The bound invoke function and the latest snapshot.
    pub fn bind(&self) -> (Invoke<O>, MutationState<O::Response>) {
        (self.invoke.clone(), self.state.snapshot())
    }

    pub fn invoke(
        &self,
        call: MutationConfig<O>,
    ) -> Result<PendingMutation<O::Response>, PreconditionError> {
        self.invoke.mutate(call)
    }

    pub fn state(&self) -> MutationState<O::Response> {
        self.state.snapshot()
    }

    /// Number of state replacements so far.
    pub fn version(&self) -> u64 {
        self.state.version()
    }

    pub fn subscribe(&self, f: impl Fn(&MutationState<O::Response>) + 'static) -> Subscription {
        self.state.subscribe(f)
    }

    pub fn base_config(&self) -> &MutationConfig<O> {
        &self.invoke.bound.config
    }

    /// Replace the base config. The bound [`Invoke`] changes identity.
    pub fn set_base_config(&mut self, config: MutationConfig<O>) {
        self.rebind(|b| b.config = config);
    }

    /// Replace the environment. The bound [`Invoke`] changes identity.
    pub fn set_environment(&mut self, environment: Environment<O>) {
        self.rebind(|b| b.environment = environment);
    }

    fn rebind(&mut self, change: impl FnOnce(&mut Bound<O>)) {
        let current = &self.invoke.bound;
        let mut next = Bound {
            document: current.document.clone(),
            config: current.config.clone(),
            environment: current.environment.clone(),
            state: self.state.clone(),
            liveness: self.liveness.clone(),
            sequence: self.sequence.clone(),
            overlap: current.overlap,
        };
        change(&mut next);
        self.invoke = Invoke {
            bound: Rc::new(next),
        };
    }
}

struct Bound<O: Operation> {
    document: MutationDocument<O>,
    config: MutationConfig<O>,
    environment: Environment<O>,
    state: StateCell<O::Response>,
    liveness: LivenessGuard,
    sequence: Rc<Sequence>,
    overlap: OverlapPolicy,
}

/// Invoke function bound to one document, base config and environment.
///
/// Cheap to clone. Clones share identity (see [`Invoke::ptr_eq`]) until the
/// runner's config or environment changes.
pub struct Invoke<O: Operation> {
    bound: Rc<Bound<O>>,
}

impl<O: Operation> Clone for Invoke<O> {
    fn clone(&self) -> Self {
        Self {
            bound: self.bound.clone(),
        }
    }
}

impl<O: Operation> fmt::Debug for Invoke<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoke")
            .field("document", &self.bound.document)
            .field("overlap", &self.bound.overlap)
            .finish_non_exhaustive()
    }
}

impl<O: Operation> Invoke<O> {
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.bound, &b.bound)
    }

    /// Start an invocation.
    ///
    /// Fails synchronously, without touching state or the executor, when the
    /// merged config has no variables.
    pub fn mutate(
        &self,
        call: MutationConfig<O>,
    ) -> Result<PendingMutation<O::Response>, PreconditionError> {
        let bound = &*self.bound;
        let merged = bound.config.merged_with(call);
        let variables = match merged.variables {
            Some(variables) if O::has_variables(&variables) => variables,
            _ => {
                return Err(PreconditionError::MissingVariables {
                    mutation: bound.document.name().to_string(),
                })
            }
        };

        let id = bound.sequence.begin();
        bound.state.replace(MutationState::in_flight());

        let (tx, rx) = oneshot::channel();
        let settlement = Settlement {
            id,
            document: bound.document.clone(),
            state: bound.state.clone(),
            liveness: bound.liveness.clone(),
            sequence: bound.sequence.clone(),
            overlap: bound.overlap,
            on_completed: merged.on_completed,
            on_error: merged.on_error,
            tx,
        };
        let request = CommitRequest {
            document: bound.document.clone(),
            variables,
            uploadables: merged.uploadables,
            configs: merged.configs,
            optimistic_response: merged.optimistic_response,
            optimistic_updater: merged.optimistic_updater,
            updater: merged.updater,
        };

        tracing::debug!(
            mutation = bound.document.name(),
            invocation = %id,
            "committing mutation"
        );
        bound.environment.commit(
            request,
            CommitSink::from_fn(move |outcome| settlement.settle(outcome)),
        );
        Ok(PendingMutation { id, rx })
    }
}

/// Result of one invocation. Awaiting is optional: dropping it does not
/// cancel the executor, the callbacks, or the state write.
#[must_use = "a failure without on_error is only observable by awaiting the result"]
pub struct PendingMutation<T> {
    id: InvocationId,
    rx: oneshot::Receiver<MutationResult<T>>,
}

impl<T> PendingMutation<T> {
    pub fn id(&self) -> InvocationId {
        self.id
    }
}

impl<T> fmt::Debug for PendingMutation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingMutation")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<T> Future for PendingMutation<T> {
    type Output = MutationResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // The sink settles on drop, so a closed channel means the settlement
        // itself was lost; report it like an abandoned commit.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(MutationError::Abandoned)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MutationError;
    use crate::executor::{Executor, ManualExecutor};
    use crate::liveness::{Liveness, LivenessHandle};
    use crate::model::{FieldError, JsonOperation, MutationStatus};
    use anyhow::anyhow;
    use serde_json::{json, Value};
    use std::cell::RefCell;

    type Op = JsonOperation;

    fn document() -> MutationDocument<Op> {
        MutationDocument::new(
            "LikePostMutation",
            "mutation LikePostMutation($id: ID!) { likePost(id: $id) { likes } }",
        )
    }

    fn setup(
        base: MutationConfig<Op>,
    ) -> (Rc<ManualExecutor<Op>>, LivenessHandle, MutationRunner<Op>) {
        let exec = Rc::new(ManualExecutor::new());
        let env: Environment<Op> = exec.clone();
        let (handle, guard) = Liveness::new();
        let runner =
            MutationRunner::new(document(), base, Some(env), &ExecutionContext::empty(), guard)
                .unwrap();
        (exec, handle, runner)
    }

    fn counter() -> (Rc<RefCell<Vec<String>>>, impl Fn(&MutationError) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        (seen, move |e: &MutationError| seen2.borrow_mut().push(e.to_string()))
    }

    /// Records the order of state writes relative to executor commits.
    struct OrderRecorder {
        log: Rc<RefCell<Vec<&'static str>>>,
        inner: ManualExecutor<Op>,
    }

    impl Executor<Op> for OrderRecorder {
        fn commit(&self, request: CommitRequest<Op>, sink: CommitSink<Op>) {
            self.log.borrow_mut().push("commit");
            self.inner.commit(request, sink);
        }
    }

    #[tokio::test]
    async fn loading_is_written_before_the_executor_runs() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::new(OrderRecorder {
            log: log.clone(),
            inner: ManualExecutor::new(),
        });
        let env: Environment<Op> = recorder.clone();
        let runner = MutationRunner::new(
            document(),
            MutationConfig::new().variables(json!({"id": 1})),
            None,
            &ExecutionContext::with_environment(env),
            LivenessGuard::always(),
        )
        .unwrap();
        let log2 = log.clone();
        let _sub = runner.subscribe(move |s| {
            log2.borrow_mut()
                .push(if s.loading { "loading" } else { "settled" })
        });

        assert_eq!(runner.state().status(), MutationStatus::Idle);
        let pending = runner.invoke(MutationConfig::new()).unwrap();
        assert_eq!(*log.borrow(), vec!["loading", "commit"]);
        let state = runner.state();
        assert!(state.loading && state.data.is_none() && state.error.is_none());

        recorder.inner.next().unwrap().complete(json!({"likes": 1}));
        assert_eq!(pending.await.unwrap(), Some(json!({"likes": 1})));
        assert_eq!(*log.borrow(), vec!["loading", "commit", "settled"]);
    }

    #[tokio::test]
    async fn success_while_live_completes_state_and_result() {
        let completed = Rc::new(RefCell::new(Vec::<Value>::new()));
        let completed2 = completed.clone();
        let (exec, _handle, runner) = setup(
            MutationConfig::new()
                .variables(json!({"id": 1}))
                .on_completed(move |r: &Value| completed2.borrow_mut().push(r.clone())),
        );

        let pending = runner.invoke(MutationConfig::new()).unwrap();
        exec.next().unwrap().complete(json!({"likes": 5}));

        let state = runner.state();
        assert!(!state.loading);
        assert_eq!(state.data, Some(json!({"likes": 5})));
        assert!(state.error.is_none());
        assert_eq!(*completed.borrow(), vec![json!({"likes": 5})]);
        assert_eq!(pending.await.unwrap(), Some(json!({"likes": 5})));
    }

    #[tokio::test]
    async fn failure_with_on_error_resolves_empty() {
        let (errors, on_error) = counter();
        let (exec, _handle, runner) = setup(
            MutationConfig::new()
                .variables(json!({"id": 1}))
                .on_error(on_error),
        );

        let pending = runner.invoke(MutationConfig::new()).unwrap();
        exec.next().unwrap().fail(anyhow!("boom"));

        let state = runner.state();
        assert_eq!(state.status(), MutationStatus::Failed);
        assert_eq!(
            state.error.map(|e| e.to_string()),
            Some("transport failure: boom".to_string())
        );
        assert_eq!(*errors.borrow(), vec!["transport failure: boom"]);
        assert_eq!(pending.await.unwrap(), None);
    }

    #[tokio::test]
    async fn failure_without_on_error_rejects() {
        let (exec, _handle, runner) = setup(MutationConfig::new().variables(json!({"id": 1})));

        let pending = runner.invoke(MutationConfig::new()).unwrap();
        exec.next().unwrap().fail(anyhow!("boom"));

        assert!(matches!(
            runner.state().error,
            Some(MutationError::Transport(_))
        ));
        match pending.await {
            Err(MutationError::Transport(e)) => assert_eq!(e.to_string(), "boom"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn missing_variables_touch_nothing() {
        let (exec, _handle, runner) = setup(MutationConfig::new());

        let err = runner.invoke(MutationConfig::new()).unwrap_err();
        assert_eq!(
            err,
            PreconditionError::MissingVariables {
                mutation: "LikePostMutation".into()
            }
        );
        assert_eq!(exec.commit_count(), 0);
        assert_eq!(runner.version(), 0);
        assert_eq!(runner.state().status(), MutationStatus::Idle);
    }

    #[test]
    fn json_null_variables_count_as_missing() {
        let (exec, _handle, runner) = setup(MutationConfig::new().variables(json!({"id": 1})));
        let err = runner
            .invoke(MutationConfig::new().variables(Value::Null))
            .unwrap_err();
        assert!(matches!(err, PreconditionError::MissingVariables { .. }));
        assert_eq!(exec.commit_count(), 0);
    }

    #[tokio::test]
    async fn teardown_suppresses_state_but_not_callbacks_or_result() {
        let completed = Rc::new(Cell::new(0));
        let completed2 = completed.clone();
        let (errors, on_error) = counter();
        let (exec, handle, runner) = setup(
            MutationConfig::new()
                .variables(json!({"id": 1}))
                .on_completed(move |_| completed2.set(completed2.get() + 1))
                .on_error(on_error),
        );

        let ok = runner.invoke(MutationConfig::new()).unwrap();
        let failing = runner.invoke(MutationConfig::new()).unwrap();
        let version_before = runner.version();
        handle.teardown();

        exec.next().unwrap().complete(json!({"likes": 1}));
        exec.next().unwrap().fail(anyhow!("late"));

        assert_eq!(runner.version(), version_before);
        assert!(runner.state().loading);
        assert_eq!(completed.get(), 1);
        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(ok.await.unwrap(), Some(json!({"likes": 1})));
        assert_eq!(failing.await.unwrap(), None);
    }

    #[tokio::test]
    async fn call_config_overrides_only_variables() {
        let (errors, on_error) = counter();
        let (exec, _handle, runner) = setup(
            MutationConfig::new()
                .variables(json!({"id": 1}))
                .configs(vec![json!({"type": "NODE_DELETE"})])
                .on_error(on_error),
        );

        let _first = runner.invoke(MutationConfig::new()).unwrap();
        let commit = exec.next().unwrap();
        assert_eq!(commit.request.variables, json!({"id": 1}));
        commit.complete(json!({}));

        let second = runner
            .invoke(MutationConfig::new().variables(json!({"id": 2})))
            .unwrap();
        let commit = exec.next().unwrap();
        assert_eq!(commit.request.variables, json!({"id": 2}));
        assert_eq!(
            commit.request.configs,
            Some(vec![json!({"type": "NODE_DELETE"})])
        );
        commit.fail(anyhow!("denied"));
        assert_eq!(second.await.unwrap(), None);
        assert_eq!(errors.borrow().len(), 1);
    }

    #[tokio::test]
    async fn base_on_error_handles_failure_of_overridden_call() {
        let (errors, on_error) = counter();
        let (exec, _handle, runner) = setup(
            MutationConfig::new()
                .variables(json!({"id": 1}))
                .on_error(on_error),
        );

        let pending = runner
            .invoke(MutationConfig::new().variables(json!({"id": 2})))
            .unwrap();
        let commit = exec.next().unwrap();
        assert_eq!(commit.request.variables, json!({"id": 2}));
        commit.fail(anyhow!("E"));

        let state = runner.state();
        assert!(!state.loading);
        assert!(state.data.is_none());
        assert_eq!(
            state.error.map(|e| e.to_string()),
            Some("transport failure: E".into())
        );
        assert_eq!(*errors.borrow(), vec!["transport failure: E"]);
        assert_eq!(pending.await.unwrap(), None);
    }

    #[tokio::test]
    async fn field_errors_travel_as_a_collection() {
        let (exec, _handle, runner) = setup(MutationConfig::new().variables(json!({"id": 1})));

        let pending = runner.invoke(MutationConfig::new()).unwrap();
        exec.next().unwrap().complete_with_errors(
            json!({"likePost": null}),
            vec![FieldError::new("post is locked"), FieldError::new("rate limited")],
        );

        let state = runner.state();
        assert!(state.data.is_none());
        let field = state.error.as_ref().and_then(MutationError::field_errors);
        assert_eq!(field.map(|f| f.len()), Some(2));
        assert!(matches!(pending.await, Err(MutationError::Field(_))));
    }

    #[tokio::test]
    async fn empty_field_error_list_is_a_failure() {
        let (exec, _handle, runner) = setup(MutationConfig::new().variables(json!({"id": 1})));
        let pending = runner.invoke(MutationConfig::new()).unwrap();
        exec.next()
            .unwrap()
            .complete_with_errors(json!({"likes": 2}), vec![]);

        let state = runner.state();
        assert_eq!(state.status(), MutationStatus::Failed);
        assert!(state.data.is_none());
        let field = state.error.as_ref().and_then(MutationError::field_errors);
        assert!(field.is_some_and(|f| f.is_empty()));
        match pending.await {
            Err(MutationError::Field(errors)) => assert!(errors.is_empty()),
            other => panic!("expected field rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn abandoned_commit_settles_as_failure() {
        let (exec, _handle, runner) = setup(MutationConfig::new().variables(json!({"id": 1})));
        let pending = runner.invoke(MutationConfig::new()).unwrap();
        exec.next().unwrap().abandon();
        assert!(matches!(
            runner.state().error,
            Some(MutationError::Abandoned)
        ));
        assert!(matches!(pending.await, Err(MutationError::Abandoned)));
    }

    #[tokio::test]
    async fn overlapping_invocations_last_settlement_wins_by_default() {
        let (exec, _handle, runner) = setup(MutationConfig::new().variables(json!({"id": 1})));

        let first = runner.invoke(MutationConfig::new()).unwrap();
        let second = runner.invoke(MutationConfig::new()).unwrap();
        assert!(first.id() < second.id());

        exec.latest().unwrap().complete(json!({"from": "second"}));
        exec.next().unwrap().complete(json!({"from": "first"}));

        assert_eq!(runner.state().data, Some(json!({"from": "first"})));
        assert_eq!(first.await.unwrap(), Some(json!({"from": "first"})));
        assert_eq!(second.await.unwrap(), Some(json!({"from": "second"})));
    }

    #[tokio::test]
    async fn latest_invocation_policy_ignores_stale_settlements() {
        let (exec, _handle, runner) = setup(MutationConfig::new().variables(json!({"id": 1})));
        let runner = runner.with_overlap_policy(OverlapPolicy::LatestInvocationWins);

        let first = runner.invoke(MutationConfig::new()).unwrap();
        let second = runner.invoke(MutationConfig::new()).unwrap();

        exec.latest().unwrap().complete(json!({"from": "second"}));
        let version = runner.version();
        exec.next().unwrap().fail(anyhow!("stale"));

        assert_eq!(runner.version(), version);
        assert_eq!(runner.state().data, Some(json!({"from": "second"})));
        assert!(first.await.is_err());
        assert_eq!(second.await.unwrap(), Some(json!({"from": "second"})));
    }

    #[test]
    fn missing_environment_is_a_precondition_error() {
        let result = MutationRunner::new(
            document(),
            MutationConfig::<Op>::new(),
            None,
            &ExecutionContext::empty(),
            LivenessGuard::always(),
        );
        assert!(matches!(
            result,
            Err(PreconditionError::MissingEnvironment { .. })
        ));
    }

    #[test]
    fn explicit_environment_wins_over_context() {
        let ambient = Rc::new(ManualExecutor::<Op>::new());
        let explicit = Rc::new(ManualExecutor::<Op>::new());
        let ambient_env: Environment<Op> = ambient.clone();
        let explicit_env: Environment<Op> = explicit.clone();
        let runner = MutationRunner::new(
            document(),
            MutationConfig::new().variables(json!({"id": 1})),
            Some(explicit_env),
            &ExecutionContext::with_environment(ambient_env),
            LivenessGuard::always(),
        )
        .unwrap();

        let _pending = runner.invoke(MutationConfig::new()).unwrap();
        assert_eq!(explicit.commit_count(), 1);
        assert_eq!(ambient.commit_count(), 0);
    }

    #[test]
    fn bound_invoke_is_stable_until_config_changes() {
        let (_exec, _handle, mut runner) =
            setup(MutationConfig::new().variables(json!({"id": 1})));
        let (a, _) = runner.bind();
        let (b, _) = runner.bind();
        assert!(Invoke::ptr_eq(&a, &b));

        runner.set_base_config(MutationConfig::new().variables(json!({"id": 9})));
        let (c, _) = runner.bind();
        assert!(!Invoke::ptr_eq(&a, &c));
        assert_eq!(runner.base_config().variables, Some(json!({"id": 9})));
    }

    #[tokio::test]
    async fn new_environment_rebinds_and_takes_the_next_commit() {
        let (old, _handle, mut runner) =
            setup(MutationConfig::new().variables(json!({"id": 1})));
        let (before, _) = runner.bind();

        let replacement = Rc::new(ManualExecutor::new());
        let env: Environment<Op> = replacement.clone();
        runner.set_environment(env);
        let (after, _) = runner.bind();
        assert!(!Invoke::ptr_eq(&before, &after));

        let pending = after.mutate(MutationConfig::new()).unwrap();
        assert_eq!(replacement.commit_count(), 1);
        assert_eq!(old.commit_count(), 0);

        replacement.next().unwrap().complete(json!({"likes": 7}));
        assert_eq!(pending.await.unwrap(), Some(json!({"likes": 7})));
        assert_eq!(runner.state().data, Some(json!({"likes": 7})));

        // An invoke captured before the swap keeps its own executor.
        let _stale = before.mutate(MutationConfig::new()).unwrap();
        assert_eq!(old.commit_count(), 1);
        assert_eq!(replacement.commit_count(), 1);
    }

    #[tokio::test]
    async fn on_completed_may_start_another_invocation() {
        let (exec, _handle, runner) = setup(MutationConfig::new().variables(json!({"id": 1})));
        let (invoke, _) = runner.bind();
        let chained = Rc::new(RefCell::new(None));
        let chained2 = chained.clone();
        let again = invoke.clone();

        let first = invoke
            .mutate(MutationConfig::new().on_completed(move |_| {
                *chained2.borrow_mut() = Some(again.mutate(MutationConfig::new()).unwrap());
            }))
            .unwrap();
        exec.next().unwrap().complete(json!({"n": 1}));

        assert!(first.await.is_ok());
        assert!(runner.state().loading);
        assert_eq!(exec.pending_count(), 1);
        exec.next().unwrap().complete(json!({"n": 2}));
        let second = chained.borrow_mut().take().unwrap();
        assert_eq!(second.await.unwrap(), Some(json!({"n": 2})));
    }
}
