//! Scenario session lifecycle.
//!
//! A [`Session`] owns the renderer, the scripted executor and the consumer's
//! liveness handle. Front ends render it, pick up the bound invoke from the
//! render output, and hand that back to [`Session::dispatch_next`].

use super::post_process::{build_report, Report};
use super::timeline::{Timeline, TimelineEvent};
use crate::scenario::Scenario;
use anyhow::{Context, Result};
use mutation_runner::{
    Environment, ExecutionContext, Invoke, JsonOperation, Liveness, LivenessHandle,
    MemoryStore, MutationConfig, MutationDocument, MutationProps, MutationRenderer,
    MutationState, MutationStatus, OverlapPolicy, ScriptedExecutor, Subscription,
};
use serde_json::Value;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// What one render hands back to the front end.
pub(crate) struct StatusView {
    pub invoke: Invoke<JsonOperation>,
    pub status: MutationStatus,
    /// Response data or error text, whichever the snapshot holds.
    pub detail: Option<String>,
}

type RenderFn = fn(&Invoke<JsonOperation>, &MutationState<Value>) -> StatusView;

fn status_view(invoke: &Invoke<JsonOperation>, state: &MutationState<Value>) -> StatusView {
    let detail = match (&state.data, &state.error) {
        (Some(data), _) => Some(data.to_string()),
        (None, Some(error)) => Some(error.to_string()),
        (None, None) => None,
    };
    StatusView {
        invoke: invoke.clone(),
        status: state.status(),
        detail,
    }
}

struct PreparedCall {
    at: Duration,
    config: MutationConfig<JsonOperation>,
}

/// Tears the consumer down at most once and records it on the timeline.
#[derive(Clone)]
pub(crate) struct Teardown {
    handle: Rc<LivenessHandle>,
    timeline: Rc<RefCell<Timeline>>,
}

impl Teardown {
    /// Returns false if the consumer was already gone.
    pub(crate) fn fire(&self) -> bool {
        if self.is_done() {
            return false;
        }
        self.handle.teardown();
        self.timeline.borrow_mut().push(TimelineEvent::TornDown);
        true
    }

    pub(crate) fn is_done(&self) -> bool {
        !self.handle.guard().is_live()
    }
}

pub(crate) struct Session {
    mutation: String,
    executor: Rc<ScriptedExecutor>,
    renderer: MutationRenderer<JsonOperation, RenderFn>,
    teardown: Teardown,
    teardown_after: Option<Duration>,
    timeline: Rc<RefCell<Timeline>>,
    calls: Vec<PreparedCall>,
    next_call: usize,
    settlements: Vec<JoinHandle<()>>,
    _state_changes: Subscription,
}

impl Session {
    /// `overlap` overrides the scenario's own policy when set.
    pub(crate) fn new(scenario: &Scenario, overlap: Option<OverlapPolicy>) -> Result<Self> {
        let executor = Rc::new(ScriptedExecutor::new(scenario.script()?));
        let environment: Environment<JsonOperation> = executor.clone();
        let context = ExecutionContext::with_environment(environment);
        let timeline = Rc::new(RefCell::new(Timeline::new()));
        let (handle, guard) = Liveness::new();

        let document = MutationDocument::new(
            scenario.mutation.name.as_str(),
            scenario.mutation.text.as_str(),
        );
        let base = scenario
            .base
            .to_config(&scenario.base_dir)
            .context("build base config")?;
        let renderer = MutationRenderer::new(
            MutationProps::new(document).config(base),
            &context,
            guard,
            status_view as RenderFn,
        )
        .context("construct mutation renderer")?
        .with_overlap_policy(overlap.unwrap_or_else(|| scenario.overlap.into()));

        let recorder = timeline.clone();
        let state_changes =
            renderer.subscribe(move |state| recorder.borrow_mut().record_state(state));

        let calls = scenario
            .calls
            .iter()
            .enumerate()
            .map(|(i, call)| -> Result<PreparedCall> {
                let mut config = call
                    .config
                    .to_config(&scenario.base_dir)
                    .with_context(|| format!("build config for call {i}"))?;
                let tl = timeline.clone();
                config = config.on_completed(move |_| {
                    tl.borrow_mut()
                        .push(TimelineEvent::CompletedCallback { call: i })
                });
                if call.config.handle_errors || scenario.base.handle_errors {
                    let tl = timeline.clone();
                    config = config.on_error(move |e| {
                        tl.borrow_mut().push(TimelineEvent::ErrorCallback {
                            call: i,
                            error: e.to_string(),
                        })
                    });
                }
                Ok(PreparedCall {
                    at: call.at.unwrap_or_default(),
                    config,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            mutation: scenario.mutation.name.clone(),
            executor,
            renderer,
            teardown: Teardown {
                handle: Rc::new(handle),
                timeline: timeline.clone(),
            },
            teardown_after: scenario.teardown_after,
            timeline,
            calls,
            next_call: 0,
            settlements: Vec::new(),
            _state_changes: state_changes,
        })
    }

    pub(crate) fn render(&mut self) -> StatusView {
        self.renderer.render()
    }

    pub(crate) fn started(&self) -> Instant {
        self.timeline.borrow().started()
    }

    /// Scheduled offset of the next undispatched call.
    pub(crate) fn next_call_at(&self) -> Option<Duration> {
        self.calls.get(self.next_call).map(|c| c.at)
    }

    pub(crate) fn calls_remaining(&self) -> usize {
        self.calls.len() - self.next_call
    }

    /// Dispatch the next scenario call through `invoke`. Returns its index,
    /// or `None` once every call has been dispatched.
    pub(crate) fn dispatch_next(&mut self, invoke: &Invoke<JsonOperation>) -> Option<usize> {
        let index = self.next_call;
        let config = self.calls.get(index)?.config.clone();
        self.next_call += 1;

        match invoke.mutate(config) {
            Ok(pending) => {
                let invocation = pending.id().to_string();
                self.timeline.borrow_mut().push(TimelineEvent::Invoked {
                    call: index,
                    invocation: invocation.clone(),
                });
                let timeline = self.timeline.clone();
                self.settlements.push(tokio::task::spawn_local(async move {
                    let result = pending.await;
                    timeline
                        .borrow_mut()
                        .push(TimelineEvent::settled(index, invocation, &result));
                }));
            }
            Err(e) => {
                tracing::info!(call = index, error = %e, "call rejected");
                self.timeline.borrow_mut().push(TimelineEvent::Rejected {
                    call: index,
                    reason: e.to_string(),
                });
            }
        }
        Some(index)
    }

    /// Arm the scenario's teardown timer, if it has one.
    pub(crate) fn schedule_teardown(&self) {
        let Some(after) = self.teardown_after else {
            return;
        };
        let teardown = self.teardown.clone();
        let at = self.started() + after;
        tokio::task::spawn_local(async move {
            tokio::time::sleep_until(at).await;
            teardown.fire();
        });
    }

    pub(crate) fn teardown(&self) -> &Teardown {
        &self.teardown
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.settlements.iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for every dispatched call to settle.
    pub(crate) async fn wait_idle(&mut self) {
        futures::future::join_all(std::mem::take(&mut self.settlements)).await;
    }

    pub(crate) fn timeline(&self) -> Ref<'_, Timeline> {
        self.timeline.borrow()
    }

    pub(crate) fn store(&self) -> MemoryStore {
        self.executor.store()
    }

    pub(crate) fn report(&self) -> Result<Report> {
        build_report(
            &self.mutation,
            &self.timeline.borrow(),
            self.renderer.runner().state(),
            &self.executor.store(),
            self.executor.remaining(),
            self.teardown.is_done(),
        )
    }
}

/// Dispatch every call at its scheduled offset, then wait for all of them
/// to settle.
pub(crate) async fn play(session: &mut Session) {
    let started = session.started();
    while let Some(at) = session.next_call_at() {
        tokio::time::sleep_until(started + at).await;
        let view = session.render();
        session.dispatch_next(&view.invoke);
    }
    session.wait_idle().await;
}
