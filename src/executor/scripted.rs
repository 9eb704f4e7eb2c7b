//! Executor that plays back a fixed script of timed outcomes.
//!
//! Each commit consumes the next [`ScriptedOutcome`] in order. Settlement
//! happens on a spawned local task after the outcome's delay, so the executor
//! must be used from inside a [`tokio::task::LocalSet`].

use super::{CommitRequest, CommitSink, Executor, MemoryStore, RecordStore};
use crate::model::{FieldError, JsonOperation};
use anyhow::anyhow;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum ScriptedResult {
    Respond {
        response: Value,
        field_errors: Vec<FieldError>,
    },
    Fail(String),
    /// Drop the sink without reporting anything.
    Abandon,
}

#[derive(Debug, Clone)]
pub struct ScriptedOutcome {
    pub after: Duration,
    pub result: ScriptedResult,
}

struct ScriptState {
    script: VecDeque<ScriptedOutcome>,
    store: MemoryStore,
    commits: u64,
}

pub struct ScriptedExecutor {
    state: Rc<RefCell<ScriptState>>,
}

impl ScriptedExecutor {
    pub fn new(script: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self {
            state: Rc::new(RefCell::new(ScriptState {
                script: script.into_iter().collect(),
                store: MemoryStore::new(),
                commits: 0,
            })),
        }
    }

    pub fn remaining(&self) -> usize {
        self.state.borrow().script.len()
    }

    /// Snapshot of the record store.
    pub fn store(&self) -> MemoryStore {
        self.state.borrow().store.clone()
    }
}

/// Optimistic records are keyed per commit so overlapping commits roll back
/// only their own record.
fn optimistic_key(name: &str, commit: u64) -> String {
    format!("{name}:optimistic:{commit}")
}

impl Executor<JsonOperation> for ScriptedExecutor {
    fn commit(&self, request: CommitRequest<JsonOperation>, sink: CommitSink<JsonOperation>) {
        let name = request.document.name().to_string();
        let next = self.state.borrow_mut().script.pop_front();
        let Some(outcome) = next else {
            sink.fail(anyhow!("no scripted outcome left for {name}"));
            return;
        };
        tracing::debug!(
            mutation = %name,
            after = %humantime::format_duration(outcome.after),
            "scripted commit"
        );

        let key = {
            let mut state = self.state.borrow_mut();
            state.commits += 1;
            let key = optimistic_key(&name, state.commits);
            if let Some(optimistic) = request.optimistic_response.clone() {
                state.store.set(&key, optimistic);
            }
            if let Some(updater) = request.optimistic_updater.as_ref() {
                updater(&mut state.store);
            }
            key
        };

        let state = self.state.clone();
        tokio::task::spawn_local(async move {
            tokio::time::sleep(outcome.after).await;
            state.borrow_mut().store.delete(&key);

            match outcome.result {
                ScriptedResult::Respond {
                    response,
                    field_errors,
                } => {
                    if field_errors.is_empty() {
                        let mut state = state.borrow_mut();
                        state.store.set(&name, response.clone());
                        if let Some(updater) = request.updater.as_ref() {
                            updater(&mut state.store, &response);
                        }
                    }
                    let errors = (!field_errors.is_empty()).then_some(field_errors);
                    sink.complete(response, errors);
                }
                ScriptedResult::Fail(message) => sink.fail(anyhow!(message)),
                ScriptedResult::Abandon => drop(sink),
            }
        });
    }
}
