//! Ordered record of everything observable during a scenario run.

use mutation_runner::{MutationResult, MutationState};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TimelineEntry {
    /// Milliseconds since the session started.
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: TimelineEvent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub(crate) enum TimelineEvent {
    Invoked {
        call: usize,
        invocation: String,
    },
    /// Invoke refused the call before the executor saw it.
    Rejected {
        call: usize,
        reason: String,
    },
    State {
        version: u64,
        status: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    CompletedCallback {
        call: usize,
    },
    ErrorCallback {
        call: usize,
        error: String,
    },
    Settled {
        call: usize,
        invocation: String,
        outcome: String,
    },
    TornDown,
}

impl TimelineEvent {
    pub(crate) fn settled(call: usize, invocation: String, result: &MutationResult<Value>) -> Self {
        let outcome = match result {
            Ok(Some(_)) => "resolved with data".to_string(),
            Ok(None) => "resolved without data".to_string(),
            Err(e) => format!("rejected: {e}"),
        };
        TimelineEvent::Settled {
            call,
            invocation,
            outcome,
        }
    }

    /// One-line description used by the text summary and the TUI log pane.
    pub(crate) fn describe(&self) -> String {
        match self {
            TimelineEvent::Invoked { call, invocation } => {
                format!("call {call} invoked as {invocation}")
            }
            TimelineEvent::Rejected { call, reason } => format!("call {call} rejected: {reason}"),
            TimelineEvent::State {
                version,
                status,
                data,
                error,
            } => {
                let mut line = format!("state v{version} {status}");
                if let Some(data) = data {
                    line.push_str(&format!(" data={data}"));
                }
                if let Some(error) = error {
                    line.push_str(&format!(" error={error}"));
                }
                line
            }
            TimelineEvent::CompletedCallback { call } => format!("call {call} on_completed"),
            TimelineEvent::ErrorCallback { call, error } => {
                format!("call {call} on_error: {error}")
            }
            TimelineEvent::Settled {
                call,
                invocation,
                outcome,
            } => format!("call {call} ({invocation}) {outcome}"),
            TimelineEvent::TornDown => "consumer torn down".to_string(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Timeline {
    started: Instant,
    entries: Vec<TimelineEntry>,
    states: u64,
}

impl Timeline {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Vec::new(),
            states: 0,
        }
    }

    pub(crate) fn started(&self) -> Instant {
        self.started
    }

    pub(crate) fn push(&mut self, event: TimelineEvent) {
        let at_ms = self.started.elapsed().as_millis() as u64;
        tracing::debug!(at_ms, "{}", event.describe());
        self.entries.push(TimelineEntry { at_ms, event });
    }

    pub(crate) fn record_state(&mut self, state: &MutationState<Value>) {
        self.states += 1;
        self.push(TimelineEvent::State {
            version: self.states,
            status: state.status().label(),
            data: state.data.clone(),
            error: state.error.as_ref().map(|e| e.to_string()),
        });
    }

    pub(crate) fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mutation_runner::MutationError;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn entries_carry_elapsed_time_and_state_versions() {
        let mut timeline = Timeline::new();
        timeline.record_state(&MutationState::in_flight());
        tokio::time::advance(std::time::Duration::from_millis(40)).await;
        timeline.record_state(&MutationState::completed(json!({"ok": true})));

        let entries = timeline.entries();
        assert_eq!(entries[0].at_ms, 0);
        assert_eq!(entries[1].at_ms, 40);
        assert_eq!(entries[1].event.describe(), r#"state v2 completed data={"ok":true}"#);
    }

    #[test]
    fn serializes_with_event_tag() {
        let entry = TimelineEntry {
            at_ms: 5,
            event: TimelineEvent::Rejected {
                call: 2,
                reason: "missing variables".into(),
            },
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"at_ms": 5, "event": "rejected", "call": 2, "reason": "missing variables"})
        );
    }

    #[test]
    fn settled_outcomes_are_described() {
        let rejected: MutationResult<Value> = Err(MutationError::Abandoned);
        let event = TimelineEvent::settled(0, "#3".into(), &rejected);
        assert!(event.describe().starts_with("call 0 (#3) rejected:"));
    }
}
