//! Text summary builder for CLI output.
//!
//! Formats a finished [`Report`] as human-readable lines for text mode.

use crate::orchestrator::Report;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(report: &Report) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!("Mutation: {}", report.mutation));
    lines.push(format!("Generated: {}", report.generated_at));
    lines.push(String::new());

    lines.push("Timeline:".to_string());
    let width = report
        .timeline
        .last()
        .map(|e| e.at_ms.to_string().len())
        .unwrap_or(1);
    for entry in &report.timeline {
        lines.push(format!(
            "  +{:>width$}ms  {}",
            entry.at_ms,
            entry.event.describe()
        ));
    }
    if report.timeline.is_empty() {
        lines.push("  (nothing happened)".to_string());
    }
    lines.push(String::new());

    let state = &report.final_state;
    let mut final_line = format!("Final state: {}", state.status().label());
    if let Some(data) = &state.data {
        final_line.push_str(&format!(" data={data}"));
    }
    if let Some(error) = &state.error {
        final_line.push_str(&format!(" error={error}"));
        if let Some(field_errors) = error.field_errors() {
            lines.push(final_line.clone());
            final_line.clear();
            for fe in field_errors.iter() {
                lines.push(format!("  - {fe}"));
            }
        }
    }
    if !final_line.is_empty() {
        lines.push(final_line);
    }
    if report.torn_down {
        lines.push("Consumer: torn down (later state writes were dropped)".to_string());
    }

    lines.push(format!("Store: {} record(s)", report.store.len()));
    for (key, value) in &report.store {
        lines.push(format!("  {key} = {value}"));
    }

    if report.unused_outcomes > 0 {
        lines.push(format!(
            "Unused scripted outcomes: {}",
            report.unused_outcomes
        ));
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mutation_runner::{FieldError, MutationError, MutationState};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn report(final_state: MutationState<serde_json::Value>) -> Report {
        Report {
            mutation: "AddComment".into(),
            generated_at: "2026-01-01T00:00:00Z".into(),
            torn_down: false,
            final_state,
            timeline: Vec::new(),
            store: BTreeMap::from([("AddComment".to_string(), json!({"id": 9}))]),
            unused_outcomes: 0,
        }
    }

    #[test]
    fn summarizes_completed_run() {
        let summary = build_text_summary(&report(MutationState::completed(json!({"id": 9}))));
        assert!(summary
            .lines
            .contains(&r#"Final state: completed data={"id":9}"#.to_string()));
        assert!(summary.lines.contains(&"Store: 1 record(s)".to_string()));
        assert!(summary.lines.contains(&"  (nothing happened)".to_string()));
    }

    #[test]
    fn lists_field_errors_individually() {
        let error = MutationError::from(vec![
            FieldError::new("body required"),
            FieldError::new("too many links"),
        ]);
        let mut r = report(MutationState::failed(error));
        r.torn_down = true;
        r.unused_outcomes = 2;
        let lines = build_text_summary(&r).lines;

        assert!(lines.contains(&"  - body required".to_string()));
        assert!(lines.contains(&"  - too many links".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("Consumer: torn down")));
        assert_eq!(lines.last().unwrap(), "Unused scripted outcomes: 2");
    }
}
