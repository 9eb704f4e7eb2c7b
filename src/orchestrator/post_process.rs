//! Post-run processing: assemble the report the text and JSON outputs print.

use super::timeline::{Timeline, TimelineEntry};
use anyhow::{Context, Result};
use mutation_runner::{MemoryStore, MutationState};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Report {
    pub mutation: String,
    pub generated_at: String,
    pub torn_down: bool,
    pub final_state: MutationState<Value>,
    pub timeline: Vec<TimelineEntry>,
    pub store: BTreeMap<String, Value>,
    /// Scripted outcomes no commit consumed.
    pub unused_outcomes: usize,
}

pub(crate) fn build_report(
    mutation: &str,
    timeline: &Timeline,
    final_state: MutationState<Value>,
    store: &MemoryStore,
    unused_outcomes: usize,
    torn_down: bool,
) -> Result<Report> {
    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format report timestamp")?;
    if unused_outcomes > 0 {
        tracing::warn!(unused_outcomes, "scenario script has outcomes no commit consumed");
    }
    Ok(Report {
        mutation: mutation.to_string(),
        generated_at,
        torn_down,
        final_state,
        timeline: timeline.entries().to_vec(),
        store: store
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
        unused_outcomes,
    })
}
