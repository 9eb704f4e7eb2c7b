use crate::orchestrator::Report;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::state::UiState;

/// Replace anything that could split or escape a path component.
fn file_safe(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// File name for a saved report: mutation name plus the UTC stamp, both
/// made filesystem-safe.
fn report_file_name(report: &Report) -> String {
    format!(
        "{}-{}.json",
        file_safe(&report.mutation),
        file_safe(&report.generated_at)
    )
}

pub fn export_report_json(report: &Report, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(report_file_name(report));
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Save the report next to the working directory and update state.info.
pub fn save_and_show_path(report: Result<Report>, state: &mut UiState) {
    let saved = report.and_then(|r| export_report_json(&r, Path::new(".")));
    match saved {
        Ok(path) => {
            state.info = format!("Saved: {}", path.display());
        }
        Err(e) => {
            state.info = format!("Save failed: {e:#}");
        }
    }
}
