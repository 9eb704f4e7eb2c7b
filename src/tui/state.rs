use mutation_runner::MutationStatus;
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

pub struct UiState {
    pub tab: usize,
    /// Holds back scheduled calls; manual dispatch still works.
    pub paused: bool,
    pub auto_invoke: bool,
    pub info: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            paused: false,
            auto_invoke: true,
            info: String::new(),
        }
    }
}

impl UiState {
    /// Whether scheduled calls should be dispatched on their own.
    pub fn dispatching(&self) -> bool {
        self.auto_invoke && !self.paused
    }
}

pub fn status_color(status: MutationStatus) -> Color {
    match status {
        MutationStatus::Idle => Color::Gray,
        MutationStatus::Loading => Color::Yellow,
        MutationStatus::Completed => Color::Green,
        MutationStatus::Failed => Color::Red,
    }
}

/// Push `label: value`, wrapping the value to the pane width.
pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_long_values_under_the_label() {
        let mut out = Vec::new();
        // 20 wide minus borders leaves 16; "Data:" plus a space leaves 10 on the first line.
        push_wrapped_status_kv(&mut out, "Data", &"x".repeat(30), 20);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].spans[2].content, "x".repeat(10));
        assert_eq!(out[1].spans[1].content, "x".repeat(14));
        assert_eq!(out[2].spans[1].content, "x".repeat(6));
    }

    #[test]
    fn skips_blank_values() {
        let mut out = Vec::new();
        push_wrapped_status_kv(&mut out, "Error", "   ", 40);
        assert!(out.is_empty());
    }

    #[test]
    fn pause_holds_back_scheduled_calls() {
        let mut state = UiState::default();
        assert!(state.dispatching());
        state.paused = true;
        assert!(!state.dispatching());
    }
}
