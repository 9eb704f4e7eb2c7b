mod export;
mod help;
mod state;

use crate::cli::Cli;
use crate::orchestrator::{Session, StatusView, TimelineEvent};
use crate::scenario::Scenario;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use mutation_runner::MutationStatus;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use state::{push_wrapped_status_kv, status_color, UiState};
use std::{io, time::Duration, time::Instant};

/// Run the TUI on the current task. The session is single-threaded, so the
/// UI polls input without blocking and yields between polls to let
/// settlements run.
pub async fn run(args: Cli, scenario: Scenario) -> Result<()> {
    let mut session = Session::new(&scenario, args.overlap())
        .with_context(|| format!("set up scenario {}", args.scenario.display()))?;
    if !args.no_teardown {
        session.schedule_teardown();
    }

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState {
        auto_invoke: args.auto_invoke,
        ..Default::default()
    };
    if !args.auto_invoke {
        state.info = "Press n to dispatch the first call".into();
    }

    let res = event_loop(&mut terminal, &mut session, &mut state).await;

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    session: &mut Session,
    state: &mut UiState,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick: Option<Instant> = None;

    loop {
        let view = session.render();

        if state.dispatching() {
            let due = session
                .next_call_at()
                .is_some_and(|at| session.started().elapsed() >= at);
            if due {
                if let Some(call) = session.dispatch_next(&view.invoke) {
                    state.info = format!("Dispatched call {call}");
                }
                continue;
            }
        }

        if last_tick.map_or(true, |t| t.elapsed() >= tick_rate) {
            terminal.draw(|f| draw(f.area(), f, session, &view, state)).ok();
            last_tick = Some(Instant::now());
        }

        // Never block here: settlements only run while this task is parked.
        if event::poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        return Ok(());
                    }
                    (_, KeyCode::Char('n')) => {
                        state.info = match session.dispatch_next(&view.invoke) {
                            Some(call) => format!("Dispatched call {call}"),
                            None => "No calls left".into(),
                        };
                        last_tick = None;
                    }
                    (_, KeyCode::Char('p')) => {
                        state.paused = !state.paused;
                        state.info = if state.paused {
                            "Scheduled calls paused".into()
                        } else {
                            "Scheduled calls resumed".into()
                        };
                    }
                    (_, KeyCode::Char('u')) => {
                        state.info = if session.teardown().fire() {
                            "Consumer torn down; state writes are now dropped".into()
                        } else {
                            "Consumer already torn down".into()
                        };
                        last_tick = None;
                    }
                    (_, KeyCode::Char('s')) => {
                        export::save_and_show_path(session.report(), state);
                    }
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % 2;
                        last_tick = None;
                    }
                    (_, KeyCode::Char('?')) => {
                        state.tab = 1;
                        last_tick = None;
                    }
                    _ => {}
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn draw(
    area: Rect,
    f: &mut ratatui::Frame,
    session: &Session,
    view: &StatusView,
    state: &UiState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Dashboard"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("mutation-runner"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_dashboard(chunks[1], f, session, view, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_dashboard(
    area: Rect,
    f: &mut ratatui::Frame,
    session: &Session,
    view: &StatusView,
    state: &UiState,
) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(7), // Mutation status
                Constraint::Min(0),    // Timeline + store side-by-side
                Constraint::Length(3), // Info line
            ]
            .as_ref(),
        )
        .split(area);

    draw_status(main[0], f, session, view, state);

    let row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(main[1]);
    draw_timeline(row[0], f, session);
    draw_store(row[1], f, session);

    let info = if state.info.is_empty() {
        "n: next call  p: pause  u: teardown  s: save  ?: help  q: quit".to_string()
    } else {
        state.info.clone()
    };
    let p = Paragraph::new(info).block(Block::default().borders(Borders::ALL).title("Info"));
    f.render_widget(p, main[2]);
}

fn draw_status(
    area: Rect,
    f: &mut ratatui::Frame,
    session: &Session,
    view: &StatusView,
    state: &UiState,
) {
    let consumer = if session.teardown().is_done() {
        Span::styled("torn down", Style::default().fg(Color::Red))
    } else {
        Span::styled("live", Style::default().fg(Color::Green))
    };
    let status = Span::styled(
        view.status.label().to_uppercase(),
        Style::default()
            .fg(status_color(view.status))
            .add_modifier(Modifier::BOLD),
    );

    let next = match session.next_call_at() {
        Some(at) if !state.dispatching() => {
            format!("next at +{} (held)", humantime::format_duration(at))
        }
        Some(at) => format!("next at +{}", humantime::format_duration(at)),
        None => "all dispatched".to_string(),
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::Gray)),
            status,
            Span::raw("   "),
            Span::styled("Consumer: ", Style::default().fg(Color::Gray)),
            consumer,
        ]),
        Line::from(vec![
            Span::styled("Calls: ", Style::default().fg(Color::Gray)),
            Span::raw(format!(
                "{} left, {} in flight, {next}",
                session.calls_remaining(),
                session.in_flight()
            )),
        ]),
    ];
    if let Some(detail) = view.detail.as_deref() {
        let label = if view.status == MutationStatus::Failed {
            "Error"
        } else {
            "Data"
        };
        push_wrapped_status_kv(&mut lines, label, detail, area.width);
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Mutation"));
    f.render_widget(p, area);
}

fn event_color(event: &TimelineEvent) -> Color {
    match event {
        TimelineEvent::Invoked { .. } => Color::Cyan,
        TimelineEvent::Rejected { .. } | TimelineEvent::TornDown => Color::Red,
        TimelineEvent::State { .. } => Color::Gray,
        TimelineEvent::CompletedCallback { .. } => Color::Green,
        TimelineEvent::ErrorCallback { .. } => Color::Magenta,
        TimelineEvent::Settled { .. } => Color::White,
    }
}

fn draw_timeline(area: Rect, f: &mut ratatui::Frame, session: &Session) {
    let timeline = session.timeline();
    let entries = timeline.entries();
    let visible = area.height.saturating_sub(2) as usize;
    let skip = entries.len().saturating_sub(visible);

    let lines: Vec<Line> = entries
        .iter()
        .skip(skip)
        .map(|e| {
            Line::from(vec![
                Span::styled(
                    format!("+{:>6}ms ", e.at_ms),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(e.event.describe(), Style::default().fg(event_color(&e.event))),
            ])
        })
        .collect();

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Timeline"));
    f.render_widget(p, area);
}

fn draw_store(area: Rect, f: &mut ratatui::Frame, session: &Session) {
    let store = session.store();
    let mut lines = Vec::new();
    for (key, value) in store.iter() {
        push_wrapped_status_kv(&mut lines, key, &value.to_string(), area.width);
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "(empty)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Store ({})", store.len())),
    );
    f.render_widget(p, area);
}
