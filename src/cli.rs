use crate::orchestrator::{self, Session};
use crate::scenario::Scenario;
use anyhow::{Context, Result};
use clap::Parser;
use mutation_runner::OverlapPolicy;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "mutation-runner",
    version,
    about = "Replay a mutation scenario against a scripted executor, with optional TUI"
)]
pub struct Cli {
    /// Scenario file (JSON): the mutation, its calls and the executor's outcomes
    #[arg(long, short)]
    pub scenario: PathBuf,

    /// Print JSON report and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text timeline and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Trace-level logging on stderr (text and JSON modes)
    #[arg(long, short)]
    pub verbose: bool,

    /// Ignore the scenario's teardown_after
    #[arg(long)]
    pub no_teardown: bool,

    /// Only the most recently started invocation writes state
    #[arg(long)]
    pub latest_wins: bool,

    /// Use --auto-invoke true or --auto-invoke false to override (TUI only)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_invoke: bool,
}

impl Cli {
    /// Policy override from the command line, if any.
    pub fn overlap(&self) -> Option<OverlapPolicy> {
        self.latest_wins
            .then_some(OverlapPolicy::LatestInvocationWins)
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!(
            "--json and --text are mutually exclusive. Pick one."
        ));
    }

    let scenario = Scenario::load(&args.scenario)?;

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args, scenario).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args, scenario).await;
        }
    }

    if args.json {
        return run_json(args, scenario).await;
    }

    run_text(args, scenario).await
}

fn set_up_logging(args: &Cli) -> Result<()> {
    crate::logging::set_up(&crate::logging::Options {
        verbose: args.verbose,
        color: std::io::stderr().is_terminal(),
    })
}

/// Play the whole scenario without a UI.
async fn run_session(args: &Cli, scenario: &Scenario) -> Result<orchestrator::Report> {
    let mut session = Session::new(scenario, args.overlap())
        .with_context(|| format!("set up scenario {}", args.scenario.display()))?;
    if !args.no_teardown {
        session.schedule_teardown();
    }
    tracing::info!(
        mutation = %scenario.mutation.name,
        calls = scenario.calls.len(),
        "playing scenario"
    );
    orchestrator::play(&mut session).await;
    session.report()
}

async fn run_json(args: Cli, scenario: Scenario) -> Result<()> {
    set_up_logging(&args)?;
    let (out_tx, out_handle) = spawn_output_writer();

    let report = run_session(&args, &scenario).await?;
    let out = serde_json::to_string_pretty(&report)?;
    let _ = out_tx.send(OutputLine::Stdout(out));

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

async fn run_text(args: Cli, scenario: Scenario) -> Result<()> {
    set_up_logging(&args)?;
    let (out_tx, out_handle) = spawn_output_writer();
    let teardown = match scenario.teardown_after {
        Some(after) if !args.no_teardown => {
            format!(", teardown after {}", humantime::format_duration(after))
        }
        _ => String::new(),
    };
    let _ = out_tx.send(OutputLine::Stderr(format!(
        "== {} ({} call(s){teardown}) ==",
        scenario.mutation.name,
        scenario.calls.len()
    )));

    let report = run_session(&args, &scenario).await?;
    let summary = crate::text_summary::build_text_summary(&report);
    for line in summary.lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}
