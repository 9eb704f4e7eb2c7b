mod cli;
mod logging;
mod orchestrator;
mod scenario;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = args.json || args.text;

    // Runners are single-threaded; everything that settles them runs on this set.
    let local = tokio::task::LocalSet::new();
    local.run_until(cli::run(args)).await?;

    // Explicitly exit with code 0 on success for non-TUI modes
    if is_non_tui {
        std::process::exit(0);
    }
    Ok(())
}
