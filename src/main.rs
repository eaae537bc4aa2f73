use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epicflow::cli::{Cli, Command};
use epicflow::config::EpicflowConfig;
use epicflow::orchestrator::{Orchestrator, demo_events, read_candidates, read_events};
use epicflow::ranking::sort_resume_candidates;
use epicflow::state_machine::State;
use epicflow::ui::TransitionPrinter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EpicflowConfig::load().context("failed to load epicflow.toml")?;
    if cli.auto_resume {
        config.auto_resume = true;
    }
    if let Some(max) = cli.max_feedback {
        config.max_reviewer_feedback_count = max;
        config.validate()?;
    }

    let default_filter = if cli.verbose {
        "epicflow=debug".to_string()
    } else {
        config.log_filter.clone()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let printer = TransitionPrinter::new();

    match cli.command {
        Command::Demo => {
            let orch = Orchestrator::new(EpicflowConfig {
                snapshot_path: None,
                ..config
            });
            let start = orch.start_snapshot(None)?;
            let report = orch
                .run(start, demo_events(), |from, event, result| {
                    printer.print(from, event, result)
                })
                .await?;
            info!(run_id = %report.run_id, dispatched = report.dispatched, "demo finished");
            printer.print_snapshot(&report.snapshot);
        }
        Command::Replay { file, from_state } => {
            let from_state = from_state.map(|s| s.parse::<State>()).transpose()?;
            let events = read_events(&file)
                .with_context(|| format!("failed to read events from {}", file.display()))?;
            let orch = Orchestrator::new(config);
            let start = orch.start_snapshot(from_state)?;
            let report = orch
                .run(start, events, |from, event, result| {
                    printer.print(from, event, result)
                })
                .await?;
            info!(
                run_id = %report.run_id,
                dispatched = report.dispatched,
                absorbed = report.absorbed,
                "replay finished"
            );
            printer.print_snapshot(&report.snapshot);
        }
        Command::Rank { file } => {
            let candidates = read_candidates(&file)
                .with_context(|| format!("failed to read candidates from {}", file.display()))?;
            printer.print_ranking(&sort_resume_candidates(&candidates));
        }
        Command::States => printer.print_states(),
    }

    Ok(())
}
