mod cli;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use unicorn_validator::commands::validate::{self, Source, ValidateConfig};
use unicorn_validator::config;
use unicorn_validator::session::state::SessionStatus;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let file_config = match cli.config {
        Some(ref path) => config::load_file(path)?,
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            config::load(&cwd)?
        }
    };
    let Some(idea) = cli.idea.clone() else {
        anyhow::bail!("no idea given; usage: unicorn \"<your startup idea>\"");
    };

    let source = match cli.replay.clone() {
        Some(path) => Source::Replay {
            path,
            pace: cli.pace.map(Duration::from_millis),
        },
        None => Source::Live {
            url: cli.url.clone().unwrap_or(file_config.server.url),
            record_to: cli.record.clone(),
        },
    };

    let snapshot = validate::validate(
        ValidateConfig {
            idea,
            run: cli.run_config(file_config.run),
            source,
            export_to: cli.export.clone(),
            show_transcripts: cli.show_transcripts,
            term_width: None,
        },
        std::io::stdout(),
    )
    .await?;

    if snapshot.status == SessionStatus::Error {
        std::process::exit(1);
    }
    Ok(())
}

/// Log to stderr, filtered by `UNICORN_LOG` (default: warnings only).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("UNICORN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
