use anyhow::Result;
use clap::Parser;
use parley_common::observability::init_logging;
use std::process::ExitCode;

mod once;
mod setup;
mod wire;

use setup::{Cli, config_path, load_config, log_config};
use wire::Wiring;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1) Config: file, then PARLEY__* env, then flags.
    let cfg = load_config(&cli)?;

    // 2) Logging. The TUI owns the terminal, so stderr only in one-shot mode.
    let log_path = init_logging(log_config(&cfg, cli.once.is_some()))?;
    tracing::info!(log = %log_path.display(), model = %cfg.llm.model, "parley.start");
    match config_path(&cli) {
        Some(path) => tracing::debug!(path = %path.display(), "config.file"),
        None => tracing::debug!("config.defaults_only"),
    }

    if let Some(text) = cli.once.as_deref() {
        return once::run_once(&cfg, text).await;
    }

    let mut wiring = Wiring::new();
    wiring.build_from_config(&cfg)?;
    wiring.run().await?;
    Ok(ExitCode::SUCCESS)
}
