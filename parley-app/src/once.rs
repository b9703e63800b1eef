use anyhow::Result;
use parley_chat::{ChatOutcome, ConversationController};
use parley_config::ParleyConfig;
use std::process::ExitCode;

use crate::setup::{build_llm_client, build_speech, initial_session};

/// Send `text` once, print the reply, speak it in Voice mode.
pub async fn run_once(cfg: &ParleyConfig, text: &str) -> Result<ExitCode> {
    let mut controller = ConversationController::new(
        initial_session(&cfg.ui),
        build_llm_client(&cfg.llm)?,
        build_speech(&cfg.speech),
    )
    .with_locale(cfg.speech.locale.clone());

    Ok(match controller.ask(text).await {
        Some(ChatOutcome::Success(reply)) => {
            println!("{reply}");
            ExitCode::SUCCESS
        }
        Some(ChatOutcome::Failure { reason }) => {
            eprintln!("parley: request failed: {reason}");
            ExitCode::FAILURE
        }
        None => {
            eprintln!("parley: nothing to send");
            ExitCode::from(2)
        }
    })
}
