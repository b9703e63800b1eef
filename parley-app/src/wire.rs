use anyhow::Result;
use parley_actors::{ChatActor, SpeechActor, builder::Builder};
use parley_config::ParleyConfig;
use parley_tui::{TuiActor, spawn_tui_feeders};

use crate::setup::{build_llm_client, build_speech, initial_session};

const CHAT_MAILBOX: usize = 8;
const SPEECH_MAILBOX: usize = 8;
const TUI_MAILBOX: usize = 256;

/// Interactive mode: chat and speech workers behind the terminal UI.
pub struct Wiring {
    builder: Builder,
}

impl Wiring {
    pub fn new() -> Self {
        Self {
            builder: Builder::new(),
        }
    }

    pub fn build_from_config(&mut self, cfg: &ParleyConfig) -> Result<()> {
        let b = &mut self.builder;
        let shutdown = b.shutdown_handle();

        let llm = build_llm_client(&cfg.llm)?;
        let speech = build_speech(&cfg.speech);
        tracing::info!(
            model = llm.model_name(),
            speech = speech.backend_name(),
            "wire.clients_ready"
        );

        // Reserve the UI first so nothing can draw before the workers exist.
        let r_tui = b.reserve::<TuiActor>("tui:main", TUI_MAILBOX);

        let chat = b.spawn("chat:main", CHAT_MAILBOX, ChatActor::new(llm));
        let speech = b.spawn(
            "speech:main",
            SPEECH_MAILBOX,
            SpeechActor::new(speech).with_locale(cfg.speech.locale.clone()),
        );

        let tui_addr = r_tui.addr();
        let tui = TuiActor::new(
            initial_session(&cfg.ui),
            cfg.ui.title.clone(),
            chat,
            speech,
            shutdown.clone(),
        )?;
        b.start_reserved(r_tui, tui);
        spawn_tui_feeders(tui_addr, shutdown);

        Ok(())
    }

    pub async fn run(self) -> Result<()> {
        self.builder.run_until_shutdown().await
    }
}
