use crate::actor::{Actor, Context};
use anyhow::Result;
use parley_chat::{DEFAULT_LOCALE, SpeakRequest, speak};
use parley_speech::SpeechSynth;
use std::sync::Arc;

/// Fire-and-forget speech output. Failures are logged inside [`speak`]
/// and never reach the sender.
pub struct SpeechActor {
    synth: Arc<dyn SpeechSynth + Send + Sync>,
    locale: String,
}

impl SpeechActor {
    pub fn new(synth: Arc<dyn SpeechSynth + Send + Sync>) -> Self {
        Self {
            synth,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}

#[async_trait::async_trait]
impl Actor for SpeechActor {
    type Msg = SpeakRequest;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        speak(self.synth.as_ref(), &self.locale, &msg).await;
        Ok(())
    }
}
