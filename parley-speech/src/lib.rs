//! Speech output for Parley.
//!
//! [`SpeechSynth`] is the seam between the chat controller and whatever
//! actually makes sound. Backends expose a structured voice catalog so
//! voice choice happens in [`select_voice`], not inside each backend.
//!
//! `speak` returns once playback has started. Completion and playback
//! errors after that point are only logged.
use async_trait::async_trait;
use parley_common::Result;

pub mod espeak;
mod voice;

pub use espeak::EspeakSynth;
pub use voice::{Utterance, Voice, VoiceGender, select_voice};

#[async_trait]
pub trait SpeechSynth: Send + Sync {
    /// List the voices this backend can use.
    async fn voices(&self) -> Result<Vec<Voice>>;

    /// Start vocalizing `utterance` without waiting for it to finish.
    async fn speak(&self, utterance: &Utterance) -> Result<()>;

    fn backend_name(&self) -> &str;
}

/// Backend that only logs what it would have said.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSynth;

#[async_trait]
impl SpeechSynth for SilentSynth {
    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(Vec::new())
    }

    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        tracing::info!(
            lang = %utterance.lang,
            voice = ?utterance.voice.as_ref().map(|v| v.name.as_str()),
            text = %utterance.text,
            "speech.silent"
        );
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "none"
    }
}
