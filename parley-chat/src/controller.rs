use crate::session::{ChatOutcome, Mode, Session, SpeakRequest, VoicePreference};
use parley_llm::traits::LlmClient;
use parley_speech::{SpeechSynth, Utterance, select_voice};
use std::sync::Arc;

pub const DEFAULT_LOCALE: &str = "en-US";

/// Run one remote call and fold every error into [`ChatOutcome::Failure`].
pub async fn request_reply(llm: &dyn LlmClient, prompt: &str) -> ChatOutcome {
    match llm.generate(prompt).await {
        Ok(response) => ChatOutcome::Success(response.text),
        Err(e) => ChatOutcome::Failure {
            reason: e.to_string(),
        },
    }
}

/// Vocalize a reply. Catalog and playback errors are logged and dropped.
pub async fn speak(synth: &dyn SpeechSynth, locale: &str, request: &SpeakRequest) {
    let voices = match synth.voices().await {
        Ok(voices) => voices,
        Err(e) => {
            tracing::warn!(error = %e, backend = synth.backend_name(), "speech.voices_failed");
            Vec::new()
        }
    };
    let voice = select_voice(&voices, request.preference.gender()).cloned();
    tracing::debug!(
        preference = request.preference.label(),
        voice = ?voice.as_ref().map(|v| v.name.as_str()),
        "speech.voice_selected"
    );

    let utterance = Utterance {
        text: request.text.clone(),
        lang: locale.to_string(),
        voice,
    };
    if let Err(e) = synth.speak(&utterance).await {
        tracing::warn!(error = %e, backend = synth.backend_name(), "speech.speak_failed");
    }
}

/// Owns a [`Session`] and drives it against a model and a synthesizer.
///
/// The UI actor uses the split `begin_send`/`complete_send` transitions
/// directly; this type runs the whole cycle inline for the one-shot CLI
/// path and for tests.
pub struct ConversationController {
    session: Session,
    llm: Arc<dyn LlmClient + Send + Sync>,
    speech: Arc<dyn SpeechSynth + Send + Sync>,
    locale: String,
}

impl ConversationController {
    pub fn new(
        session: Session,
        llm: Arc<dyn LlmClient + Send + Sync>,
        speech: Arc<dyn SpeechSynth + Send + Sync>,
    ) -> Self {
        Self {
            session,
            llm,
            speech,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Send the session's pending input.
    ///
    /// Returns `None` when nothing was dispatched (blank input or a call
    /// already in flight). Otherwise the outcome is applied to the session
    /// before returning, and in Voice mode a successful reply is spoken.
    pub async fn send_message(&mut self) -> Option<ChatOutcome> {
        let pending = match self.session.begin_send() {
            Ok(pending) => pending,
            Err(refusal) => {
                tracing::debug!(?refusal, "chat.send_skipped");
                return None;
            }
        };

        tracing::info!(model = self.llm.model_name(), "chat.dispatch");
        let outcome = request_reply(self.llm.as_ref(), pending.prompt()).await;

        if let Some(request) = self.session.complete_send(pending, outcome.clone()) {
            speak(self.speech.as_ref(), &self.locale, &request).await;
        }
        Some(outcome)
    }

    /// Replace the pending input with `input` and send it.
    pub async fn ask(&mut self, input: &str) -> Option<ChatOutcome> {
        self.session.set_pending_input(input);
        self.send_message().await
    }

    pub fn toggle_mode(&mut self, target: Mode) {
        self.session.toggle_mode(target);
    }

    pub fn select_voice(&mut self, choice: VoicePreference) {
        self.session.select_voice(choice);
    }
}
