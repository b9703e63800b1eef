//! Conversation session state and its transitions.
//!
//! A [`Session`] is owned by exactly one task (the UI actor or the
//! one-shot CLI path) and mutated through `&mut self`, so transitions are
//! serialized without locks. Sending is split in two so the remote call
//! can run elsewhere: [`Session::begin_send`] hands out a [`PendingSend`],
//! and [`Session::complete_send`] applies its [`ChatOutcome`].

use parley_speech::VoiceGender;

pub const DEFAULT_GREETING: &str = "Hi boss, how can I help you?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

/// One transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    speaker: Role,
    text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Role::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            speaker: Role::Bot,
            text: text.into(),
        }
    }

    pub fn speaker(&self) -> Role {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Text,
    Voice,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Text => "Text",
            Mode::Voice => "Voice",
        }
    }

    pub fn other(self) -> Mode {
        match self {
            Mode::Text => Mode::Voice,
            Mode::Voice => Mode::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoicePreference {
    #[default]
    Female,
    Male,
}

impl VoicePreference {
    pub fn gender(self) -> VoiceGender {
        match self {
            VoicePreference::Female => VoiceGender::Female,
            VoicePreference::Male => VoiceGender::Male,
        }
    }

    pub fn label(self) -> &'static str {
        self.gender().label()
    }
}

/// A prompt that has been dispatched and is awaiting its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    prompt: String,
}

impl PendingSend {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Result of one remote call. Network, API and decode failures are not
/// distinguished past this point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Success(String),
    Failure { reason: String },
}

impl ChatOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ChatOutcome::Success(_))
    }
}

/// Request to vocalize a reply, produced only in Voice mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakRequest {
    pub text: String,
    pub preference: VoicePreference,
}

/// Why [`Session::begin_send`] declined to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRefusal {
    /// Pending input is empty or whitespace.
    EmptyInput,
    /// A call is already in flight.
    Busy,
}

#[derive(Debug, Clone)]
pub struct Session {
    transcript: Vec<Turn>,
    pending_input: String,
    busy: bool,
    mode: Mode,
    voice_preference: VoicePreference,
    show_voice_popup: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}

impl Session {
    /// Fresh session whose transcript holds only the greeting.
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            transcript: vec![Turn::bot(greeting)],
            pending_input: String::new(),
            busy: false,
            mode: Mode::Text,
            voice_preference: VoicePreference::Female,
            show_voice_popup: false,
        }
    }

    pub fn with_voice_preference(mut self, preference: VoicePreference) -> Self {
        self.voice_preference = preference;
        self
    }

    /// Start in `mode` without opening the voice prompt; used for the
    /// configured initial mode, where the voice is already known.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn pending_input_mut(&mut self) -> &mut String {
        &mut self.pending_input
    }

    pub fn set_pending_input(&mut self, input: impl Into<String>) {
        self.pending_input = input.into();
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn voice_preference(&self) -> VoicePreference {
        self.voice_preference
    }

    pub fn show_voice_popup(&self) -> bool {
        self.show_voice_popup
    }

    /// Validate the pending input and mark the session busy.
    ///
    /// The input stays in place until [`Session::complete_send`] clears it.
    /// Whitespace-only input and sends while busy are refused without
    /// touching any state.
    pub fn begin_send(&mut self) -> Result<PendingSend, SendRefusal> {
        if self.busy {
            return Err(SendRefusal::Busy);
        }
        if self.pending_input.trim().is_empty() {
            return Err(SendRefusal::EmptyInput);
        }
        self.busy = true;
        Ok(PendingSend {
            prompt: self.pending_input.clone(),
        })
    }

    /// Apply the outcome of a dispatched send.
    ///
    /// On success the user and bot turns are appended together. Failures
    /// are logged and leave the transcript alone. Either way the pending
    /// input is cleared and the session is idle again.
    pub fn complete_send(
        &mut self,
        pending: PendingSend,
        outcome: ChatOutcome,
    ) -> Option<SpeakRequest> {
        self.pending_input.clear();
        self.busy = false;

        match outcome {
            ChatOutcome::Success(reply) => {
                self.transcript
                    .extend([Turn::user(pending.prompt), Turn::bot(reply.clone())]);
                (self.mode == Mode::Voice).then(|| SpeakRequest {
                    text: reply,
                    preference: self.voice_preference,
                })
            }
            ChatOutcome::Failure { reason } => {
                tracing::error!(
                    reason = %reason,
                    prompt_len = pending.prompt.len(),
                    "chat.send_failed"
                );
                None
            }
        }
    }

    /// Switch mode. Choosing Voice also opens the voice prompt.
    pub fn toggle_mode(&mut self, target: Mode) {
        self.mode = target;
        if target == Mode::Voice {
            self.show_voice_popup = true;
        }
    }

    /// Record the voice preference and close the voice prompt.
    pub fn select_voice(&mut self, choice: VoicePreference) {
        self.voice_preference = choice;
        self.show_voice_popup = false;
    }
}
