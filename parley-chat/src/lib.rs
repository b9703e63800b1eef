//! Conversation state machine for Parley.
//!
//! [`Session`] holds the transcript, the pending input, the busy flag, the
//! Text/Voice mode and the voice preference. [`ConversationController`]
//! runs a full send cycle against an [`parley_llm::traits::LlmClient`]
//! and a [`parley_speech::SpeechSynth`].
//!
//! ```
//! use parley_chat::{ChatOutcome, Role, Session};
//!
//! let mut session = Session::default();
//! session.set_pending_input("hello");
//! let pending = session.begin_send().unwrap();
//! session.complete_send(pending, ChatOutcome::Success("Hi there!".into()));
//!
//! let speakers: Vec<Role> = session.transcript().iter().map(|t| t.speaker()).collect();
//! assert_eq!(speakers, [Role::Bot, Role::User, Role::Bot]);
//! assert!(!session.is_busy());
//! ```
pub mod controller;
pub mod session;

pub use controller::{ConversationController, DEFAULT_LOCALE, request_reply, speak};
pub use session::{
    ChatOutcome, DEFAULT_GREETING, Mode, PendingSend, Role, SendRefusal, Session, SpeakRequest,
    Turn, VoicePreference,
};
