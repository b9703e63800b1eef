//! Minimal tokio actor runtime plus the two background actors Parley
//! needs: [`chat::ChatActor`] for remote model calls and
//! [`speech::SpeechActor`] for speech output.
pub mod actor;
pub mod builder;
pub mod chat;
pub mod speech;
pub mod system;

pub use chat::{ChatActor, ChatCmd};
pub use speech::SpeechActor;
