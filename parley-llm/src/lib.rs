//! Language model integration for Parley.
//!
//! This crate exposes the [`traits::LlmClient`] interface and the Gemini
//! implementation used by the chat controller.
//!
//! # Examples
//! ```no_run
//! use parley_llm::{gemini::GeminiClient, traits::LlmClient, DEFAULT_GEMINI_MODEL};
//!
//! # #[tokio::main]
//! # async fn main() -> parley_common::Result<()> {
//! let key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
//! let client = GeminiClient::new(&key, DEFAULT_GEMINI_MODEL)?;
//! let reply = client.generate("Say hi").await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```
pub mod gemini;
pub mod traits;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-002";
