//! Common types and utilities shared across Parley crates.
//!
//! This crate holds the shared error type and the tracing initialiser used
//! by the binary and the integration tests. It stays small so every crate
//! in the workspace can depend on it.
//!
//! # Overview
//!
//! - [`ParleyError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use parley_common::{ParleyError, Result};
//!
//! fn needs_key(key: &str) -> Result<&str> {
//!     if key.is_empty() {
//!         return Err(ParleyError::Config("missing API key".into()));
//!     }
//!     Ok(key)
//! }
//!
//! assert!(needs_key("").is_err());
//! assert_eq!(needs_key("abc").unwrap(), "abc");
//! ```

pub mod observability;

/// Error types used across the Parley workspace.
#[derive(thiserror::Error, Debug)]
pub enum ParleyError {
    /// The language model call failed (network, API or decode).
    #[error("LLM error: {0}")]
    Llm(String),

    /// The speech synthesizer could not list voices or start playback.
    #[error("Speech error: {0}")]
    Speech(String),

    /// A driver (process, terminal, etc.) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,
}

/// Convenient alias for results that use [`ParleyError`].
pub type Result<T> = std::result::Result<T, ParleyError>;
