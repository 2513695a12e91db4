//! # Speech synthesis abstraction
//!
//! The gateway does not talk to synthesis vendors itself. It consumes a
//! [`SpeechSynthesizer`] that turns one short piece of text into one buffer
//! of audio, and handles segmentation and delivery on top of that.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use utterance_gateway::core::tts::{SpeechSynthesizer, TTSResult};
//!
//! struct Beeper;
//!
//! #[async_trait]
//! impl SpeechSynthesizer for Beeper {
//!     async fn synthesize(&self, text: &str) -> TTSResult<Vec<u8>> {
//!         Ok(vec![0u8; text.len() * 320])
//!     }
//!
//!     fn format(&self) -> &str {
//!         "linear16"
//!     }
//!
//!     fn sample_rate(&self) -> u32 {
//!         16000
//!     }
//! }
//! ```

use async_trait::async_trait;

/// TTS-specific error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum TTSError {
    #[error("Provider not ready: {0}")]
    ProviderNotReady(String),

    #[error("Audio generation failed: {0}")]
    AudioGenerationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Synthesizer panicked: {0}")]
    Panicked(String),
}

/// Result type for TTS operations
pub type TTSResult<T> = Result<T, TTSError>;

/// Turns text into audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into a single audio buffer.
    ///
    /// An empty buffer means there was nothing to say; callers skip it.
    async fn synthesize(&self, text: &str) -> TTSResult<Vec<u8>>;

    /// Audio format label sent to the client (e.g., "linear16", "mp3")
    fn format(&self) -> &str;

    /// Sample rate of the produced audio in Hz
    fn sample_rate(&self) -> u32;
}
