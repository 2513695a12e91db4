use std::sync::Arc;

use crate::core::transcript::TranscriptEvent;

/// Configuration handed to a recognition engine before streaming starts
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct RecognitionConfig {
    /// Language code for transcription (e.g., "en-US", "es-ES")
    pub language: String,
    /// Sample rate of the audio in Hz
    pub sample_rate: u32,
    /// Number of audio channels (1 for mono, 2 for stereo)
    pub channels: u16,
    /// Encoding of the audio
    pub encoding: String,
    /// Produce interim hypotheses in addition to final results
    pub interim_results: bool,
    /// Enable punctuation in results
    pub punctuation: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            sample_rate: 16000,
            channels: 1,
            encoding: "linear16".to_string(),
            interim_results: true,
            punctuation: true,
        }
    }
}

/// Error types for recognition operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecognitionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Not streaming: {0}")]
    NotStreaming(String),
    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Callback invoked by an engine for each recognition result.
///
/// Engines may call it from their own worker threads, outside any tokio
/// runtime, so it is synchronous and must return quickly.
pub type RecognitionCallback = Arc<dyn Fn(TranscriptEvent) + Send + Sync>;

/// A streaming speech recognition engine
#[async_trait::async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Prepare the engine (credentials, model loading, connection)
    async fn initialize(&mut self, config: RecognitionConfig) -> Result<(), RecognitionError>;

    /// Start a recognition stream.
    ///
    /// # Arguments
    /// * `on_final` - Receives final results
    /// * `on_interim` - Receives interim hypotheses
    /// * `emit_events` - Also deliver speech-activity start/end markers
    async fn start_streaming(
        &mut self,
        on_final: RecognitionCallback,
        on_interim: RecognitionCallback,
        emit_events: bool,
    ) -> Result<(), RecognitionError>;

    /// Feed audio into the running stream
    async fn stream_audio(&mut self, audio: Vec<u8>) -> Result<(), RecognitionError>;

    /// Stop the stream. Stopping an engine that is not streaming is a no-op.
    async fn stop_streaming(&mut self) -> Result<(), RecognitionError>;

    fn is_streaming(&self) -> bool;

    fn provider_info(&self) -> &'static str {
        "recognition"
    }
}
