use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::SynthesisConfig;
use crate::core::trace::{Attrs, Tracer};
use crate::core::transport::{OutgoingMessage, Transport};
use crate::utils::panic_message;

use super::base::{SpeechSynthesizer, TTSError, TTSResult};
use super::markdown::strip_markdown;
use super::segmenter::split_into_segments;

/// Outcome of reading one response aloud
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub total_chunks: usize,
    pub delivered: usize,
    pub skipped: usize,
}

/// Reads assistant responses aloud, one segment at a time.
///
/// Each segment is synthesized and pushed to the client as soon as it is
/// ready, so playback can begin before the whole response is synthesized.
pub struct ResponseReader {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    transport: Arc<dyn Transport>,
    max_chunk_chars: usize,
    enabled: AtomicBool,
}

impl ResponseReader {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transport: Arc<dyn Transport>,
        config: &SynthesisConfig,
    ) -> Self {
        Self {
            synthesizer,
            transport,
            max_chunk_chars: config.max_chunk_chars,
            enabled: AtomicBool::new(config.enabled),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Synthesize `text` segment by segment and stream the audio.
    ///
    /// Segments that fail or produce no audio are skipped. A `tts_complete`
    /// message follows the last segment. Nothing is sent when the reader is
    /// disabled or the text has nothing speakable in it.
    pub async fn read_response(&self, text: &str, tracer: &Tracer) -> ReadSummary {
        if !self.is_enabled() {
            debug!("Speech synthesis disabled, not reading response");
            return ReadSummary::default();
        }

        let cleaned = strip_markdown(text);
        let segments = split_into_segments(&cleaned, self.max_chunk_chars);
        if segments.is_empty() {
            return ReadSummary::default();
        }

        let mut attrs = Attrs::new();
        attrs.insert("segments".to_string(), json!(segments.len()));
        attrs.insert("chars".to_string(), json!(cleaned.chars().count()));

        let summary = tracer
            .in_span("tts.total", attrs, |tracer| async move {
                self.deliver_segments(&segments, &tracer).await
            })
            .await;

        if let Err(e) = self.transport.send(OutgoingMessage::TtsComplete {}).await {
            warn!("Failed to send tts_complete: {}", e);
        }

        debug!(
            "Read response: {}/{} chunks delivered, {} skipped",
            summary.delivered, summary.total_chunks, summary.skipped
        );
        summary
    }

    /// Synthesize one segment, reporting a panicking synthesizer as an error.
    async fn synthesize(&self, segment: &str) -> TTSResult<Vec<u8>> {
        AssertUnwindSafe(async { self.synthesizer.synthesize(segment).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(TTSError::Panicked(panic_message(panic.as_ref()))))
    }

    async fn deliver_segments(&self, segments: &[String], tracer: &Tracer) -> ReadSummary {
        let total_chunks = segments.len();
        let mut summary = ReadSummary {
            total_chunks,
            ..Default::default()
        };

        for (chunk_index, segment) in segments.iter().enumerate() {
            let mut attrs = Attrs::new();
            attrs.insert("chunk_index".to_string(), json!(chunk_index));
            attrs.insert("chars".to_string(), json!(segment.chars().count()));

            let audio = tracer
                .span("tts.synthesize", attrs, |_| self.synthesize(segment))
                .await;

            let audio = match audio {
                Ok(audio) if audio.is_empty() => {
                    warn!("Synthesizer returned no audio for chunk {}", chunk_index);
                    summary.skipped += 1;
                    continue;
                }
                Ok(audio) => audio,
                Err(e) => {
                    warn!("Failed to synthesize chunk {}: {}", chunk_index, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let message = OutgoingMessage::audio_chunk(
                &audio,
                self.synthesizer.format(),
                self.synthesizer.sample_rate(),
                chunk_index,
                total_chunks,
            );
            match self.transport.send(message).await {
                Ok(()) => summary.delivered += 1,
                Err(e) => {
                    warn!("Failed to send audio chunk {}: {}", chunk_index, e);
                    summary.skipped += 1;
                }
            }
        }

        summary
    }
}
