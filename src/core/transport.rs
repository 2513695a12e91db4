//! Outgoing client messages and the transport they travel over

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use tokio::sync::mpsc;

use super::trace::TraceEvent;

/// Recognition state reported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AsrState {
    Listening,
    Thinking,
    Canceled,
}

/// Messages sent to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    #[serde(rename = "partial_transcript")]
    PartialTranscript { text: String },
    #[serde(rename = "final_transcript")]
    FinalTranscript { text: String },
    #[serde(rename = "asr_state")]
    AsrState { state: AsrState },
    #[serde(rename = "assistant_response")]
    AssistantResponse { text: String },
    #[serde(rename = "tts_audio_chunk")]
    TtsAudioChunk {
        /// Base64 encoded audio
        audio: String,
        format: String,
        sample_rate: u32,
        chunk_index: usize,
        total_chunks: usize,
    },
    #[serde(rename = "tts_complete")]
    TtsComplete {},
    #[serde(rename = "trace_event")]
    TraceEvent {
        session_id: String,
        trace_id: String,
        event: TraceEvent,
    },
    #[serde(rename = "trace_completed")]
    TraceCompleted { response: String },
}

impl OutgoingMessage {
    pub fn audio_chunk(
        audio: &[u8],
        format: impl Into<String>,
        sample_rate: u32,
        chunk_index: usize,
        total_chunks: usize,
    ) -> Self {
        Self::TtsAudioChunk {
            audio: BASE64.encode(audio),
            format: format.into(),
            sample_rate,
            chunk_index,
            total_chunks,
        }
    }

    /// The `type` tag this message serializes with
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PartialTranscript { .. } => "partial_transcript",
            Self::FinalTranscript { .. } => "final_transcript",
            Self::AsrState { .. } => "asr_state",
            Self::AssistantResponse { .. } => "assistant_response",
            Self::TtsAudioChunk { .. } => "tts_audio_chunk",
            Self::TtsComplete {} => "tts_complete",
            Self::TraceEvent { .. } => "trace_event",
            Self::TraceCompleted { .. } => "trace_completed",
        }
    }

    pub fn to_json(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(|e| TransportError::Serialization(e.to_string()))
    }
}

/// Transport error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Transport closed")]
    Closed,
    #[error("Failed to serialize message: {0}")]
    Serialization(String),
    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Sink for outgoing client messages
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: OutgoingMessage) -> Result<(), TransportError>;
}

/// Transport backed by a bounded mpsc channel; the receiving half is owned by
/// whatever writes to the client socket.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<OutgoingMessage>,
}

impl ChannelTransport {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<OutgoingMessage>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_wire_format() {
        let value = serde_json::to_value(OutgoingMessage::AsrState {
            state: AsrState::Thinking,
        })
        .unwrap();
        assert_eq!(value, json!({"type": "asr_state", "state": "thinking"}));

        let value = serde_json::to_value(OutgoingMessage::TtsComplete {}).unwrap();
        assert_eq!(value, json!({"type": "tts_complete"}));

        let value = serde_json::to_value(OutgoingMessage::TraceCompleted {
            response: String::new(),
        })
        .unwrap();
        assert_eq!(value, json!({"type": "trace_completed", "response": ""}));
    }

    #[test]
    fn test_audio_chunk_is_base64() {
        let message = OutgoingMessage::audio_chunk(b"abc", "linear16", 24000, 1, 3);
        assert_eq!(message.kind(), "tts_audio_chunk");
        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(value["audio"], "YWJj");
        assert_eq!(value["format"], "linear16");
        assert_eq!(value["sample_rate"], 24000);
        assert_eq!(value["chunk_index"], 1);
        assert_eq!(value["total_chunks"], 3);
    }

    #[tokio::test]
    async fn test_channel_transport() {
        let (transport, mut rx) = ChannelTransport::new(4);
        transport
            .send(OutgoingMessage::FinalTranscript {
                text: "hello".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().kind(), "final_transcript");

        drop(rx);
        let result = transport.send(OutgoingMessage::TtsComplete {}).await;
        assert!(matches!(result, Err(TransportError::Closed)));
    }
}
