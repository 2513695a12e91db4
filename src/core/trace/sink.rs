use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::transport::{OutgoingMessage, Transport, TransportError};

use super::event::TraceEvent;

/// Trace delivery error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum TraceError {
    #[error("Trace transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Trace sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for trace events
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn emit(&self, session_id: &str, trace_id: &str, event: TraceEvent)
    -> Result<(), TraceError>;
}

/// Wraps each event in a `trace_event` envelope and sends it to the client
pub struct TransportTraceSink {
    transport: Arc<dyn Transport>,
}

impl TransportTraceSink {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TraceSink for TransportTraceSink {
    async fn emit(
        &self,
        session_id: &str,
        trace_id: &str,
        event: TraceEvent,
    ) -> Result<(), TraceError> {
        self.transport
            .send(OutgoingMessage::TraceEvent {
                session_id: session_id.to_string(),
                trace_id: trace_id.to_string(),
                event,
            })
            .await?;
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTraceSink;

#[async_trait]
impl TraceSink for NoopTraceSink {
    async fn emit(&self, _: &str, _: &str, _: TraceEvent) -> Result<(), TraceError> {
        Ok(())
    }
}

/// Keeps events in memory for later inspection
#[derive(Debug, Default)]
pub struct MemoryTraceSink {
    events: Mutex<Vec<(String, TraceEvent)>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(trace_id, event)` pairs in emission order
    pub fn events(&self) -> Vec<(String, TraceEvent)> {
        self.events.lock().clone()
    }

    /// Names of the ended spans, in the order they ended
    pub fn ended_span_names(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|(_, event)| event.kind() == "span_ended")
            .map(|(_, event)| event.name().to_string())
            .collect()
    }
}

#[async_trait]
impl TraceSink for MemoryTraceSink {
    async fn emit(&self, _: &str, trace_id: &str, event: TraceEvent) -> Result<(), TraceError> {
        self.events.lock().push((trace_id.to_string(), event));
        Ok(())
    }
}
