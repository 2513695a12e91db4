use serde::Serialize;
use serde_json::{Map, Value};

/// Span/event attributes
pub type Attrs = Map<String, Value>;

/// Outcome of a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Ok,
    Error,
}

/// A timed operation within a trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanRecord {
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub name: String,
    pub start_ts_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SpanStatus>,
    pub attrs: Attrs,
}

/// One entry of the trace stream sent to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A discrete point-in-time event such as `utterance.finalized`
    Event {
        ts_ms: u64,
        name: String,
        attrs: Attrs,
    },
    SpanStarted {
        ts_ms: u64,
        span: SpanRecord,
    },
    SpanEnded {
        ts_ms: u64,
        span: SpanRecord,
    },
}

impl TraceEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event { .. } => "event",
            Self::SpanStarted { .. } => "span_started",
            Self::SpanEnded { .. } => "span_ended",
        }
    }

    /// Event or span name
    pub fn name(&self) -> &str {
        match self {
            Self::Event { name, .. } => name,
            Self::SpanStarted { span, .. } | Self::SpanEnded { span, .. } => &span.name,
        }
    }

    pub fn span(&self) -> Option<&SpanRecord> {
        match self {
            Self::Event { .. } => None,
            Self::SpanStarted { span, .. } | Self::SpanEnded { span, .. } => Some(span),
        }
    }
}
