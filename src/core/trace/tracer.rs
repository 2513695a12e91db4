use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use super::event::{Attrs, SpanRecord, SpanStatus, TraceEvent};
use super::sink::{NoopTraceSink, TraceSink};

/// Millisecond clock used for trace timestamps
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    })
}

/// Emits events and spans for one trace (one user turn) of a session.
///
/// Sink failures are logged and otherwise ignored, so tracing never changes
/// the outcome of the work it observes. Cloning is cheap.
#[derive(Clone)]
pub struct Tracer {
    session_id: Arc<str>,
    trace_id: Arc<str>,
    sink: Arc<dyn TraceSink>,
    clock: Clock,
    parent_span_id: Option<String>,
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("session_id", &self.session_id)
            .field("trace_id", &self.trace_id)
            .field("parent_span_id", &self.parent_span_id)
            .finish()
    }
}

impl Tracer {
    pub fn new(
        session_id: impl Into<Arc<str>>,
        trace_id: impl Into<Arc<str>>,
        sink: Arc<dyn TraceSink>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            trace_id: trace_id.into(),
            sink,
            clock: system_clock(),
            parent_span_id: None,
        }
    }

    /// A tracer that records nothing
    pub fn disabled() -> Self {
        Self::new("", "", Arc::new(NoopTraceSink))
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Same session, sink and clock; fresh trace with no open span.
    pub fn for_trace(&self, trace_id: impl Into<Arc<str>>) -> Self {
        Self {
            session_id: self.session_id.clone(),
            trace_id: trace_id.into(),
            sink: self.sink.clone(),
            clock: self.clock.clone(),
            parent_span_id: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Id of the span this tracer nests under, if any
    pub fn parent_span_id(&self) -> Option<&str> {
        self.parent_span_id.as_deref()
    }

    fn now_ms(&self) -> u64 {
        (self.clock)()
    }

    async fn emit(&self, event: TraceEvent) {
        if let Err(e) = self
            .sink
            .emit(&self.session_id, &self.trace_id, event)
            .await
        {
            warn!("Failed to emit trace event: {}", e);
        }
    }

    /// Emit a discrete event
    pub async fn event(&self, name: &str, attrs: Attrs) {
        let event = TraceEvent::Event {
            ts_ms: self.now_ms(),
            name: name.to_string(),
            attrs,
        };
        self.emit(event).await;
    }

    /// Run `f` inside a span named `name`.
    ///
    /// `f` receives a tracer whose spans nest under this one. An `Err` result
    /// ends the span with status `error` and is returned unchanged.
    pub async fn span<F, Fut, T, E>(&self, name: &str, attrs: Attrs, f: F) -> Result<T, E>
    where
        F: FnOnce(Tracer) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut record = SpanRecord {
            span_id: Uuid::new_v4().simple().to_string(),
            parent_span_id: self.parent_span_id.clone(),
            name: name.to_string(),
            start_ts_ms: self.now_ms(),
            duration_ms: None,
            status: None,
            attrs,
        };
        self.emit(TraceEvent::SpanStarted {
            ts_ms: record.start_ts_ms,
            span: record.clone(),
        })
        .await;

        let child = Tracer {
            parent_span_id: Some(record.span_id.clone()),
            ..self.clone()
        };
        let result = f(child).await;

        let ended_at = self.now_ms();
        record.duration_ms = Some(ended_at.saturating_sub(record.start_ts_ms));
        match &result {
            Ok(_) => record.status = Some(SpanStatus::Ok),
            Err(e) => {
                record.status = Some(SpanStatus::Error);
                record
                    .attrs
                    .insert("error".to_string(), Value::String(e.to_string()));
            }
        }
        self.emit(TraceEvent::SpanEnded {
            ts_ms: ended_at,
            span: record,
        })
        .await;

        result
    }

    /// Like [`Tracer::span`] for work that cannot fail
    pub async fn in_span<F, Fut, T>(&self, name: &str, attrs: Attrs, f: F) -> T
    where
        F: FnOnce(Tracer) -> Fut,
        Fut: Future<Output = T>,
    {
        let result: Result<T, std::convert::Infallible> = self
            .span(name, attrs, |tracer| async move { Ok(f(tracer).await) })
            .await;
        match result {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}
