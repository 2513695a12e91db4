//! Per-turn tracing delivered to the client
//!
//! This is product telemetry shown to the user (which tools ran, how long
//! synthesis took), separate from process logging through `tracing`.

mod event;
mod sink;
mod tracer;


pub use event::{Attrs, SpanRecord, SpanStatus, TraceEvent};
pub use sink::{MemoryTraceSink, NoopTraceSink, TraceError, TraceSink, TransportTraceSink};
pub use tracer::{Clock, Tracer};
