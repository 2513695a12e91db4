pub mod boundary;
pub mod session;
pub mod stt;
pub mod timer;
pub mod trace;
pub mod transcript;
pub mod transport;
pub mod tts;
pub mod turn;
pub mod utterance;

#[cfg(test)]
mod test_support;

// Re-export commonly used types for convenience
pub use boundary::{BoundaryDecider, CompletenessChecker, CompletenessVerdict, Decision, DecisionReason};
pub use session::{
    CallbackBridge, DispatchError, HandlerKind, SessionError, SessionOrchestrator, SessionResult,
};
pub use stt::{RecognitionCallback, RecognitionConfig, RecognitionEngine, RecognitionError};
pub use timer::FinalizeTimer;
pub use trace::{TraceEvent, TraceSink, Tracer};
pub use transcript::{SpeechEvent, TranscriptChannel, TranscriptEvent};
pub use transport::{AsrState, OutgoingMessage, Transport, TransportError};
pub use tts::{ResponseReader, SpeechSynthesizer, TTSError, TTSResult};
pub use turn::{HandlerError, TurnContext, TurnHandler, TurnResponse};
pub use utterance::{
    FinalizedUtterance, TurnAction, UtteranceCallbacks, UtteranceScheduler, UtteranceState,
};
