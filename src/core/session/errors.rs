//! Error types for session operations

use crate::config::ConfigError;
use crate::core::{
    boundary::CheckerError, stt::RecognitionError, trace::TraceError, transport::TransportError,
    tts::TTSError, turn::HandlerError,
};

/// Failure to hand work to the session scheduler or a bridged callback target
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("Session scheduler is closed")]
    SchedulerClosed,
    #[error("Callback bridge is closed")]
    BridgeClosed,
    #[error("No target registered for the {0} channel")]
    NoTarget(String),
    #[error("Callback target failed: {0}")]
    TargetFailed(String),
    #[error("Callback target panicked: {0}")]
    TargetPanicked(String),
}

/// Error types for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),
    #[error("TTS error: {0}")]
    TTS(#[from] TTSError),
    #[error("Turn handler error: {0}")]
    Handler(#[from] HandlerError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("Checker error: {0}")]
    Checker(#[from] CheckerError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Session already started")]
    AlreadyStarted,
    #[error("Session not started")]
    NotStarted,
    #[error("Session closed")]
    Closed,
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
