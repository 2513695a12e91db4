//! Callback types for UtteranceManager

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::core::boundary::DecisionReason;

use super::action::TurnAction;
use super::state::UtteranceState;

/// A finalized user utterance
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedUtterance {
    pub text: String,
    pub confidence: f32,
    pub reason: DecisionReason,
}

/// Callback type for interim hypotheses
pub type PartialCallback =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for finalized utterances.
///
/// The returned action, if any, becomes the session's in-flight action.
pub type FinalCallback = Arc<
    dyn Fn(FinalizedUtterance) -> Pin<Box<dyn Future<Output = Option<TurnAction>> + Send>>
        + Send
        + Sync,
>;

/// Callback type for state transitions
pub type StateCallback =
    Arc<dyn Fn(UtteranceState) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for barge-in interruptions
pub type InterruptCallback =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Lifecycle callbacks fired by the manager.
///
/// Callbacks run on the session scheduler; they must not wait on the
/// scheduler themselves (for example by requesting a snapshot).
#[derive(Clone, Default)]
pub struct UtteranceCallbacks {
    pub on_partial: Option<PartialCallback>,
    pub on_final: Option<FinalCallback>,
    pub on_state: Option<StateCallback>,
    pub on_interrupt: Option<InterruptCallback>,
}

impl UtteranceCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_partial<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_partial = Some(Arc::new(move |text| {
            Box::pin(callback(text)) as Pin<Box<dyn Future<Output = ()> + Send>>
        }));
        self
    }

    pub fn on_final<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(FinalizedUtterance) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<TurnAction>> + Send + 'static,
    {
        self.on_final = Some(Arc::new(move |utterance| {
            Box::pin(callback(utterance)) as Pin<Box<dyn Future<Output = Option<TurnAction>> + Send>>
        }));
        self
    }

    pub fn on_state<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(UtteranceState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_state = Some(Arc::new(move |state| {
            Box::pin(callback(state)) as Pin<Box<dyn Future<Output = ()> + Send>>
        }));
        self
    }

    pub fn on_interrupt<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_interrupt = Some(Arc::new(move || {
            Box::pin(callback()) as Pin<Box<dyn Future<Output = ()> + Send>>
        }));
        self
    }
}
