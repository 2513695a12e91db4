use std::fmt;

use crate::core::boundary::DecisionReason;
use crate::core::timer::FinalizeTimer;

use super::action::InFlightAction;

/// Lifecycle of one utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceState {
    /// Nothing heard yet
    Idle,
    /// The user is speaking; nothing is scheduled
    Listening,
    /// A finalize timer is armed
    PendingFinalize,
    /// The utterance was finalized and a response is being produced
    Processing,
}

impl UtteranceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::PendingFinalize => "pending_finalize",
            Self::Processing => "processing",
        }
    }
}

impl fmt::Display for UtteranceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state of one session, owned exclusively by its manager
#[derive(Debug)]
pub(crate) struct SessionState {
    pub phase: UtteranceState,
    /// Accepted final fragments in arrival order
    pub fragments: Vec<String>,
    /// Confidence of the most recent accepted text
    pub confidence: f32,
    /// `fragments` holds an adopted interim hypothesis, not real finals
    pub provisional: bool,
    pub latest_interim: Option<(String, f32)>,
    pub pending_timer: Option<FinalizeTimer>,
    pub pending_reason: Option<DecisionReason>,
    pub in_flight: Option<InFlightAction>,
    pub is_speaking: bool,
    pub next_generation: u64,
    pub next_action_id: u64,
    pub closed: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: UtteranceState::Idle,
            fragments: Vec::new(),
            confidence: 0.0,
            provisional: false,
            latest_interim: None,
            pending_timer: None,
            pending_reason: None,
            in_flight: None,
            is_speaking: false,
            next_generation: 1,
            next_action_id: 1,
            closed: false,
        }
    }
}

impl SessionState {
    pub fn accumulated_text(&self) -> String {
        self.fragments.join(" ")
    }

    pub fn clear_utterance(&mut self) {
        self.fragments.clear();
        self.provisional = false;
        self.latest_interim = None;
        self.pending_reason = None;
    }

    /// Cancel and forget the armed timer, if any
    pub fn cancel_timer(&mut self) -> bool {
        match self.pending_timer.take() {
            Some(timer) => {
                timer.cancel();
                true
            }
            None => false,
        }
    }
}
