use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc::WeakUnboundedSender;
use tracing::{debug, error, info};

use crate::core::boundary::{BoundaryDecider, Decision, DecisionReason};
use crate::core::timer::FinalizeTimer;
use crate::core::transcript::{SpeechEvent, TranscriptChannel, TranscriptEvent};
use crate::utils::panic_message;

use super::action::{ActionId, CancelOutcome, InFlightAction, TurnAction};
use super::callbacks::{FinalizedUtterance, UtteranceCallbacks};
use super::scheduler::{ManagerCommand, ManagerSnapshot};
use super::state::{SessionState, UtteranceState};

/// Per-session endpointing state machine.
///
/// Consumes transcript events, coalesces final fragments, keeps at most one
/// finalize timer armed and at most one action in flight, and fires the
/// lifecycle callbacks. It is driven exclusively by its scheduler task, so
/// none of its state needs locking.
pub struct UtteranceManager {
    decider: BoundaryDecider,
    callbacks: UtteranceCallbacks,
    cancel_grace: Duration,
    commands: WeakUnboundedSender<ManagerCommand>,
    state: SessionState,
}

async fn guarded<T>(what: &str, future: impl Future<Output = T>) -> Option<T> {
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(value) => Some(value),
        Err(payload) => {
            error!("{} callback panicked: {}", what, panic_message(payload.as_ref()));
            None
        }
    }
}

impl UtteranceManager {
    pub(crate) fn new(
        decider: BoundaryDecider,
        callbacks: UtteranceCallbacks,
        cancel_grace: Duration,
        commands: WeakUnboundedSender<ManagerCommand>,
    ) -> Self {
        Self {
            decider,
            callbacks,
            cancel_grace,
            commands,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> UtteranceState {
        self.state.phase
    }

    pub fn accumulated_text(&self) -> String {
        self.state.accumulated_text()
    }

    pub fn has_pending_timer(&self) -> bool {
        self.state.pending_timer.is_some()
    }

    pub fn has_in_flight_action(&self) -> bool {
        self.state
            .in_flight
            .as_ref()
            .is_some_and(|action| !action.is_finished())
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        let timer = self.state.pending_timer.as_ref();
        ManagerSnapshot {
            state: self.state.phase,
            accumulated_text: self.state.accumulated_text(),
            pending_generation: timer.map(|t| t.generation()),
            pending_timeout: timer.map(|t| t.delay()),
            pending_reason: self.state.pending_reason.as_ref().map(|r| r.to_string()),
            in_flight_action: self
                .state
                .in_flight
                .as_ref()
                .filter(|action| !action.is_finished())
                .map(|action| action.id()),
            is_speaking: self.state.is_speaking,
        }
    }

    /// Route one command from the scheduler queue
    pub(crate) async fn handle(&mut self, command: ManagerCommand) {
        if self.state.closed
            && !matches!(
                command,
                ManagerCommand::Snapshot { .. } | ManagerCommand::Shutdown { .. }
            )
        {
            debug!("Manager closed, dropping {} command", command.kind());
            return;
        }

        match command {
            ManagerCommand::Transcript { event, channel } => {
                self.on_transcript_event(event, channel).await;
            }
            ManagerCommand::TimerFired { generation } => {
                self.on_timer_fired(generation).await;
            }
            ManagerCommand::Interrupt { reply } => {
                let interrupted = self.interrupt().await;
                if let Some(reply) = reply {
                    let _ = reply.send(interrupted);
                }
            }
            ManagerCommand::StartAction { action, reply } => {
                let id = self.start_action(action).await;
                if let Some(reply) = reply {
                    let _ = reply.send(id);
                }
            }
            ManagerCommand::ActionFinished { id } => {
                self.on_action_finished(id).await;
            }
            ManagerCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            ManagerCommand::Shutdown { reply } => {
                self.shutdown().await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
        }
    }

    /// Process one recognition result.
    ///
    /// Speech-activity markers are handled before any text they carry for a
    /// start, and after it for an end.
    pub async fn on_transcript_event(&mut self, event: TranscriptEvent, channel: TranscriptChannel) {
        match event.speech_event {
            Some(SpeechEvent::Start) => {
                self.on_speech_start().await;
                if event.has_text() {
                    self.route_text(event, channel).await;
                }
            }
            Some(SpeechEvent::End) => {
                if event.has_text() {
                    self.route_text(event, channel).await;
                }
                self.on_speech_end().await;
            }
            None => self.route_text(event, channel).await,
        }
    }

    async fn route_text(&mut self, event: TranscriptEvent, channel: TranscriptChannel) {
        if channel == TranscriptChannel::Final || event.is_final {
            self.on_final_fragment(event).await;
        } else {
            self.on_interim(event).await;
        }
    }

    async fn on_interim(&mut self, event: TranscriptEvent) {
        let text = event.text.trim();
        if text.is_empty() {
            return;
        }

        self.state.is_speaking = true;
        self.state.latest_interim = Some((text.to_string(), event.confidence));

        if let Some(on_partial) = self.callbacks.on_partial.clone() {
            guarded("on_partial", on_partial(text.to_string())).await;
        }

        if self.state.phase == UtteranceState::Idle {
            self.set_phase(UtteranceState::Listening).await;
        }
    }

    async fn on_final_fragment(&mut self, event: TranscriptEvent) {
        let text = event.text.trim();
        if text.is_empty() {
            return;
        }

        if self.state.provisional {
            // A real final supersedes the adopted interim hypothesis
            self.state.fragments.clear();
            self.state.provisional = false;
        }
        self.state.fragments.push(text.to_string());
        self.state.confidence = event.confidence;
        self.state.latest_interim = None;

        let accumulated = self.state.accumulated_text();
        let decision = self
            .decider
            .decide(&accumulated, self.state.confidence, false);
        debug!(
            "Final fragment {:?}, accumulated {} chars",
            text,
            accumulated.len()
        );
        self.schedule_finalize(decision).await;
    }

    async fn on_speech_start(&mut self) {
        self.state.is_speaking = true;

        if self.state.cancel_timer() {
            debug!("Speech started, cancelled pending finalize");
        }

        if let Some(mut action) = self.state.in_flight.take() {
            match action.cancel(self.cancel_grace).await {
                CancelOutcome::AlreadyFinished => {}
                outcome => {
                    info!("Barge-in: action {} {:?}", action.id(), outcome);
                    self.fire_interrupt().await;
                }
            }
        }

        self.state.clear_utterance();
        self.set_phase(UtteranceState::Listening).await;
    }

    async fn on_speech_end(&mut self) {
        self.state.is_speaking = false;
        let medium = self.decider.config().medium_timeout();

        if !self.state.fragments.is_empty() {
            let accumulated = self.state.accumulated_text();
            let mut decision = self
                .decider
                .decide(&accumulated, self.state.confidence, true);
            if !decision.reason.is_incomplete() {
                decision = decision.capped(medium);
            }

            // Speech end may only bring finalization forward
            if let Some(timer) = self.state.pending_timer.as_ref()
                && !timer.is_cancelled()
                && decision.timeout >= timer.remaining()
            {
                debug!(
                    "Speech ended, keeping armed timer generation {} ({:?} left)",
                    timer.generation(),
                    timer.remaining()
                );
                return;
            }
            self.schedule_finalize(decision).await;
            return;
        }

        if let Some((text, confidence)) = self.state.latest_interim.take() {
            debug!("Speech ended without a final, adopting interim {:?}", text);
            self.state.fragments.push(text);
            self.state.confidence = confidence;
            self.state.provisional = true;

            let accumulated = self.state.accumulated_text();
            let decision = self
                .decider
                .decide(&accumulated, confidence, true)
                .capped(medium);
            self.schedule_finalize(decision).await;
        }
    }

    /// Arm a new finalize timer, replacing any armed one.
    async fn schedule_finalize(&mut self, decision: Decision) {
        self.state.cancel_timer();

        let generation = self.state.next_generation;
        self.state.next_generation += 1;

        let commands = self.commands.clone();
        let timer = FinalizeTimer::arm(generation, decision.timeout, move |generation| {
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(ManagerCommand::TimerFired { generation });
            }
        });

        debug!(
            "Finalize scheduled in {:?} ({}), generation {}",
            decision.timeout, decision.reason, generation
        );
        self.state.pending_timer = Some(timer);
        self.state.pending_reason = Some(decision.reason);
        self.set_phase(UtteranceState::PendingFinalize).await;
    }

    async fn on_timer_fired(&mut self, generation: u64) {
        let is_live = self
            .state
            .pending_timer
            .as_ref()
            .is_some_and(|timer| timer.generation() == generation && !timer.is_cancelled());
        if !is_live {
            debug!("Ignoring stale finalize timer generation {}", generation);
            return;
        }
        self.state.pending_timer = None;

        let text = self.state.accumulated_text();
        let confidence = self.state.confidence;
        let reason = self.state.pending_reason.take().unwrap_or(DecisionReason::Default);
        self.state.clear_utterance();

        if text.trim().is_empty() {
            self.set_phase(UtteranceState::Idle).await;
            return;
        }

        self.set_phase(UtteranceState::Processing).await;
        info!("Utterance finalized ({}): {:?}", reason, text);

        let action = match self.callbacks.on_final.clone() {
            Some(on_final) => {
                let utterance = FinalizedUtterance {
                    text,
                    confidence,
                    reason,
                };
                guarded("on_final", on_final(utterance)).await.flatten()
            }
            None => None,
        };

        match action {
            Some(action) => {
                self.start_action(action).await;
            }
            None => self.set_phase(UtteranceState::Idle).await,
        }
    }

    /// Make `action` the in-flight action, cancelling a still-running one.
    pub async fn start_action(&mut self, action: TurnAction) -> ActionId {
        if let Some(mut previous) = self.state.in_flight.take() {
            let outcome = previous.cancel(self.cancel_grace).await;
            debug!("Replaced in-flight action {} ({:?})", previous.id(), outcome);
        }

        let id = self.state.next_action_id;
        self.state.next_action_id += 1;

        let commands = self.commands.clone();
        let in_flight = InFlightAction::spawn(id, action, move |id| {
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(ManagerCommand::ActionFinished { id });
            }
        });
        self.state.in_flight = Some(in_flight);
        self.set_phase(UtteranceState::Processing).await;
        id
    }

    async fn on_action_finished(&mut self, id: ActionId) {
        let matches = self
            .state
            .in_flight
            .as_ref()
            .is_some_and(|action| action.id() == id);
        if !matches {
            return;
        }

        self.state.in_flight = None;
        if self.state.phase == UtteranceState::Processing {
            self.set_phase(UtteranceState::Idle).await;
        }
    }

    /// Cancel the running action, as requested by the client.
    ///
    /// Buffered text is kept. Returns whether anything was interrupted.
    pub async fn interrupt(&mut self) -> bool {
        let Some(mut action) = self.state.in_flight.take() else {
            return false;
        };

        match action.cancel(self.cancel_grace).await {
            CancelOutcome::AlreadyFinished => false,
            outcome => {
                info!("Interrupted action {} ({:?})", action.id(), outcome);
                self.fire_interrupt().await;
                if self.state.phase == UtteranceState::Processing {
                    self.set_phase(UtteranceState::Idle).await;
                }
                true
            }
        }
    }

    /// Cancel the timer and any in-flight action. Idempotent.
    pub async fn shutdown(&mut self) {
        if self.state.closed {
            return;
        }
        self.state.closed = true;
        self.state.cancel_timer();
        if let Some(mut action) = self.state.in_flight.take() {
            action.cancel(self.cancel_grace).await;
        }
        self.state.clear_utterance();
        self.state.phase = UtteranceState::Idle;
        debug!("Utterance manager shut down");
    }

    async fn fire_interrupt(&self) {
        if let Some(on_interrupt) = self.callbacks.on_interrupt.clone() {
            guarded("on_interrupt", on_interrupt()).await;
        }
    }

    async fn set_phase(&mut self, phase: UtteranceState) {
        if self.state.phase == phase {
            return;
        }
        debug!("Utterance state {} -> {}", self.state.phase, phase);
        self.state.phase = phase;

        if let Some(on_state) = self.callbacks.on_state.clone() {
            guarded("on_state", on_state(phase)).await;
        }
    }
}
