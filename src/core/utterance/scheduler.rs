//! Queue-driven scheduler for one session's [`UtteranceManager`]
//!
//! All session state is owned by a single worker task. Every caller,
//! including recognition threads, timers and finished actions, talks to it by
//! queueing a [`ManagerCommand`], so commands are processed strictly in
//! arrival order.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::boundary::BoundaryDecider;
use crate::core::session::DispatchError;
use crate::core::transcript::{TranscriptChannel, TranscriptEvent};

use super::action::{ActionId, TurnAction};
use super::callbacks::UtteranceCallbacks;
use super::manager::UtteranceManager;
use super::state::UtteranceState;

/// Work items processed by the scheduler
#[derive(Debug)]
pub enum ManagerCommand {
    /// A recognition result
    Transcript {
        event: TranscriptEvent,
        channel: TranscriptChannel,
    },
    /// A finalize timer elapsed
    TimerFired { generation: u64 },
    /// Cancel the in-flight action
    Interrupt {
        reply: Option<oneshot::Sender<bool>>,
    },
    /// Install a new in-flight action
    StartAction {
        action: TurnAction,
        reply: Option<oneshot::Sender<ActionId>>,
    },
    /// An in-flight action exited
    ActionFinished { id: ActionId },
    /// Report the current state
    Snapshot {
        reply: oneshot::Sender<ManagerSnapshot>,
    },
    /// Stop the worker
    Shutdown {
        /// Optional acknowledgement channel to signal completion
        reply: Option<oneshot::Sender<()>>,
    },
}

impl ManagerCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transcript { .. } => "transcript",
            Self::TimerFired { .. } => "timer_fired",
            Self::Interrupt { .. } => "interrupt",
            Self::StartAction { .. } => "start_action",
            Self::ActionFinished { .. } => "action_finished",
            Self::Snapshot { .. } => "snapshot",
            Self::Shutdown { .. } => "shutdown",
        }
    }
}

/// Point-in-time view of a manager
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerSnapshot {
    pub state: UtteranceState,
    pub accumulated_text: String,
    /// Generation of the armed finalize timer
    pub pending_generation: Option<u64>,
    pub pending_timeout: Option<Duration>,
    pub pending_reason: Option<String>,
    pub in_flight_action: Option<ActionId>,
    pub is_speaking: bool,
}

impl ManagerSnapshot {
    pub fn has_pending_timer(&self) -> bool {
        self.pending_generation.is_some()
    }
}

/// Handle to a session's scheduler task. Clones share the same worker.
#[derive(Clone)]
pub struct UtteranceScheduler {
    tx: mpsc::UnboundedSender<ManagerCommand>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl UtteranceScheduler {
    /// Spawn the worker task on the current runtime.
    pub fn spawn(
        decider: BoundaryDecider,
        callbacks: UtteranceCallbacks,
        cancel_grace: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = UtteranceManager::new(decider, callbacks, cancel_grace, tx.downgrade());
        let worker = tokio::spawn(run_worker(manager, rx));

        Self {
            tx,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Queue a command. Safe to call from any thread, runtime or not.
    pub fn send(&self, command: ManagerCommand) -> Result<(), DispatchError> {
        self.tx.send(command).map_err(|e| {
            debug!("Scheduler closed, dropped {} command", e.0.kind());
            DispatchError::SchedulerClosed
        })
    }

    pub fn submit_transcript(
        &self,
        event: TranscriptEvent,
        channel: TranscriptChannel,
    ) -> Result<(), DispatchError> {
        self.send(ManagerCommand::Transcript { event, channel })
    }

    /// Cancel the in-flight action. Returns whether one was running.
    pub async fn interrupt(&self) -> Result<bool, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(ManagerCommand::Interrupt { reply: Some(reply) })?;
        rx.await.map_err(|_| DispatchError::SchedulerClosed)
    }

    pub async fn start_action(&self, action: TurnAction) -> Result<ActionId, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(ManagerCommand::StartAction {
            action,
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| DispatchError::SchedulerClosed)
    }

    /// Must not be awaited from inside a manager callback.
    pub async fn snapshot(&self) -> Result<ManagerSnapshot, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(ManagerCommand::Snapshot { reply })?;
        rx.await.map_err(|_| DispatchError::SchedulerClosed)
    }

    /// Stop the manager and wait for the worker to exit. Idempotent.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self
            .send(ManagerCommand::Shutdown { reply: Some(reply) })
            .is_ok()
        {
            let _ = rx.await;
        }

        let worker = self.worker.lock().take();
        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            warn!("Utterance scheduler worker failed: {}", e);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn run_worker(mut manager: UtteranceManager, mut rx: mpsc::UnboundedReceiver<ManagerCommand>) {
    debug!("Utterance scheduler started");

    while let Some(command) = rx.recv().await {
        let stop = matches!(command, ManagerCommand::Shutdown { .. });
        manager.handle(command).await;
        if stop {
            break;
        }
    }

    // Every handle dropped without a shutdown still tears the manager down
    manager.shutdown().await;
    rx.close();
    debug!("Utterance scheduler stopped");
}
