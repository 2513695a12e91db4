use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::utils::panic_message;

/// Identifier of an in-flight action within one session
pub type ActionId = u64;

/// Downstream work started for a finalized utterance.
///
/// The future is dropped at its next await point when the action is
/// cancelled.
pub struct TurnAction(Pin<Box<dyn Future<Output = ()> + Send + 'static>>);

impl TurnAction {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(Box::pin(future))
    }
}

impl fmt::Debug for TurnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TurnAction")
    }
}

/// How a cancellation request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The action had already finished on its own
    AlreadyFinished,
    /// The action stopped within the grace period
    Cancelled,
    /// The action ignored cancellation and was aborted
    Aborted,
}

/// A running [`TurnAction`]
#[derive(Debug)]
pub struct InFlightAction {
    id: ActionId,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl InFlightAction {
    /// Spawn `action`; `on_exit` runs once when it completes, panics or is
    /// cancelled.
    pub(crate) fn spawn<F>(id: ActionId, action: TurnAction, on_exit: F) -> Self
    where
        F: FnOnce(ActionId) + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    debug!("Action {} cancelled", id);
                }
                outcome = AssertUnwindSafe(action.0).catch_unwind() => match outcome {
                    Ok(()) => debug!("Action {} completed", id),
                    Err(panic) => error!("Action {} panicked: {}", id, panic_message(panic.as_ref())),
                }
            }
            on_exit(id);
        });

        Self { id, token, handle }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the action and wait up to `grace` for it to stop.
    pub async fn cancel(&mut self, grace: Duration) -> CancelOutcome {
        if self.handle.is_finished() {
            return CancelOutcome::AlreadyFinished;
        }

        self.token.cancel();
        match tokio::time::timeout(grace, &mut self.handle).await {
            Ok(_) => CancelOutcome::Cancelled,
            Err(_) => {
                warn!(
                    "Action {} did not stop within {:?}, aborting",
                    self.id, grace
                );
                self.handle.abort();
                CancelOutcome::Aborted
            }
        }
    }
}

impl Drop for InFlightAction {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
