//! Hands recognition callbacks from engine threads to the session runtime
//!
//! Engines may call their result callbacks from threads they own, with no
//! tokio context. The callbacks handed out here only enqueue the event; a
//! pump task on the session runtime delivers it to the target registered for
//! its channel, in arrival order.

use std::collections::HashMap;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::core::stt::RecognitionCallback;
use crate::core::transcript::{TranscriptChannel, TranscriptEvent};
use crate::utils::panic_message;

use super::errors::DispatchError;

/// How a bridge target is invoked, fixed when it is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Sync,
    Async,
}

/// Target called inline on the pump task
pub type SyncTarget = Arc<dyn Fn(TranscriptEvent) -> Result<(), DispatchError> + Send + Sync>;

/// Target whose future the pump awaits before delivering the next event
pub type AsyncTarget = Arc<
    dyn Fn(TranscriptEvent) -> Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send>>
        + Send
        + Sync,
>;

#[derive(Clone)]
enum Target {
    Sync(SyncTarget),
    Async(AsyncTarget),
}

impl Target {
    fn kind(&self) -> HandlerKind {
        match self {
            Target::Sync(_) => HandlerKind::Sync,
            Target::Async(_) => HandlerKind::Async,
        }
    }
}

type Targets = Arc<RwLock<HashMap<TranscriptChannel, Target>>>;

pub struct CallbackBridge {
    tx: mpsc::UnboundedSender<(TranscriptChannel, TranscriptEvent)>,
    targets: Targets,
    closed: Arc<AtomicBool>,
    token: CancellationToken,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl CallbackBridge {
    /// Create a bridge whose pump runs on the current runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let targets: Targets = Arc::new(RwLock::new(HashMap::new()));
        let token = CancellationToken::new();
        let pump = tokio::spawn(pump(rx, targets.clone(), token.clone()));

        Self {
            tx,
            targets,
            closed: Arc::new(AtomicBool::new(false)),
            token,
            pump: Mutex::new(Some(pump)),
        }
    }

    pub fn register_sync<F>(&self, channel: TranscriptChannel, target: F)
    where
        F: Fn(TranscriptEvent) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.register(channel, Target::Sync(Arc::new(target)));
    }

    pub fn register_async<F, Fut>(&self, channel: TranscriptChannel, target: F)
    where
        F: Fn(TranscriptEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DispatchError>> + Send + 'static,
    {
        let target: AsyncTarget = Arc::new(move |event| {
            Box::pin(target(event))
                as Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send>>
        });
        self.register(channel, Target::Async(target));
    }

    fn register(&self, channel: TranscriptChannel, target: Target) {
        debug!(
            "Registered {:?} target for the {} channel",
            target.kind(),
            channel.as_str()
        );
        self.targets.write().insert(channel, target);
    }

    pub fn kind(&self, channel: TranscriptChannel) -> Option<HandlerKind> {
        self.targets.read().get(&channel).map(Target::kind)
    }

    /// A callback for an engine, feeding `channel`.
    ///
    /// It never blocks and can be called from any thread.
    pub fn callback(&self, channel: TranscriptChannel) -> RecognitionCallback {
        let tx = self.tx.clone();
        let closed = self.closed.clone();
        Arc::new(move |event: TranscriptEvent| {
            if closed.load(Ordering::Acquire) {
                warn!(
                    "Dropping {} transcript received after teardown",
                    channel.as_str()
                );
                return;
            }
            if tx.send((channel, event)).is_err() {
                warn!("{}", DispatchError::BridgeClosed);
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop delivering events and wait for the pump to exit. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.token.cancel();

        let pump = self.pump.lock().take();
        if let Some(pump) = pump
            && let Err(e) = pump.await
        {
            error!("Callback bridge pump failed: {}", e);
        }
        debug!("Callback bridge closed");
    }
}

impl Default for CallbackBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CallbackBridge {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.token.cancel();
    }
}

async fn pump(
    mut rx: mpsc::UnboundedReceiver<(TranscriptChannel, TranscriptEvent)>,
    targets: Targets,
    token: CancellationToken,
) {
    loop {
        let (channel, event) = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            received = rx.recv() => match received {
                Some(item) => item,
                None => break,
            },
        };

        let target = targets.read().get(&channel).cloned();
        if let Err(e) = deliver(channel, target, event).await {
            warn!("Transcript dispatch failed: {}", e);
        }
    }
    debug!("Callback bridge pump stopped");
}

async fn deliver(
    channel: TranscriptChannel,
    target: Option<Target>,
    event: TranscriptEvent,
) -> Result<(), DispatchError> {
    match target {
        None => Err(DispatchError::NoTarget(channel.as_str().to_string())),
        Some(Target::Sync(target)) => match catch_unwind(AssertUnwindSafe(|| target(event))) {
            Ok(result) => result,
            Err(payload) => Err(DispatchError::TargetPanicked(panic_message(payload.as_ref()))),
        },
        Some(Target::Async(target)) => {
            let future = catch_unwind(AssertUnwindSafe(|| target(event))).map_err(|payload| {
                DispatchError::TargetPanicked(panic_message(payload.as_ref()))
            })?;
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(DispatchError::TargetPanicked(panic_message(payload.as_ref()))),
            }
        }
    }
}
