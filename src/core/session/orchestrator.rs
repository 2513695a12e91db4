//! Per-session wiring of recognition, endpointing, turns and synthesis

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::core::boundary::BoundaryDecider;
use crate::core::stt::{RecognitionConfig, RecognitionEngine};
use crate::core::trace::{NoopTraceSink, TraceSink};
use crate::core::transcript::TranscriptChannel;
use crate::core::transport::{AsrState, OutgoingMessage, Transport};
use crate::core::tts::{ResponseReader, SpeechSynthesizer};
use crate::core::turn::TurnHandler;
use crate::core::utterance::{ManagerSnapshot, UtteranceCallbacks, UtteranceScheduler};

use super::bridge::CallbackBridge;
use super::errors::{DispatchError, SessionError, SessionResult};
use super::turn_task::TurnRunner;

struct Running {
    scheduler: UtteranceScheduler,
    bridge: Arc<CallbackBridge>,
}

/// One spoken-dialogue session.
///
/// Recognition results flow through a [`CallbackBridge`] into the session's
/// [`UtteranceScheduler`]. Each finalized utterance becomes a cancellable
/// turn: the handler's answer is sent as `assistant_response` and read aloud
/// in chunks. Speech from the user while a turn runs cancels it.
pub struct SessionOrchestrator {
    session_id: String,
    config: GatewayConfig,
    engine: Arc<RwLock<Box<dyn RecognitionEngine>>>,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn TurnHandler>,
    reader: Arc<ResponseReader>,
    sink: Arc<dyn TraceSink>,
    decider: Mutex<Option<BoundaryDecider>>,
    running: Mutex<Option<Running>>,
    started: AtomicBool,
    closed: AtomicBool,
}

impl SessionOrchestrator {
    /// Create a session with the lexical completeness checker as the
    /// semantic layer and no trace sink.
    pub fn new(
        config: GatewayConfig,
        engine: Box<dyn RecognitionEngine>,
        handler: Arc<dyn TurnHandler>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let decider = BoundaryDecider::new(&config.endpointing);
        let reader = Arc::new(ResponseReader::new(
            synthesizer,
            transport.clone(),
            &config.synthesis,
        ));

        Self {
            session_id: Uuid::new_v4().to_string(),
            config,
            engine: Arc::new(RwLock::new(engine)),
            transport,
            handler,
            reader,
            sink: Arc::new(NoopTraceSink),
            decider: Mutex::new(Some(decider)),
            running: Mutex::new(None),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the boundary decider, e.g. to plug in another checker.
    pub fn with_decider(self, decider: BoundaryDecider) -> Self {
        *self.decider.lock() = Some(decider);
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Reader used for synthesis; lets callers toggle speech output.
    pub fn reader(&self) -> &ResponseReader {
        &self.reader
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Initialize the engine and start listening.
    pub async fn start(&self, recognition: RecognitionConfig) -> SessionResult<()> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SessionError::AlreadyStarted);
        }

        let decider = self
            .decider
            .lock()
            .take()
            .ok_or(SessionError::AlreadyStarted)?;

        let turns = Arc::new(TurnRunner {
            session_id: self.session_id.clone(),
            handler: self.handler.clone(),
            reader: self.reader.clone(),
            transport: self.transport.clone(),
            sink: self.sink.clone(),
        });
        let scheduler = UtteranceScheduler::spawn(
            decider,
            session_callbacks(&turns),
            self.config.session.cancel_grace(),
        );
        let bridge = Arc::new(self.bridge_for(&scheduler));

        let started = self.start_engine(recognition, &bridge).await;
        if let Err(e) = started {
            warn!("Failed to start recognition for session {}: {}", self.session_id, e);
            bridge.close().await;
            scheduler.shutdown().await;
            self.closed.store(true, Ordering::Release);
            return Err(e);
        }

        *self.running.lock() = Some(Running { scheduler, bridge });
        turns.send_state(AsrState::Listening).await;
        info!("Session {} started", self.session_id);
        Ok(())
    }

    fn bridge_for(&self, scheduler: &UtteranceScheduler) -> CallbackBridge {
        let bridge = CallbackBridge::new();

        let finals = scheduler.clone();
        bridge.register_sync(TranscriptChannel::Final, move |event| {
            finals.submit_transcript(event, TranscriptChannel::Final)
        });

        let interims = scheduler.clone();
        let transport = self.transport.clone();
        bridge.register_async(TranscriptChannel::Interim, move |event| {
            let scheduler = interims.clone();
            let transport = transport.clone();
            async move {
                let partial = event.has_text().then(|| OutgoingMessage::PartialTranscript {
                    text: event.text.trim().to_string(),
                });
                scheduler.submit_transcript(event, TranscriptChannel::Interim)?;
                if let Some(partial) = partial
                    && let Err(e) = transport.send(partial).await
                {
                    warn!("Failed to send partial_transcript message: {}", e);
                }
                Ok::<(), DispatchError>(())
            }
        });

        bridge
    }

    async fn start_engine(
        &self,
        recognition: RecognitionConfig,
        bridge: &CallbackBridge,
    ) -> SessionResult<()> {
        let mut engine = self.engine.write().await;
        engine.initialize(recognition).await?;
        engine
            .start_streaming(
                bridge.callback(TranscriptChannel::Final),
                bridge.callback(TranscriptChannel::Interim),
                self.config.session.emit_speech_events,
            )
            .await?;
        debug!("Recognition engine {} streaming", engine.provider_info());
        Ok(())
    }

    fn scheduler(&self) -> SessionResult<UtteranceScheduler> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        self.running
            .lock()
            .as_ref()
            .map(|running| running.scheduler.clone())
            .ok_or(SessionError::NotStarted)
    }

    /// Forward caller audio to the recognition engine.
    pub async fn stream_audio(&self, audio: Vec<u8>) -> SessionResult<()> {
        self.scheduler()?;
        self.engine.write().await.stream_audio(audio).await?;
        Ok(())
    }

    /// Cancel the running turn, as asked by the client.
    ///
    /// Returns whether a turn was interrupted.
    pub async fn interrupt(&self) -> SessionResult<bool> {
        let scheduler = self.scheduler()?;
        Ok(scheduler.interrupt().await?)
    }

    pub async fn snapshot(&self) -> SessionResult<ManagerSnapshot> {
        let scheduler = self.scheduler()?;
        Ok(scheduler.snapshot().await?)
    }

    /// Tear the session down. Safe to call any number of times.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Session {} already shut down", self.session_id);
            return;
        }

        let running = self.running.lock().take();
        let Some(Running { scheduler, bridge }) = running else {
            debug!("Session {} closed before starting", self.session_id);
            return;
        };

        bridge.close().await;
        scheduler.shutdown().await;
        if let Err(e) = self.engine.write().await.stop_streaming().await {
            warn!("Failed to stop recognition for session {}: {}", self.session_id, e);
        }
        info!("Session {} shut down", self.session_id);
    }
}

fn session_callbacks(turns: &Arc<TurnRunner>) -> UtteranceCallbacks {
    let finals = turns.clone();
    let interrupts = turns.clone();

    UtteranceCallbacks::new()
        .on_final(move |utterance| {
            let turns = finals.clone();
            async move { Some(turns.begin(utterance).await) }
        })
        .on_interrupt(move || {
            let turns = interrupts.clone();
            async move {
                turns.send_state(AsrState::Canceled).await;
            }
        })
}
