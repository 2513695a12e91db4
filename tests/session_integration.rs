//! End-to-end session behavior with an engine that calls back from its own
//! thread, the way real recognition SDKs do.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use utterance_gateway::boundary::{CheckerError, CompletenessChecker};
use utterance_gateway::{
    AsrState, BoundaryDecider, GatewayConfig, HandlerError, OutgoingMessage, RecognitionCallback,
    RecognitionConfig, RecognitionEngine, RecognitionError, SessionOrchestrator,
    SpeechSynthesizer, TTSResult, TranscriptEvent, Transport, TransportError, TurnContext,
    TurnHandler, TurnResponse,
};

#[derive(Default)]
struct EngineScript {
    callbacks: Mutex<Option<(RecognitionCallback, RecognitionCallback)>>,
    stops: AtomicUsize,
}

impl EngineScript {
    /// Deliver `steps` from a dedicated thread, sleeping `delay_ms` before each
    fn play(&self, steps: Vec<(u64, TranscriptEvent)>) -> thread::JoinHandle<()> {
        let (on_final, on_interim) = self
            .callbacks
            .lock()
            .clone()
            .expect("engine is not streaming");
        thread::spawn(move || {
            for (delay_ms, event) in steps {
                thread::sleep(Duration::from_millis(delay_ms));
                if event.is_final {
                    on_final(event);
                } else {
                    on_interim(event);
                }
            }
        })
    }
}

struct ScriptedEngine {
    script: Arc<EngineScript>,
    streaming: bool,
}

#[async_trait]
impl RecognitionEngine for ScriptedEngine {
    async fn initialize(&mut self, _config: RecognitionConfig) -> Result<(), RecognitionError> {
        Ok(())
    }

    async fn start_streaming(
        &mut self,
        on_final: RecognitionCallback,
        on_interim: RecognitionCallback,
        _emit_events: bool,
    ) -> Result<(), RecognitionError> {
        *self.script.callbacks.lock() = Some((on_final, on_interim));
        self.streaming = true;
        Ok(())
    }

    async fn stream_audio(&mut self, _audio: Vec<u8>) -> Result<(), RecognitionError> {
        Ok(())
    }

    async fn stop_streaming(&mut self) -> Result<(), RecognitionError> {
        self.streaming = false;
        self.script.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }
}

struct EchoHandler {
    delay: Duration,
}

#[async_trait]
impl TurnHandler for EchoHandler {
    async fn handle(
        &self,
        text: &str,
        _confidence: f32,
        _context: &TurnContext,
    ) -> Result<TurnResponse, HandlerError> {
        tokio::time::sleep(self.delay).await;
        Ok(TurnResponse::text(format!("You said: {text}")))
    }
}

struct ToneSynthesizer;

#[async_trait]
impl SpeechSynthesizer for ToneSynthesizer {
    async fn synthesize(&self, text: &str) -> TTSResult<Vec<u8>> {
        Ok(vec![0x7f; text.len()])
    }

    fn format(&self) -> &str {
        "linear16"
    }

    fn sample_rate(&self) -> u32 {
        16000
    }
}

#[derive(Default)]
struct Recorder {
    messages: Mutex<Vec<OutgoingMessage>>,
}

impl Recorder {
    fn count(&self, kind: &str) -> usize {
        self.messages.lock().iter().filter(|m| m.kind() == kind).count()
    }

    fn final_transcripts(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                OutgoingMessage::FinalTranscript { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn states(&self) -> Vec<AsrState> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                OutgoingMessage::AsrState { state } => Some(*state),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for Recorder {
    async fn send(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        self.messages.lock().push(message);
        Ok(())
    }
}

fn fast_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.endpointing.short_timeout_s = 0.15;
    config.endpointing.medium_timeout_s = 0.3;
    config.endpointing.long_timeout_s = 0.6;
    config.endpointing.incomplete_timeout_s = 0.5;
    config.endpointing.search_timeout_s = 0.35;
    config.session.cancel_grace_ms = 200;
    config
}

struct Harness {
    session: SessionOrchestrator,
    script: Arc<EngineScript>,
    transport: Arc<Recorder>,
}

async fn start_session(config: GatewayConfig, handler_delay: Duration) -> Harness {
    start_with(config, handler_delay, None).await
}

async fn start_with(
    config: GatewayConfig,
    handler_delay: Duration,
    decider: Option<BoundaryDecider>,
) -> Harness {
    let script = Arc::new(EngineScript::default());
    let transport = Arc::new(Recorder::default());
    let engine = Box::new(ScriptedEngine {
        script: script.clone(),
        streaming: false,
    });

    let mut session = SessionOrchestrator::new(
        config,
        engine,
        Arc::new(EchoHandler {
            delay: handler_delay,
        }),
        Arc::new(ToneSynthesizer),
        transport.clone(),
    );
    if let Some(decider) = decider {
        session = session.with_decider(decider);
    }
    session.start(RecognitionConfig::default()).await.unwrap();

    Harness {
        session,
        script,
        transport,
    }
}

async fn wait_for(what: &str, condition: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_question_finalizes_quickly_and_runs_a_turn() {
    let h = start_session(fast_config(), Duration::ZERO).await;

    h.script
        .play(vec![
            (0, TranscriptEvent::interim("what time", 0.7)),
            (5, TranscriptEvent::final_result("what time is it", 0.95)),
        ])
        .join()
        .unwrap();

    wait_for("turn completion", || h.transport.count("trace_completed") == 1).await;
    assert_eq!(h.transport.final_transcripts(), vec!["what time is it"]);
    assert_eq!(h.transport.count("partial_transcript"), 1);
    assert_eq!(h.transport.count("assistant_response"), 1);
    assert!(h.transport.count("tts_audio_chunk") >= 1);
    assert_eq!(h.transport.count("tts_complete"), 1);
    assert_eq!(
        h.transport.states(),
        vec![AsrState::Listening, AsrState::Thinking, AsrState::Listening]
    );

    // Nothing else finalizes later
    sleep_ms(800).await;
    assert_eq!(h.transport.count("final_transcript"), 1);

    h.session.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dangling_ending_waits_for_incomplete_timeout() {
    let h = start_session(fast_config(), Duration::ZERO).await;

    h.script
        .play(vec![(
            0,
            TranscriptEvent::final_result("find me the latest sales numbers for", 0.9),
        )])
        .join()
        .unwrap();

    sleep_ms(300).await;
    assert_eq!(h.transport.count("final_transcript"), 0);

    wait_for("final transcript", || h.transport.count("final_transcript") == 1).await;
    assert_eq!(
        h.transport.final_transcripts(),
        vec!["find me the latest sales numbers for"]
    );

    h.session.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fragments_coalesce_into_one_turn() {
    let h = start_session(fast_config(), Duration::ZERO).await;

    h.script
        .play(vec![
            (
                0,
                TranscriptEvent::final_result("I am looking for a hammer that will work", 0.95),
            ),
            (5, TranscriptEvent::final_result("for wood", 0.95)),
            (5, TranscriptEvent::final_result("roofing nails.", 0.95)),
        ])
        .join()
        .unwrap();

    wait_for("turn completion", || h.transport.count("trace_completed") == 1).await;
    sleep_ms(800).await;
    assert_eq!(
        h.transport.final_transcripts(),
        vec!["I am looking for a hammer that will work for wood roofing nails."]
    );
    assert_eq!(h.transport.count("assistant_response"), 1);

    h.session.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_speech_start_before_finalize_suppresses_turn() {
    let h = start_session(fast_config(), Duration::ZERO).await;

    h.script
        .play(vec![
            (0, TranscriptEvent::final_result("tell me a story", 0.5)),
            (50, TranscriptEvent::speech_start()),
        ])
        .join()
        .unwrap();

    sleep_ms(1000).await;
    assert_eq!(h.transport.count("final_transcript"), 0);
    assert_eq!(h.transport.states(), vec![AsrState::Listening]);

    h.session.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_barge_in_cancels_the_running_turn() {
    let h = start_session(fast_config(), Duration::from_secs(5)).await;

    h.script
        .play(vec![(0, TranscriptEvent::final_result("what time is it", 0.95))])
        .join()
        .unwrap();
    wait_for("thinking", || h.transport.states().contains(&AsrState::Thinking)).await;

    h.script
        .play(vec![(0, TranscriptEvent::speech_start())])
        .join()
        .unwrap();
    wait_for("canceled", || h.transport.states().contains(&AsrState::Canceled)).await;

    let snapshot = h.session.snapshot().await.unwrap();
    assert!(snapshot.in_flight_action.is_none());

    sleep_ms(500).await;
    assert_eq!(
        h.transport
            .states()
            .iter()
            .filter(|s| **s == AsrState::Canceled)
            .count(),
        1
    );
    assert_eq!(h.transport.count("assistant_response"), 0);

    h.session.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_interim_then_speech_end_finalizes() {
    let h = start_session(fast_config(), Duration::ZERO).await;

    h.script
        .play(vec![
            (0, TranscriptEvent::interim("hello", 0.6)),
            (5, TranscriptEvent::interim("hello there", 0.8)),
            (5, TranscriptEvent::speech_end()),
        ])
        .join()
        .unwrap();

    wait_for("final transcript", || h.transport.count("final_transcript") == 1).await;
    assert_eq!(h.transport.final_transcripts(), vec!["hello there"]);
    wait_for("turn completion", || h.transport.count("trace_completed") == 1).await;

    h.session.shutdown().await;
}

struct BrokenChecker;

impl CompletenessChecker for BrokenChecker {
    fn is_complete(
        &self,
        _text: &str,
    ) -> Result<utterance_gateway::CompletenessVerdict, CheckerError> {
        Err(CheckerError::Evaluation("model crashed".to_string()))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_checker_degrades_to_heuristics() {
    let config = fast_config();
    let decider = BoundaryDecider::with_checker_factory(
        &config.endpointing,
        Box::new(|| -> Result<Arc<dyn CompletenessChecker>, CheckerError> {
            Ok(Arc::new(BrokenChecker))
        }),
    );
    let h = start_with(config, Duration::ZERO, Some(decider)).await;

    h.script
        .play(vec![(0, TranscriptEvent::final_result("what time is it", 0.95))])
        .join()
        .unwrap();

    wait_for("turn completion", || h.transport.count("trace_completed") == 1).await;
    assert_eq!(h.transport.final_transcripts(), vec!["what time is it"]);

    h.session.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_repeated_teardown_is_harmless() {
    let h = start_session(fast_config(), Duration::from_secs(5)).await;

    h.script
        .play(vec![(0, TranscriptEvent::final_result("what time is it", 0.95))])
        .join()
        .unwrap();
    wait_for("thinking", || h.transport.states().contains(&AsrState::Thinking)).await;

    h.session.shutdown().await;
    h.session.shutdown().await;
    assert_eq!(h.script.stops.load(Ordering::SeqCst), 1);

    // The engine thread may still call back after teardown
    h.script
        .play(vec![(0, TranscriptEvent::final_result("anyone there?", 0.95))])
        .join()
        .unwrap();
    sleep_ms(500).await;
    assert_eq!(h.transport.count("final_transcript"), 1);
    assert_eq!(h.transport.count("assistant_response"), 0);
}
