//! Stub collaborators shared by unit tests

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::stt::{RecognitionCallback, RecognitionConfig, RecognitionEngine, RecognitionError};
use super::transcript::TranscriptEvent;
use super::transport::{OutgoingMessage, Transport, TransportError};
use super::tts::{SpeechSynthesizer, TTSError, TTSResult};

/// Transport that keeps every message it is given
#[derive(Default)]
pub struct RecordingTransport {
    messages: Mutex<Vec<OutgoingMessage>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<OutgoingMessage> {
        self.messages.lock().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.messages.lock().iter().map(|m| m.kind()).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.messages.lock().iter().filter(|m| m.kind() == kind).count()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        self.messages.lock().push(message);
        Ok(())
    }
}

/// Synthesizer producing a few bytes per character of input
#[derive(Default)]
pub struct FakeSynthesizer {
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
    silent: HashSet<String>,
    panicking: HashSet<String>,
}

impl FakeSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail for `fail_on` and return empty audio for `silent_on`
    pub fn with_faults(fail_on: &[&str], silent_on: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failing: fail_on.iter().map(|s| s.to_string()).collect(),
            silent: silent_on.iter().map(|s| s.to_string()).collect(),
            panicking: HashSet::new(),
        })
    }

    /// Panic while synthesizing any of `panic_on`
    pub fn panicking_on(panic_on: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            panicking: panic_on.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> TTSResult<Vec<u8>> {
        self.calls.lock().push(text.to_string());
        if self.failing.contains(text) {
            return Err(TTSError::AudioGenerationFailed(format!("cannot say {text:?}")));
        }
        if self.silent.contains(text) {
            return Ok(Vec::new());
        }
        if self.panicking.contains(text) {
            panic!("synthesizer crashed on {text:?}");
        }
        Ok(vec![1u8; text.len() * 2])
    }

    fn format(&self) -> &str {
        "linear16"
    }

    fn sample_rate(&self) -> u32 {
        24000
    }
}

/// Handles a test keeps on a [`StubEngine`] after handing it to a session
#[derive(Default)]
pub struct EngineProbe {
    callbacks: Mutex<Option<(RecognitionCallback, RecognitionCallback)>>,
    pub audio: Mutex<Vec<Vec<u8>>>,
    pub initialized: Mutex<Option<RecognitionConfig>>,
    pub emit_events: Mutex<Option<bool>>,
    pub stops: Mutex<usize>,
}

impl EngineProbe {
    /// Deliver a result the way the engine would, on the final or interim callback
    pub fn emit(&self, event: TranscriptEvent) {
        let callbacks = self.callbacks.lock().clone();
        let Some((on_final, on_interim)) = callbacks else {
            panic!("engine is not streaming");
        };
        if event.is_final {
            on_final(event);
        } else {
            on_interim(event);
        }
    }

    pub fn stops(&self) -> usize {
        *self.stops.lock()
    }
}

/// Recognition engine driven by the test through its [`EngineProbe`]
pub struct StubEngine {
    probe: Arc<EngineProbe>,
    streaming: bool,
    fail_start: bool,
}

impl StubEngine {
    pub fn new() -> (Box<Self>, Arc<EngineProbe>) {
        let probe = Arc::new(EngineProbe::default());
        let engine = Box::new(Self {
            probe: probe.clone(),
            streaming: false,
            fail_start: false,
        });
        (engine, probe)
    }

    pub fn failing() -> Box<Self> {
        let (mut engine, _) = Self::new();
        engine.fail_start = true;
        engine
    }
}

#[async_trait]
impl RecognitionEngine for StubEngine {
    async fn initialize(&mut self, config: RecognitionConfig) -> Result<(), RecognitionError> {
        *self.probe.initialized.lock() = Some(config);
        Ok(())
    }

    async fn start_streaming(
        &mut self,
        on_final: RecognitionCallback,
        on_interim: RecognitionCallback,
        emit_events: bool,
    ) -> Result<(), RecognitionError> {
        if self.fail_start {
            return Err(RecognitionError::ConnectionFailed("refused".to_string()));
        }
        *self.probe.callbacks.lock() = Some((on_final, on_interim));
        *self.probe.emit_events.lock() = Some(emit_events);
        self.streaming = true;
        Ok(())
    }

    async fn stream_audio(&mut self, audio: Vec<u8>) -> Result<(), RecognitionError> {
        if !self.streaming {
            return Err(RecognitionError::NotStreaming("stream stopped".to_string()));
        }
        self.probe.audio.lock().push(audio);
        Ok(())
    }

    async fn stop_streaming(&mut self) -> Result<(), RecognitionError> {
        self.streaming = false;
        *self.probe.stops.lock() += 1;
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }
}
