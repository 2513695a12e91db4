//! Transcript events produced by recognition engines.

use std::time::SystemTime;

/// Speech-activity marker attached to a recognition callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    /// The engine detected the user starting to speak.
    Start,
    /// The engine detected the end of speech activity.
    End,
}

/// Logical channel a transcript arrived on.
///
/// Engines usually deliver final and interim hypotheses through separate
/// callbacks. An event is treated as final when it arrives on the final
/// channel or carries `is_final`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptChannel {
    Interim,
    Final,
}

impl TranscriptChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptChannel::Interim => "interim",
            TranscriptChannel::Final => "final",
        }
    }
}

/// One recognition callback, captured as an immutable value.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEvent {
    /// Recognized text (may be empty for pure speech-activity markers)
    pub text: String,
    /// Whether the engine considers this hypothesis final
    pub is_final: bool,
    /// Recognition confidence (0.0 to 1.0)
    pub confidence: f32,
    /// Hypothesis stability (0.0 to 1.0)
    pub stability: f32,
    /// When the callback was received
    pub received_at: SystemTime,
    /// Optional speech-activity marker
    pub speech_event: Option<SpeechEvent>,
}

impl TranscriptEvent {
    /// Creates a new event stamped with the current time.
    pub fn new(text: impl Into<String>, is_final: bool, confidence: f32, stability: f32) -> Self {
        Self {
            text: text.into(),
            is_final,
            confidence: clamp_unit(confidence),
            stability: clamp_unit(stability),
            received_at: SystemTime::now(),
            speech_event: None,
        }
    }

    /// Final hypothesis with the given confidence.
    pub fn final_result(text: impl Into<String>, confidence: f32) -> Self {
        Self::new(text, true, confidence, 1.0)
    }

    /// Interim hypothesis with the given confidence.
    pub fn interim(text: impl Into<String>, confidence: f32) -> Self {
        Self::new(text, false, confidence, 0.0)
    }

    /// Text-less speech-start marker.
    pub fn speech_start() -> Self {
        Self::new("", false, 0.0, 0.0).with_speech_event(SpeechEvent::Start)
    }

    /// Text-less speech-end marker.
    pub fn speech_end() -> Self {
        Self::new("", false, 0.0, 0.0).with_speech_event(SpeechEvent::End)
    }

    pub fn with_speech_event(mut self, speech_event: SpeechEvent) -> Self {
        self.speech_event = Some(speech_event);
        self
    }

    pub fn with_received_at(mut self, received_at: SystemTime) -> Self {
        self.received_at = received_at;
        self
    }

    /// Whether the event carries any recognized text.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn is_speech_start(&self) -> bool {
        self.speech_event == Some(SpeechEvent::Start)
    }

    pub fn is_speech_end(&self) -> bool {
        self.speech_event == Some(SpeechEvent::End)
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let event = TranscriptEvent::new("hi", true, 1.7, -0.2);
        assert_eq!(event.confidence, 1.0);
        assert_eq!(event.stability, 0.0);

        let event = TranscriptEvent::new("hi", true, f32::NAN, 0.5);
        assert_eq!(event.confidence, 0.0);
    }

    #[test]
    fn test_markers_have_no_text() {
        let start = TranscriptEvent::speech_start();
        assert!(start.is_speech_start());
        assert!(!start.has_text());

        let end = TranscriptEvent::speech_end();
        assert!(end.is_speech_end());
        assert!(!end.is_final);
    }

    #[test]
    fn test_whitespace_only_text_counts_as_empty() {
        assert!(!TranscriptEvent::final_result("   ", 0.9).has_text());
        assert!(TranscriptEvent::final_result(" ok ", 0.9).has_text());
    }
}
