//! Completeness checking capability consulted by the boundary decider

use std::sync::Arc;
use std::time::Instant;

use super::lexicon::{DanglingLexicon, EndingCategory};
use super::shape;

/// Verdict returned by a completeness checker
#[derive(Debug, Clone, PartialEq)]
pub struct CompletenessVerdict {
    pub is_complete: bool,
    /// Short machine-readable reason, e.g. `ends_with_preposition`
    pub reason: String,
    pub confidence: f32,
    pub processing_time_ms: f64,
}

impl CompletenessVerdict {
    pub fn complete(reason: impl Into<String>, confidence: f32) -> Self {
        Self {
            is_complete: true,
            reason: reason.into(),
            confidence,
            processing_time_ms: 0.0,
        }
    }

    pub fn incomplete(reason: impl Into<String>, confidence: f32) -> Self {
        Self {
            is_complete: false,
            reason: reason.into(),
            confidence,
            processing_time_ms: 0.0,
        }
    }

    pub fn with_processing_time_ms(mut self, processing_time_ms: f64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }
}

/// Error types for completeness checking
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckerError {
    #[error("Checker construction failed: {0}")]
    Construction(String),
    #[error("Checker evaluation failed: {0}")]
    Evaluation(String),
    #[error("Checker panicked: {0}")]
    Panicked(String),
}

/// Judges whether a piece of text reads as a complete utterance.
///
/// Implementations are called synchronously from the decision path and must
/// be quick.
pub trait CompletenessChecker: Send + Sync {
    fn is_complete(&self, text: &str) -> Result<CompletenessVerdict, CheckerError>;

    fn name(&self) -> &'static str {
        "checker"
    }
}

/// Fallible constructor for a completeness checker.
///
/// Only invoked when the semantic layer is enabled.
pub type CheckerFactory =
    Box<dyn FnOnce() -> Result<Arc<dyn CompletenessChecker>, CheckerError> + Send>;

/// Rule-based checker built on the dangling-ending lexicon and shape heuristics
#[derive(Debug, Clone, Default)]
pub struct LexicalCompletenessChecker {
    lexicon: DanglingLexicon,
}

impl LexicalCompletenessChecker {
    pub fn new(lexicon: DanglingLexicon) -> Self {
        Self { lexicon }
    }
}

impl CompletenessChecker for LexicalCompletenessChecker {
    fn is_complete(&self, text: &str) -> Result<CompletenessVerdict, CheckerError> {
        let started = Instant::now();

        let verdict = match self.lexicon.dangling_ending(text) {
            Some(category) => {
                let reason = match category {
                    EndingCategory::Determiner => "ends_with_determiner",
                    EndingCategory::Preposition => "ends_with_preposition",
                    EndingCategory::Conjunction => "ends_with_conjunction",
                    EndingCategory::RelativePronoun => "ends_with_relative_pronoun",
                    EndingCategory::Auxiliary => "ends_with_auxiliary",
                    EndingCategory::Phrase | EndingCategory::Custom => "ends_with_dangling_phrase",
                };
                CompletenessVerdict::incomplete(reason, 0.8)
            }
            None if text.trim().is_empty() => CompletenessVerdict::incomplete("empty", 1.0),
            None if shape::is_command(text) => CompletenessVerdict::complete("complete_command", 0.8),
            None => CompletenessVerdict::complete("syntactically_complete", 0.6),
        };

        Ok(verdict.with_processing_time_ms(started.elapsed().as_secs_f64() * 1000.0))
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}
