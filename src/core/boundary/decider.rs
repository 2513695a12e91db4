use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::EndpointingConfig;
use crate::utils::panic_message;

use super::checker::{
    CheckerError, CheckerFactory, CompletenessChecker, CompletenessVerdict,
    LexicalCompletenessChecker,
};
use super::lexicon::{DanglingLexicon, ends_with_terminal_punctuation};
use super::shape;

/// Why the decider chose a particular wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionReason {
    Default,
    IncompletePhrase,
    HighConfQuestion,
    CompleteCommand,
    SpeechEndGoodConf,
    /// The completeness checker judged the text incomplete
    Semantic(String),
}

impl DecisionReason {
    /// Whether the text was judged unfinished, lexically or semantically
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::IncompletePhrase | Self::Semantic(_))
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::IncompletePhrase => f.write_str("incomplete_phrase"),
            Self::HighConfQuestion => f.write_str("high_conf_question"),
            Self::CompleteCommand => f.write_str("complete_command"),
            Self::SpeechEndGoodConf => f.write_str("speech_end_good_conf"),
            Self::Semantic(reason) => write!(f, "semantic_{reason}"),
        }
    }
}

/// How long to wait before finalizing, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub timeout: Duration,
    pub reason: DecisionReason,
}

impl Decision {
    fn new(timeout: Duration, reason: DecisionReason) -> Self {
        Self { timeout, reason }
    }

    /// Clamp the wait to at most `cap`, keeping the reason.
    pub fn capped(self, cap: Duration) -> Self {
        Self {
            timeout: self.timeout.min(cap),
            reason: self.reason,
        }
    }
}

/// Endpointing policy: maps text, confidence and speech state to a wait.
///
/// Evaluation order, first match wins:
/// 1. dangling ending → `incomplete_phrase`
/// 2. completeness checker says incomplete → `semantic_<reason>`, never
///    shorter than the heuristic wait
/// 3. high confidence question / command / speech end → short wait
/// 4. good confidence → medium wait (search wait for search requests)
/// 5. otherwise → long wait
pub struct BoundaryDecider {
    config: EndpointingConfig,
    lexicon: DanglingLexicon,
    checker: Option<Arc<dyn CompletenessChecker>>,
}

impl fmt::Debug for BoundaryDecider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryDecider")
            .field("config", &self.config)
            .field("lexicon_entries", &self.lexicon.len())
            .field("checker", &self.checker.as_ref().map(|c| c.name()))
            .finish()
    }
}

impl BoundaryDecider {
    /// Build a decider using the lexical checker as the semantic layer.
    pub fn new(config: &EndpointingConfig) -> Self {
        let lexicon = Self::lexicon_for(config);
        let checker_lexicon = lexicon.clone();
        Self::build(
            config,
            lexicon,
            Box::new(move || -> Result<Arc<dyn CompletenessChecker>, CheckerError> {
                Ok(Arc::new(LexicalCompletenessChecker::new(checker_lexicon)))
            }),
        )
    }

    /// Build a decider with no semantic layer at all.
    pub fn heuristic(config: &EndpointingConfig) -> Self {
        Self {
            config: config.clone(),
            lexicon: Self::lexicon_for(config),
            checker: None,
        }
    }

    /// Build a decider whose semantic layer comes from `factory`.
    ///
    /// The factory is not called when the semantic layer is disabled. A
    /// factory that fails or panics leaves the decider heuristic-only.
    pub fn with_checker_factory(config: &EndpointingConfig, factory: CheckerFactory) -> Self {
        Self::build(config, Self::lexicon_for(config), factory)
    }

    fn build(config: &EndpointingConfig, lexicon: DanglingLexicon, factory: CheckerFactory) -> Self {
        let checker = if config.semantic_enabled {
            match catch_unwind(AssertUnwindSafe(factory)) {
                Ok(Ok(checker)) => {
                    debug!("Completeness checker '{}' enabled", checker.name());
                    Some(checker)
                }
                Ok(Err(e)) => {
                    warn!("Completeness checker unavailable, using heuristics only: {}", e);
                    None
                }
                Err(payload) => {
                    warn!(
                        "Completeness checker construction panicked, using heuristics only: {}",
                        panic_message(payload.as_ref())
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            config: config.clone(),
            lexicon,
            checker,
        }
    }

    fn lexicon_for(config: &EndpointingConfig) -> DanglingLexicon {
        DanglingLexicon::builtin().with_extra(&config.extra_dangling_endings)
    }

    pub fn has_semantic_layer(&self) -> bool {
        self.checker.is_some()
    }

    pub fn config(&self) -> &EndpointingConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &DanglingLexicon {
        &self.lexicon
    }

    /// Decide how long to wait before treating `text` as a finished utterance.
    pub fn decide(&self, text: &str, confidence: f32, speech_ended: bool) -> Decision {
        let text = text.trim();

        if self.lexicon.dangling_ending(text).is_some() {
            return Decision::new(
                self.config.incomplete_timeout(),
                DecisionReason::IncompletePhrase,
            );
        }

        let heuristic = self.heuristic_decision(text, confidence, speech_ended);

        if confidence >= self.config.semantic_confidence_threshold
            && let Some(verdict) = self.check_completeness(text)
            && !verdict.is_complete
        {
            return Decision::new(
                self.config.incomplete_timeout().max(heuristic.timeout),
                DecisionReason::Semantic(verdict.reason),
            );
        }

        heuristic
    }

    fn heuristic_decision(&self, text: &str, confidence: f32, speech_ended: bool) -> Decision {
        if confidence >= self.config.confidence_high {
            if shape::is_question(text) {
                return Decision::new(
                    self.config.short_timeout(),
                    DecisionReason::HighConfQuestion,
                );
            }
            if shape::is_command(text) || ends_with_terminal_punctuation(text) {
                return Decision::new(
                    self.config.short_timeout(),
                    DecisionReason::CompleteCommand,
                );
            }
            if speech_ended {
                return Decision::new(
                    self.config.short_timeout(),
                    DecisionReason::SpeechEndGoodConf,
                );
            }
        }

        if confidence >= self.config.confidence_good {
            let timeout = if shape::is_search_request(text) {
                self.config.search_timeout()
            } else {
                self.config.medium_timeout()
            };
            return Decision::new(timeout, DecisionReason::Default);
        }

        Decision::new(self.config.long_timeout(), DecisionReason::Default)
    }

    fn check_completeness(&self, text: &str) -> Option<CompletenessVerdict> {
        let checker = self.checker.as_ref()?;
        match catch_unwind(AssertUnwindSafe(|| checker.is_complete(text))) {
            Ok(Ok(verdict)) => {
                debug!(
                    "Completeness check: complete={} reason={} ({:.2}ms)",
                    verdict.is_complete, verdict.reason, verdict.processing_time_ms
                );
                Some(verdict)
            }
            Ok(Err(e)) => {
                warn!("Completeness check failed, ignoring: {}", e);
                None
            }
            Err(payload) => {
                let error = CheckerError::Panicked(panic_message(payload.as_ref()));
                warn!("Completeness check failed, ignoring: {}", error);
                None
            }
        }
    }
}
