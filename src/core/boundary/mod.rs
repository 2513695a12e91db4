//! Utterance boundary decisions
//!
//! [`BoundaryDecider`] is a pure policy. Given the text recognized so far,
//! its confidence and whether the speaker has stopped, it returns how long to
//! wait for more speech before finalizing and a reason label for tracing.

mod checker;
mod decider;
mod lexicon;
mod shape;


pub use checker::{
    CheckerError, CheckerFactory, CompletenessChecker, CompletenessVerdict,
    LexicalCompletenessChecker,
};
pub use decider::{BoundaryDecider, Decision, DecisionReason};
pub use lexicon::{DanglingLexicon, EndingCategory, ends_with_terminal_punctuation};
pub use shape::{is_command, is_question, is_search_request};
