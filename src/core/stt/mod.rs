mod base;

pub use base::{RecognitionCallback, RecognitionConfig, RecognitionEngine, RecognitionError};
