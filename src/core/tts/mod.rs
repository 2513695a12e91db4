mod base;
mod markdown;
mod reader;
mod segmenter;


pub use base::{SpeechSynthesizer, TTSError, TTSResult};
pub use markdown::strip_markdown;
pub use reader::{ReadSummary, ResponseReader};
pub use segmenter::{split_into_segments, split_sentences};
