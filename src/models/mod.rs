// ============ Model capability traits ============

pub mod capabilities;

// ============ Model implementations ============

pub(crate) mod modernbert;
pub(crate) mod t5;
pub(crate) mod tokenizer;

pub use modernbert::{ModernBertClassifier, ModernBertSize};
pub use t5::{T5Generator, T5Size};
pub use tokenizer::HfChunkTokenizer;
