//! Model capability traits.
//!
//! These traits are the only way the pipelines talk to a model. The candle
//! providers in this crate implement them; tests and alternative runtimes
//! can plug in their own.

use crate::error::Result;

// ============ Tokenization ============

/// One bounded token window of a review, ready for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Token ids, special tokens included.
    pub ids: Vec<u32>,
    /// Attention mask, same length as `ids`.
    pub attention_mask: Vec<u32>,
}

impl Chunk {
    /// Build a chunk that attends to every token.
    pub fn new(ids: Vec<u32>) -> Self {
        let attention_mask = vec![1; ids.len()];
        Self {
            ids,
            attention_mask,
        }
    }

    /// Number of tokens in the chunk.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the chunk holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Splits text into overlapping token windows.
pub trait ChunkTokenizer {
    /// Tokenize `text` into chunks of at most `max_len` tokens.
    ///
    /// Consecutive chunks overlap by `stride` tokens and together cover the
    /// whole input. A tokenizer with special tokens returns at least one
    /// chunk for any text; one without may return none when the text has no
    /// content tokens.
    fn chunk(&self, text: &str, max_len: usize, stride: usize) -> Result<Vec<Chunk>>;

    /// Tokens wrapped around every chunk. They count against `max_len`, so
    /// a usable window needs `stride + special_tokens() < max_len`.
    fn special_tokens(&self) -> usize {
        0
    }
}

// ============ Classification ============

/// Binary sentiment classifier over a single chunk.
pub trait SequenceClassifier {
    /// Return the `[negative, positive]` logits for one chunk.
    fn classify(&self, chunk: &Chunk) -> Result<Vec<f32>>;
}

// ============ Generation ============

/// Decoding settings passed with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodingConfig {
    /// Upper bound on generated tokens per prompt.
    pub max_new_tokens: usize,
    /// Greedy decoding when `true`; sampling otherwise.
    pub deterministic: bool,
}

/// Seq2seq text generation.
pub trait TextGenerator {
    /// Generate text for one prompt. An empty prompt yields an empty string.
    fn generate(&self, prompt: &str, config: &DecodingConfig) -> Result<String>;

    /// Generate text for every prompt, one output per prompt in input order.
    ///
    /// `batch_size` is a hint for how many prompts the backend may process
    /// together.
    fn generate_batch(
        &self,
        prompts: &[String],
        _batch_size: usize,
        config: &DecodingConfig,
    ) -> Result<Vec<String>> {
        prompts
            .iter()
            .map(|prompt| self.generate(prompt, config))
            .collect()
    }
}

impl<T: ChunkTokenizer + ?Sized> ChunkTokenizer for Box<T> {
    fn chunk(&self, text: &str, max_len: usize, stride: usize) -> Result<Vec<Chunk>> {
        (**self).chunk(text, max_len, stride)
    }

    fn special_tokens(&self) -> usize {
        (**self).special_tokens()
    }
}

impl<C: SequenceClassifier + ?Sized> SequenceClassifier for Box<C> {
    fn classify(&self, chunk: &Chunk) -> Result<Vec<f32>> {
        (**self).classify(chunk)
    }
}

impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    fn generate(&self, prompt: &str, config: &DecodingConfig) -> Result<String> {
        (**self).generate(prompt, config)
    }

    fn generate_batch(
        &self,
        prompts: &[String],
        batch_size: usize,
        config: &DecodingConfig,
    ) -> Result<Vec<String>> {
        (**self).generate_batch(prompts, batch_size, config)
    }
}
