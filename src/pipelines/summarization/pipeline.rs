use std::time::Instant;

use super::normalizer::clean;
use super::prompt::{prepare, DEFAULT_WORD_LIMIT};
use crate::error::{PipelineError, Result};
use crate::models::capabilities::{DecodingConfig, TextGenerator};

/// Default number of prompts handed to the generator at once.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Decoding used for every summary: short and greedy.
pub const SUMMARY_DECODING: DecodingConfig = DecodingConfig {
    max_new_tokens: 50,
    deterministic: true,
};

/// Summarizes groups of reviews into one short sentence each.
///
/// Construct with [`ReviewSummarizerBuilder`](super::ReviewSummarizerBuilder)
/// for the bundled T5 backend, or [`ReviewSummarizer::new`] with any
/// [`TextGenerator`].
///
/// # Examples
///
/// ```rust,no_run
/// # use review_pipelines::summarization::{ReviewSummarizerBuilder, T5Size};
/// # fn main() -> review_pipelines::error::Result<()> {
/// let summarizer = ReviewSummarizerBuilder::t5(T5Size::Small).build()?;
///
/// let summary = summarizer.summarize_one(&[
///     "Loved the pacing and the character development.",
///     "Great writing overall, but a few chapters dragged on.",
/// ])?;
/// println!("{summary}");
///
/// // One summary per book, in input order
/// let books = vec![vec!["Stellar narration."], vec![], vec!["Plot holes.", "Uneven prose."]];
/// let summaries = summarizer.summarize_many(&books)?;
/// assert_eq!(summaries.len(), 3);
/// # Ok(())
/// # }
/// ```
pub struct ReviewSummarizer<G: TextGenerator> {
    pub(crate) generator: G,
    word_limit: usize,
    batch_size: usize,
}

impl<G: TextGenerator> ReviewSummarizer<G> {
    /// Create a summarizer with a 250-word prompt cap and batches of 8.
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            word_limit: DEFAULT_WORD_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Cap prompts at `word_limit` words.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for a zero limit.
    pub fn with_word_limit(mut self, word_limit: usize) -> Result<Self> {
        if word_limit == 0 {
            return Err(PipelineError::Configuration(
                "word_limit must be greater than 0".into(),
            ));
        }
        self.word_limit = word_limit;
        Ok(self)
    }

    /// Hand `batch_size` prompts to the generator at a time.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for a zero batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(PipelineError::Configuration(
                "batch_size must be greater than 0".into(),
            ));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    /// Prompt word cap.
    pub fn word_limit(&self) -> usize {
        self.word_limit
    }

    /// Generation batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Build the prompt for one review group with this summarizer's word cap.
    pub fn prepare<S: AsRef<str>>(&self, reviews: &[S]) -> String {
        prepare(reviews, self.word_limit)
    }

    /// Summarize one group of reviews. An empty group gives an empty summary.
    pub fn summarize_one<S: AsRef<str>>(&self, reviews: &[S]) -> Result<String> {
        if reviews.is_empty() {
            return Ok(String::new());
        }

        let prompt = self.prepare(reviews);
        let raw = self.generator.generate(&prompt, &SUMMARY_DECODING)?;
        Ok(clean(&raw))
    }

    /// Summarize many review groups in one batched generator call.
    ///
    /// Returns exactly one summary per group, in input order. Empty groups
    /// keep their slot with an empty prompt. A generator failure aborts the
    /// whole batch.
    pub fn summarize_many<R, S>(&self, groups: &[R]) -> Result<Vec<String>>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let started = Instant::now();
        let prompts: Vec<String> = groups
            .iter()
            .map(|group| {
                let reviews = group.as_ref();
                if reviews.is_empty() {
                    String::new()
                } else {
                    self.prepare(reviews)
                }
            })
            .collect();

        let outputs = self
            .generator
            .generate_batch(&prompts, self.batch_size, &SUMMARY_DECODING)?;

        if outputs.len() != prompts.len() {
            return Err(PipelineError::Inference(format!(
                "Generator returned {} outputs for {} prompts",
                outputs.len(),
                prompts.len()
            )));
        }

        tracing::debug!(
            groups = prompts.len(),
            batch_size = self.batch_size,
            elapsed = ?started.elapsed(),
            "summarized review groups"
        );

        // Empty groups stay empty whatever the generator made of a blank prompt.
        Ok(prompts
            .iter()
            .zip(&outputs)
            .map(|(prompt, output)| {
                if prompt.is_empty() {
                    String::new()
                } else {
                    clean(output)
                }
            })
            .collect())
    }
}
