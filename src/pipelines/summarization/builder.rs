use super::pipeline::{ReviewSummarizer, DEFAULT_BATCH_SIZE};
use super::prompt::DEFAULT_WORD_LIMIT;
use crate::error::Result;
use crate::models::{T5Generator, T5Size};
use crate::pipelines::utils::DeviceRequest;
use crate::settings::SummarizerSettings;

crate::pipelines::utils::impl_device_methods!(ReviewSummarizerBuilder);

#[derive(Debug, Clone)]
enum Checkpoint {
    Size(T5Size),
    Repo(String),
}

/// Builder for a T5-backed [`ReviewSummarizer`].
///
/// # Examples
///
/// ```rust,no_run
/// # use review_pipelines::summarization::{ReviewSummarizerBuilder, T5Size};
/// # fn main() -> review_pipelines::error::Result<()> {
/// let summarizer = ReviewSummarizerBuilder::t5(T5Size::Small)
///     .batch_size(16)
///     .word_limit(200)
///     .cuda(0)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReviewSummarizerBuilder {
    checkpoint: Checkpoint,
    batch_size: usize,
    word_limit: usize,
    seed: Option<u64>,
    device_request: DeviceRequest,
}

impl ReviewSummarizerBuilder {
    fn new(checkpoint: Checkpoint) -> Self {
        Self {
            checkpoint,
            batch_size: DEFAULT_BATCH_SIZE,
            word_limit: DEFAULT_WORD_LIMIT,
            seed: None,
            device_request: DeviceRequest::Cpu,
        }
    }

    /// Creates a builder for one of the stock T5 checkpoints.
    pub fn t5(size: T5Size) -> Self {
        Self::new(Checkpoint::Size(size))
    }

    /// Creates a builder for any T5-architecture repo on the hub.
    pub fn repo(repo_id: impl Into<String>) -> Self {
        Self::new(Checkpoint::Repo(repo_id.into()))
    }

    /// Creates a builder from the `[summarizer]` settings section.
    pub fn from_settings(settings: &SummarizerSettings) -> Self {
        Self::repo(settings.model.clone())
            .batch_size(settings.batch_size)
            .word_limit(settings.word_limit)
    }

    /// Number of prompts handed to the model at a time.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Maximum words kept from each review group.
    pub fn word_limit(mut self, word_limit: usize) -> Self {
        self.word_limit = word_limit;
        self
    }

    /// Seed for the generator's logits processor.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Downloads the checkpoint and builds the summarizer.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch size or word limit is zero, or if model
    /// loading or device initialization fails.
    pub fn build(self) -> Result<ReviewSummarizer<T5Generator>> {
        let repo_id = match &self.checkpoint {
            Checkpoint::Size(size) => size.repo().to_string(),
            Checkpoint::Repo(repo) => repo.clone(),
        };

        let device = self.device_request.resolve()?;
        let mut generator = T5Generator::from_hub(&repo_id, device)?;
        if let Some(seed) = self.seed {
            generator = generator.with_seed(seed);
        }

        ReviewSummarizer::new(generator)
            .with_batch_size(self.batch_size)?
            .with_word_limit(self.word_limit)
    }
}
