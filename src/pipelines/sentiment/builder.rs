use super::pipeline::{validate_window, SentimentScorer, DEFAULT_MAX_LEN, DEFAULT_STRIDE};
use crate::error::Result;
use crate::models::capabilities::ChunkTokenizer;
use crate::models::{HfChunkTokenizer, ModernBertClassifier, ModernBertSize};
use crate::pipelines::utils::DeviceRequest;
use crate::settings::SentimentSettings;

crate::pipelines::utils::impl_device_methods!(SentimentScorerBuilder);

#[derive(Debug, Clone)]
enum Checkpoint {
    Size(ModernBertSize),
    Repo(String),
}

/// Builder for a ModernBERT-backed [`SentimentScorer`].
///
/// # Examples
///
/// ```rust,no_run
/// # use review_pipelines::sentiment::{SentimentScorerBuilder, ModernBertSize};
/// # fn main() -> review_pipelines::error::Result<()> {
/// let scorer = SentimentScorerBuilder::modernbert(ModernBertSize::Base)
///     .max_len(512)
///     .stride(128)
///     .cuda(0)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SentimentScorerBuilder {
    checkpoint: Checkpoint,
    max_len: usize,
    stride: usize,
    device_request: DeviceRequest,
}

impl SentimentScorerBuilder {
    fn new(checkpoint: Checkpoint) -> Self {
        Self {
            checkpoint,
            max_len: DEFAULT_MAX_LEN,
            stride: DEFAULT_STRIDE,
            device_request: DeviceRequest::Cpu,
        }
    }

    /// Creates a builder for one of the bundled ModernBERT sentiment checkpoints.
    pub fn modernbert(size: ModernBertSize) -> Self {
        Self::new(Checkpoint::Size(size))
    }

    /// Creates a builder for any ModernBERT sequence-classification repo whose
    /// labels include a negative and a positive class.
    pub fn repo(repo_id: impl Into<String>) -> Self {
        Self::new(Checkpoint::Repo(repo_id.into()))
    }

    /// Creates a builder from the `[sentiment]` settings section.
    pub fn from_settings(settings: &SentimentSettings) -> Self {
        Self::repo(settings.model.clone())
            .max_len(settings.max_len)
            .stride(settings.stride)
    }

    /// Set the window length in tokens (special tokens included).
    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Set the overlap between consecutive windows in tokens.
    pub fn stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Downloads the checkpoint and builds the scorer.
    ///
    /// # Errors
    ///
    /// Returns an error if the window leaves no room for content once the
    /// tokenizer's special tokens are added, or if model loading or device
    /// initialization fails. The window is checked before the model weights
    /// are downloaded.
    pub fn build(self) -> Result<SentimentScorer<HfChunkTokenizer, ModernBertClassifier>> {
        validate_window(self.max_len, self.stride, 0)?;

        let repo_id = match &self.checkpoint {
            Checkpoint::Size(size) => size.sentiment_repo().to_string(),
            Checkpoint::Repo(repo) => repo.clone(),
        };

        let device = self.device_request.resolve()?;
        let tokenizer = HfChunkTokenizer::from_hub(&repo_id)?;
        validate_window(self.max_len, self.stride, tokenizer.special_tokens())?;
        let classifier = ModernBertClassifier::from_hub(&repo_id, device)?;

        SentimentScorer::new(tokenizer, classifier).with_window(self.max_len, self.stride)
    }
}
