//! Error types for this crate.
//!
//! All fallible operations return [`Result<T>`] which uses [`PipelineError`] as the error type.
//!
//! Invalid reviews and empty review groups are *not* errors: they produce
//! [`ScoreResult::Invalid`](crate::sentiment::ScoreResult::Invalid) and an empty
//! summary respectively.

use thiserror::Error;

/// A [`Result`](std::result::Result) alias using [`PipelineError`] as the error type.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The unified error type for all crate errors.
///
/// # Example
///
/// ```rust,no_run
/// use review_pipelines::error::PipelineError;
///
/// fn handle_error(e: PipelineError) {
///     match &e {
///         PipelineError::Inference(_) => {
///             // Model failed on this batch - caller decides whether to retry
///         }
///         PipelineError::Configuration(_) => {
///             // Settings or collection mapping is wrong - fix and restart
///         }
///         PipelineError::Download(_) => {
///             // Network issue - retry with backoff
///         }
///         _ => {
///             eprintln!("error: {e}");
///         }
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// Network or download failure. Retry may help.
    #[error("{0}")]
    Download(String),

    /// Tokenizer loading or encoding failure.
    #[error("{0}")]
    Tokenization(String),

    /// Classification or generation failure. Aborts the whole call.
    #[error("{0}")]
    Inference(String),

    /// Bad settings, unknown collection key or unsupported checkpoint.
    #[error("{0}")]
    Configuration(String),

    /// Device initialization failure. Fall back to CPU.
    #[error("{0}")]
    Device(String),

    /// A domain value was rejected (e.g. a rating outside 0..=5).
    #[error("{0}")]
    Validation(String),

    /// Internal error. Report if seen.
    #[error("{0}")]
    Unexpected(String),
}

impl From<hf_hub::api::sync::ApiError> for PipelineError {
    fn from(value: hf_hub::api::sync::ApiError) -> Self {
        PipelineError::Download(format!("HuggingFace API error: {}", value))
    }
}

impl From<candle_core::Error> for PipelineError {
    fn from(value: candle_core::Error) -> Self {
        PipelineError::Inference(value.to_string())
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(value: config::ConfigError) -> Self {
        PipelineError::Configuration(value.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(value: serde_json::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}
