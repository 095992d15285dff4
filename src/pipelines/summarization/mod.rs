//! Abstractive summarization of review groups.
//!
//! Reviews are joined into a bounded `summarize: ` prompt, passed through a
//! seq2seq model with short greedy decoding, and the output is normalized
//! with [`clean`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use review_pipelines::summarization::{ReviewSummarizerBuilder, T5Size};
//!
//! # fn main() -> review_pipelines::error::Result<()> {
//! let summarizer = ReviewSummarizerBuilder::t5(T5Size::Small).build()?;
//!
//! let summary = summarizer.summarize_one(&[
//!     "Audiobook narration was stellar.",
//!     "The thematic exploration of grief was heartfelt and moving.",
//! ])?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! # Batching
//!
//! [`ReviewSummarizer::summarize_many`] hands every prompt to the generator in
//! one call and returns one summary per group in input order. Empty groups
//! keep their slot and come back as `""`.

// ============ Internal API ============

pub(crate) mod builder;
pub(crate) mod normalizer;
pub(crate) mod pipeline;
pub(crate) mod prompt;

// ============ Public API ============

pub use crate::models::capabilities::{DecodingConfig, TextGenerator};
pub use crate::models::{T5Generator, T5Size};
pub use builder::ReviewSummarizerBuilder;
pub use normalizer::clean;
pub use pipeline::{ReviewSummarizer, DEFAULT_BATCH_SIZE, SUMMARY_DECODING};
pub use prompt::{prepare, DEFAULT_WORD_LIMIT, TASK_PREFIX};
