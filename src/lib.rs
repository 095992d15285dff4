//! Sentiment scoring and abstractive summarization for book reviews.
//!
//! Powered by [Candle](https://github.com/huggingface/candle). Long reviews are
//! scored over overlapping token windows with a ModernBERT classifier, and
//! groups of reviews are condensed into one sentence with T5.
//!
//! Both pipelines are generic over small capability traits, so any tokenizer,
//! classifier or generator can stand in for the bundled Candle providers.
//!
//! ```rust,no_run
//! use review_pipelines::sentiment::{ModernBertSize, SentimentScorerBuilder};
//! use review_pipelines::summarization::{ReviewSummarizerBuilder, T5Size};
//!
//! # fn main() -> review_pipelines::error::Result<()> {
//! let scorer = SentimentScorerBuilder::modernbert(ModernBertSize::Base).build()?;
//! let scores = scorer.score([Some("Loved every page."), None])?;
//!
//! let summarizer = ReviewSummarizerBuilder::t5(T5Size::Small).build()?;
//! let summary = summarizer.summarize_one(&["Loved every page.", "Slow start."])?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

// ============ Internal API ============

pub(crate) mod loaders;
pub(crate) mod models;
pub(crate) mod pipelines;

// ============ Public API ============

pub mod error;
pub mod settings;
pub mod store;
pub mod users;

pub use pipelines::{sentiment, summarization};
