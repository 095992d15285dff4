//! Sentiment scoring for reviews.
//!
//! Every review gets one positive-class probability in `[0, 1]`. Reviews longer
//! than the model window are split into overlapping token windows; the logits
//! of all windows are averaged and only then passed through a softmax.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use review_pipelines::sentiment::{mean_score, ModernBertSize, SentimentScorerBuilder};
//!
//! # fn main() -> review_pipelines::error::Result<()> {
//! let scorer = SentimentScorerBuilder::modernbert(ModernBertSize::Base).build()?;
//!
//! let reviews = [
//!     Some("Loved the pacing and the character development."),
//!     None,
//!     Some("Overhyped for me. Some plot holes in the central mystery."),
//! ];
//! let scores = scorer.score(reviews)?;
//!
//! for s in &scores {
//!     match s.probability() {
//!         Some(p) => println!("{:.3}", p.value()),
//!         None => println!("invalid"),
//!     }
//! }
//! println!("mean: {:?}", mean_score(&scores).map(|p| p.value()));
//! # Ok(())
//! # }
//! ```
//!
//! # Custom backends
//!
//! [`SentimentScorer::new`] accepts anything implementing
//! [`ChunkTokenizer`] and [`SequenceClassifier`].

// ============ Internal API ============

pub(crate) mod builder;
pub(crate) mod pipeline;
pub(crate) mod score;
pub(crate) mod windows;

// ============ Public API ============

pub use crate::models::capabilities::{Chunk, ChunkTokenizer, SequenceClassifier};
pub use crate::models::{HfChunkTokenizer, ModernBertClassifier, ModernBertSize};
pub use builder::SentimentScorerBuilder;
pub use pipeline::{SentimentScorer, DEFAULT_MAX_LEN, DEFAULT_STRIDE};
pub use score::{mean_score, Probability, ScoreResult};
pub use windows::{token_windows, window_count, TokenWindow};
