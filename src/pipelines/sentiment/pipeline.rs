use std::time::Instant;

use super::score::{mean_logits, stable_softmax, Probability, ScoreResult};
use crate::error::{PipelineError, Result};
use crate::models::capabilities::{ChunkTokenizer, SequenceClassifier};

/// Classes the classifier must report, in `[negative, positive]` order.
pub(crate) const NUM_CLASSES: usize = 2;
const POSITIVE: usize = 1;

/// Default window length in tokens.
pub const DEFAULT_MAX_LEN: usize = 512;
/// Default overlap between consecutive windows in tokens.
pub const DEFAULT_STRIDE: usize = 128;

/// Scores reviews with a positive-class probability.
///
/// Long reviews are split into overlapping windows; the logits of all windows
/// are averaged *before* the softmax, so one review always yields exactly one
/// probability.
///
/// Construct with [`SentimentScorerBuilder`](super::SentimentScorerBuilder) for
/// the bundled ModernBERT backend, or [`SentimentScorer::new`] to supply your
/// own tokenizer and classifier.
///
/// # Examples
///
/// ```rust,no_run
/// # use review_pipelines::sentiment::{mean_score, SentimentScorerBuilder, ModernBertSize};
/// # fn main() -> review_pipelines::error::Result<()> {
/// let scorer = SentimentScorerBuilder::modernbert(ModernBertSize::Base).build()?;
///
/// let scores = scorer.score(["A slow start but a wonderful ending.", "   "])?;
/// assert!(!scores[1].is_valid());
///
/// if let Some(mean) = mean_score(&scores) {
///     println!("mean positivity: {:.3}", mean.value());
/// }
/// # Ok(())
/// # }
/// ```
pub struct SentimentScorer<T: ChunkTokenizer, C: SequenceClassifier> {
    pub(crate) tokenizer: T,
    pub(crate) classifier: C,
    max_len: usize,
    stride: usize,
}

impl<T: ChunkTokenizer, C: SequenceClassifier> SentimentScorer<T, C> {
    /// Create a scorer with the default window (512 tokens, stride 128).
    pub fn new(tokenizer: T, classifier: C) -> Self {
        Self {
            tokenizer,
            classifier,
            max_len: DEFAULT_MAX_LEN,
            stride: DEFAULT_STRIDE,
        }
    }

    /// Change the window length and stride.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] unless the window leaves
    /// room for content past the overlap, i.e.
    /// `stride + tokenizer.special_tokens() < max_len`.
    pub fn with_window(mut self, max_len: usize, stride: usize) -> Result<Self> {
        validate_window(max_len, stride, self.tokenizer.special_tokens())?;
        self.max_len = max_len;
        self.stride = stride;
        Ok(self)
    }

    /// Window length in tokens.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Overlap between consecutive windows in tokens.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Score every review, preserving input order.
    ///
    /// Missing or blank reviews yield [`ScoreResult::Invalid`] without a model
    /// call. Any tokenizer or classifier failure aborts the whole call.
    pub fn score<'a, I, R>(&self, reviews: I) -> Result<Vec<ScoreResult>>
    where
        I: IntoIterator<Item = R>,
        R: Into<Option<&'a str>>,
    {
        let started = Instant::now();
        let results = reviews
            .into_iter()
            .map(|review| match review.into() {
                Some(text) if !text.trim().is_empty() => self.score_text(text),
                _ => Ok(ScoreResult::Invalid),
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            reviews = results.len(),
            valid = results.iter().filter(|r| r.is_valid()).count(),
            elapsed = ?started.elapsed(),
            "scored reviews"
        );
        Ok(results)
    }

    fn score_text(&self, text: &str) -> Result<ScoreResult> {
        let chunks = self.tokenizer.chunk(text, self.max_len, self.stride)?;
        if chunks.is_empty() {
            return Err(PipelineError::Tokenization(format!(
                "Tokenizer produced no chunks for '{}'",
                text.chars().take(50).collect::<String>()
            )));
        }

        let window_logits = chunks
            .iter()
            .map(|chunk| self.classifier.classify(chunk))
            .collect::<Result<Vec<_>>>()?;

        let logits = mean_logits(&window_logits, NUM_CLASSES)?;
        if logits.iter().any(|l| !l.is_finite()) {
            return Err(PipelineError::Inference(format!(
                "Classifier produced non-finite logits {logits:?}"
            )));
        }

        let probs = stable_softmax(&logits);
        let positive = Probability::new(probs[POSITIVE]).ok_or_else(|| {
            PipelineError::Inference(format!("Softmax produced invalid probability {probs:?}"))
        })?;

        tracing::trace!(windows = chunks.len(), p = positive.value(), "scored review");
        Ok(ScoreResult::Valid(positive))
    }
}

/// `special_tokens` are added to every window, so they shrink the content budget.
pub(crate) fn validate_window(
    max_len: usize,
    stride: usize,
    special_tokens: usize,
) -> Result<()> {
    let budget = max_len.saturating_sub(special_tokens);
    if budget == 0 || stride >= budget {
        return Err(PipelineError::Configuration(format!(
            "Window stride must be smaller than max length minus special tokens \
             (max_len={max_len}, stride={stride}, special_tokens={special_tokens})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::capabilities::Chunk;
    use crate::pipelines::sentiment::windows::token_windows;
    use std::cell::{Cell, RefCell};

    /// One token per whitespace-separated word; token id = word length.
    struct WordTokenizer;

    impl ChunkTokenizer for WordTokenizer {
        fn chunk(&self, text: &str, max_len: usize, stride: usize) -> Result<Vec<Chunk>> {
            let ids: Vec<u32> = text.split_whitespace().map(|w| w.len() as u32).collect();
            Ok(token_windows(ids.len(), max_len, stride)
                .into_iter()
                .map(|w| Chunk::new(ids[w.start..w.end].to_vec()))
                .collect())
        }
    }

    /// Returns queued logits in order, recording every chunk it sees.
    struct ScriptedClassifier {
        logits: RefCell<Vec<Vec<f32>>>,
        seen: RefCell<Vec<Chunk>>,
    }

    impl ScriptedClassifier {
        fn new(logits: Vec<Vec<f32>>) -> Self {
            Self {
                logits: RefCell::new(logits),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl SequenceClassifier for ScriptedClassifier {
        fn classify(&self, chunk: &Chunk) -> Result<Vec<f32>> {
            self.seen.borrow_mut().push(chunk.clone());
            let mut queue = self.logits.borrow_mut();
            if queue.is_empty() {
                return Err(PipelineError::Inference("out of scripted logits".into()));
            }
            Ok(queue.remove(0))
        }
    }

    /// Wraps every window in a start and an end token (ids 100 and 101).
    struct WrappingTokenizer;

    impl ChunkTokenizer for WrappingTokenizer {
        fn chunk(&self, text: &str, max_len: usize, stride: usize) -> Result<Vec<Chunk>> {
            let budget = max_len - self.special_tokens();
            let ids: Vec<u32> = text.split_whitespace().map(|w| w.len() as u32).collect();
            Ok(token_windows(ids.len(), budget, stride)
                .into_iter()
                .map(|w| {
                    let mut wrapped = vec![100];
                    wrapped.extend_from_slice(&ids[w.start..w.end]);
                    wrapped.push(101);
                    Chunk::new(wrapped)
                })
                .collect())
        }

        fn special_tokens(&self) -> usize {
            2
        }
    }

    /// Positive logit grows with the token count of the chunk.
    struct LengthClassifier {
        calls: Cell<usize>,
    }

    impl SequenceClassifier for LengthClassifier {
        fn classify(&self, chunk: &Chunk) -> Result<Vec<f32>> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![0.0, chunk.len() as f32 * 0.1])
        }
    }

    #[test]
    fn blank_and_missing_reviews_are_invalid_without_model_calls() {
        let classifier = LengthClassifier {
            calls: Cell::new(0),
        };
        let scorer = SentimentScorer::new(WordTokenizer, classifier);

        let scores = scorer.score([None, Some(""), Some("   \n\t")]).unwrap();

        assert_eq!(scores, vec![ScoreResult::Invalid; 3]);
        assert_eq!(scorer.classifier.calls.get(), 0);
    }

    #[test]
    fn results_preserve_input_order() {
        let classifier = LengthClassifier {
            calls: Cell::new(0),
        };
        let scorer = SentimentScorer::new(WordTokenizer, classifier);

        let scores = scorer
            .score([Some("one"), None, Some("one two three four five")])
            .unwrap();

        assert_eq!(scores.len(), 3);
        assert!(scores[0].is_valid());
        assert_eq!(scores[1], ScoreResult::Invalid);
        let short = scores[0].probability().unwrap().value();
        let long = scores[2].probability().unwrap().value();
        assert!(long > short);
    }

    #[test]
    fn averages_logits_before_softmax() {
        // Two windows: [0, 10] and [0, -2]. Mean logits [0, 4] -> sigmoid(4).
        // Averaging per-window probabilities would give ~0.56 instead.
        let classifier = ScriptedClassifier::new(vec![vec![0.0, 10.0], vec![0.0, -2.0]]);
        let scorer = SentimentScorer::new(WordTokenizer, classifier)
            .with_window(4, 1)
            .unwrap();

        let scores = scorer.score(["a b c d e f g"]).unwrap();

        let p = scores[0].probability().unwrap().value();
        let expected = 1.0 / (1.0 + (-4.0f32).exp());
        assert!((p - expected).abs() < 1e-6, "got {p}, expected {expected}");
        assert_eq!(scorer.classifier.seen.borrow().len(), 2);
    }

    #[test]
    fn classifier_sees_overlapping_windows() {
        let classifier = ScriptedClassifier::new(vec![vec![0.0, 0.0]; 3]);
        let scorer = SentimentScorer::new(WordTokenizer, classifier)
            .with_window(4, 2)
            .unwrap();

        // word lengths 1..=8 make each token id distinct
        scorer
            .score(["a bb ccc dddd eeeee ffffff ggggggg eeeeeeee"])
            .unwrap();

        let seen = scorer.classifier.seen.borrow();
        let ids: Vec<Vec<u32>> = seen.iter().map(|c| c.ids.clone()).collect();
        assert_eq!(ids, vec![vec![1, 2, 3, 4], vec![3, 4, 5, 6], vec![5, 6, 7, 8]]);
    }

    #[test]
    fn equal_logits_give_one_half() {
        let classifier = ScriptedClassifier::new(vec![vec![3.0, 3.0]]);
        let scorer = SentimentScorer::new(WordTokenizer, classifier);
        let scores = scorer.score(["fine"]).unwrap();
        assert_eq!(scores[0].probability().unwrap().value(), 0.5);
    }

    /// Keeps only alphanumeric words and adds no special tokens.
    struct AlphanumericTokenizer;

    impl ChunkTokenizer for AlphanumericTokenizer {
        fn chunk(&self, text: &str, max_len: usize, stride: usize) -> Result<Vec<Chunk>> {
            let ids: Vec<u32> = text
                .split_whitespace()
                .filter(|w| w.chars().all(char::is_alphanumeric))
                .map(|w| w.len() as u32)
                .collect();
            Ok(token_windows(ids.len(), max_len, stride)
                .into_iter()
                .map(|w| Chunk::new(ids[w.start..w.end].to_vec()))
                .filter(|chunk| !chunk.is_empty())
                .collect())
        }
    }

    #[test]
    fn text_without_tokens_is_a_tokenization_error() {
        let classifier = ScriptedClassifier::new(vec![vec![0.0, 1.0]]);
        let scorer = SentimentScorer::new(AlphanumericTokenizer, classifier);

        let err = scorer.score(["?! ..."]).unwrap_err();
        assert!(matches!(err, PipelineError::Tokenization(_)));
        assert!(scorer.classifier.seen.borrow().is_empty());
    }

    #[test]
    fn classifier_failure_aborts_the_call() {
        let classifier = ScriptedClassifier::new(vec![vec![0.0, 1.0]]);
        let scorer = SentimentScorer::new(WordTokenizer, classifier);

        let err = scorer.score(["first", "second"]).unwrap_err();
        assert!(matches!(err, PipelineError::Inference(_)));
    }

    #[test]
    fn non_finite_logits_are_an_inference_error() {
        let classifier = ScriptedClassifier::new(vec![vec![f32::NAN, 1.0]]);
        let scorer = SentimentScorer::new(WordTokenizer, classifier);
        assert!(matches!(
            scorer.score(["text"]),
            Err(PipelineError::Inference(_))
        ));
    }

    #[test]
    fn wrong_logit_width_is_an_inference_error() {
        let classifier = ScriptedClassifier::new(vec![vec![0.1, 0.2, 0.7]]);
        let scorer = SentimentScorer::new(WordTokenizer, classifier);
        assert!(matches!(
            scorer.score(["text"]),
            Err(PipelineError::Inference(_))
        ));
    }

    #[test]
    fn special_tokens_count_against_the_window() {
        let classifier = || LengthClassifier {
            calls: Cell::new(0),
        };

        // One token past the stride is enough without special tokens.
        let bare = SentimentScorer::new(WordTokenizer, classifier())
            .with_window(129, 128)
            .unwrap();
        assert!(bare.score(["a b c"]).unwrap()[0].is_valid());

        // The same window leaves no content room once [start]/[end] are added.
        assert!(matches!(
            SentimentScorer::new(WrappingTokenizer, classifier()).with_window(129, 128),
            Err(PipelineError::Configuration(_))
        ));
        assert!(SentimentScorer::new(WrappingTokenizer, classifier())
            .with_window(130, 128)
            .is_err());

        let wrapped = SentimentScorer::new(WrappingTokenizer, classifier())
            .with_window(131, 128)
            .unwrap();
        assert!(wrapped.score(["a b c"]).unwrap()[0].is_valid());
        assert_eq!(wrapped.classifier.calls.get(), 1);
    }

    #[test]
    fn stride_must_be_smaller_than_window() {
        let scorer = SentimentScorer::new(WordTokenizer, LengthClassifier { calls: Cell::new(0) });
        assert!(matches!(
            scorer.with_window(128, 128),
            Err(PipelineError::Configuration(_))
        ));
    }
}
