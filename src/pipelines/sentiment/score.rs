use serde::{Serialize, Serializer};

use crate::error::{PipelineError, Result};

/// A probability guaranteed to lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Probability(f32);

impl Probability {
    /// Returns `None` for NaN, infinities, and values outside `[0, 1]`.
    pub fn new(value: f32) -> Option<Self> {
        (value.is_finite() && (0.0..=1.0).contains(&value)).then_some(Self(value))
    }

    /// The wrapped value.
    pub fn value(self) -> f32 {
        self.0
    }
}

impl From<Probability> for f32 {
    fn from(p: Probability) -> Self {
        p.0
    }
}

impl Serialize for Probability {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.0)
    }
}

/// Sentiment outcome for one review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreResult {
    /// Positive-class probability.
    Valid(Probability),
    /// The review was missing or blank; no model call was made.
    Invalid,
}

impl ScoreResult {
    /// The probability, if valid.
    pub fn probability(&self) -> Option<Probability> {
        match self {
            ScoreResult::Valid(p) => Some(*p),
            ScoreResult::Invalid => None,
        }
    }

    /// Whether this result carries a probability.
    pub fn is_valid(&self) -> bool {
        matches!(self, ScoreResult::Valid(_))
    }
}

impl Serialize for ScoreResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.probability().serialize(serializer)
    }
}

/// Mean of the valid scores, `None` if there are none.
///
/// Invalid entries are skipped and do not count towards the denominator.
pub fn mean_score<'a, I>(scores: I) -> Option<Probability>
where
    I: IntoIterator<Item = &'a ScoreResult>,
{
    let (sum, count) = scores
        .into_iter()
        .filter_map(ScoreResult::probability)
        .fold((0.0f64, 0usize), |(sum, n), p| (sum + p.value() as f64, n + 1));

    if count == 0 {
        return None;
    }
    let mean = (sum / count as f64) as f32;
    Probability::new(mean.clamp(0.0, 1.0))
}

/// Elementwise mean of per-window logits.
pub(crate) fn mean_logits(windows: &[Vec<f32>], num_classes: usize) -> Result<Vec<f32>> {
    if windows.is_empty() {
        return Err(PipelineError::Inference(
            "No window logits to aggregate".into(),
        ));
    }

    let mut sums = vec![0.0f64; num_classes];
    for (i, logits) in windows.iter().enumerate() {
        if logits.len() != num_classes {
            return Err(PipelineError::Inference(format!(
                "Classifier returned {} logits for window {}, expected {}",
                logits.len(),
                i,
                num_classes
            )));
        }
        for (acc, &l) in sums.iter_mut().zip(logits) {
            *acc += l as f64;
        }
    }

    let n = windows.len() as f64;
    Ok(sums.into_iter().map(|s| (s / n) as f32).collect())
}

/// Softmax with the max subtracted before exponentiating.
pub(crate) fn stable_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(p: f32) -> ScoreResult {
        ScoreResult::Valid(Probability::new(p).unwrap())
    }

    #[test]
    fn probability_rejects_out_of_range() {
        assert!(Probability::new(0.0).is_some());
        assert!(Probability::new(1.0).is_some());
        assert!(Probability::new(-0.01).is_none());
        assert!(Probability::new(1.01).is_none());
        assert!(Probability::new(f32::NAN).is_none());
        assert!(Probability::new(f32::INFINITY).is_none());
    }

    #[test]
    fn mean_skips_invalid_entries() {
        let scores = [valid(0.2), ScoreResult::Invalid, valid(0.8)];
        let mean = mean_score(&scores).unwrap().value();
        assert!((mean - 0.5).abs() < 1e-6);
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean_score(&Vec::<ScoreResult>::new()), None);
        assert_eq!(mean_score(&[ScoreResult::Invalid, ScoreResult::Invalid]), None);
    }

    #[test]
    fn invalid_serializes_as_null() {
        let json = serde_json::to_string(&[valid(0.25), ScoreResult::Invalid]).unwrap();
        assert_eq!(json, "[0.25,null]");
    }

    #[test]
    fn softmax_sums_to_one_for_extreme_logits() {
        for logits in [
            [0.0f32, 0.0],
            [1000.0, -1000.0],
            [-1e30, 1e30],
            [88.0, 89.0],
            [-3.5, 2.25],
        ] {
            let probs = stable_softmax(&logits);
            let sum: f32 = probs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "{logits:?} -> {probs:?}");
            assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn mean_logits_is_elementwise() {
        let windows = vec![vec![1.0, 3.0], vec![3.0, -1.0]];
        assert_eq!(mean_logits(&windows, 2).unwrap(), vec![2.0, 1.0]);
    }

    #[test]
    fn mean_logits_rejects_wrong_width() {
        let windows = vec![vec![1.0, 3.0], vec![3.0]];
        assert!(matches!(
            mean_logits(&windows, 2),
            Err(PipelineError::Inference(_))
        ));
    }
}
