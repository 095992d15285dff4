use candle_core::{Device, Tensor};
use candle_transformers::models::modernbert::{
    ClassifierConfig, ClassifierPooling, Config,
    ModernBertForSequenceClassification as CandleModernBertForSequenceClassification,
};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{PipelineError, Result};
use crate::loaders::load_checkpoint;
use crate::models::capabilities::{Chunk, SequenceClassifier};

/// Available ModernBERT sentiment checkpoint sizes.
#[derive(Debug, Clone, Copy)]
pub enum ModernBertSize {
    /// Base model (~150M parameters).
    Base,
    /// Large model (~400M parameters).
    Large,
}

impl ModernBertSize {
    pub(crate) fn sentiment_repo(&self) -> &'static str {
        match self {
            ModernBertSize::Base => "clapAI/modernBERT-base-multilingual-sentiment",
            ModernBertSize::Large => "clapAI/modernBERT-large-multilingual-sentiment",
        }
    }
}

impl std::fmt::Display for ModernBertSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModernBertSize::Base => "modernbert-base",
            ModernBertSize::Large => "modernbert-large",
        };
        write!(f, "{name}")
    }
}

/// [`SequenceClassifier`] backed by a ModernBERT sequence-classification head.
///
/// Checkpoints with extra classes (e.g. `neutral`) are reduced to the
/// `[negative, positive]` pair by label name.
#[derive(Clone)]
pub struct ModernBertClassifier {
    model: CandleModernBertForSequenceClassification,
    device: Device,
    negative: usize,
    positive: usize,
}

impl ModernBertClassifier {
    /// Download and load a checkpoint onto `device`.
    pub fn from_hub(repo_id: &str, device: Device) -> Result<Self> {
        let checkpoint = load_checkpoint(repo_id, &device)?;

        let mut config: Config = serde_json::from_str(&checkpoint.config_json)?;
        let labels: ClassifierConfigJson = serde_json::from_str(&checkpoint.config_json)?;
        let num_labels = labels.label2id.len().max(labels.id2label.len());
        patch_config_num_labels(&mut config, num_labels);

        let (negative, positive) = sentiment_label_indices(&labels.id2label).ok_or_else(|| {
            let mut available: Vec<&str> = labels.id2label.values().map(String::as_str).collect();
            available.sort_unstable();
            PipelineError::Configuration(format!(
                "'{}' has no negative/positive labels. Available: {}",
                repo_id,
                available.join(", ")
            ))
        })?;

        let model = CandleModernBertForSequenceClassification::load(checkpoint.vb, &config)?;
        tracing::info!(repo = repo_id, num_labels, negative, positive, "sentiment classifier ready");

        Ok(Self {
            model,
            device,
            negative,
            positive,
        })
    }

    /// Returns the device the model is running on.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl SequenceClassifier for ModernBertClassifier {
    fn classify(&self, chunk: &Chunk) -> Result<Vec<f32>> {
        let input_ids = Tensor::new(chunk.ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(chunk.attention_mask.as_slice(), &self.device)?.unsqueeze(0)?;

        let scores = self.model.forward(&input_ids, &attention_mask)?;
        let scores = scores.squeeze(0)?.to_vec1::<f32>()?;

        match (scores.get(self.negative), scores.get(self.positive)) {
            (Some(&neg), Some(&pos)) => Ok(vec![inverse_sigmoid(neg), inverse_sigmoid(pos)]),
            _ => Err(PipelineError::Inference(format!(
                "Classifier returned {} logits; label indices {} and {} out of range",
                scores.len(),
                self.negative,
                self.positive
            ))),
        }
    }
}

/// The candle head ends in a sigmoid; map its outputs back to logits.
fn inverse_sigmoid(p: f32) -> f32 {
    let p = p.clamp(f32::EPSILON, 1.0 - f32::EPSILON);
    (p / (1.0 - p)).ln()
}

#[derive(Deserialize)]
struct ClassifierConfigJson {
    #[serde(default)]
    id2label: HashMap<String, String>,
    #[serde(default)]
    label2id: HashMap<String, u32>,
}

fn patch_config_num_labels(config: &mut Config, num_labels: usize) {
    if config
        .classifier_config
        .as_ref()
        .map(|c| c.id2label.len())
        .unwrap_or(0)
        != num_labels
    {
        let id2label: HashMap<String, String> = (0..num_labels)
            .map(|i| (i.to_string(), format!("label_{i}")))
            .collect();
        let label2id: HashMap<String, String> = id2label
            .iter()
            .map(|(k, v)| (v.clone(), k.clone()))
            .collect();

        config.classifier_config = Some(ClassifierConfig {
            id2label,
            label2id,
            classifier_pooling: ClassifierPooling::default(),
        });
    }
}

/// Indices of the negative and positive classes, matched by label name.
fn sentiment_label_indices(id2label: &HashMap<String, String>) -> Option<(usize, usize)> {
    let find = |prefix: &str| {
        id2label.iter().find_map(|(id, label)| {
            label
                .to_lowercase()
                .starts_with(prefix)
                .then(|| id.parse::<usize>().ok())
                .flatten()
        })
    };
    Some((find("neg")?, find("pos")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn finds_binary_labels() {
        let map = labels(&[("0", "NEGATIVE"), ("1", "POSITIVE")]);
        assert_eq!(sentiment_label_indices(&map), Some((0, 1)));
    }

    #[test]
    fn skips_neutral_in_three_way_heads() {
        let map = labels(&[("0", "positive"), ("1", "neutral"), ("2", "negative")]);
        assert_eq!(sentiment_label_indices(&map), Some((2, 0)));
    }

    #[test]
    fn inverse_sigmoid_recovers_logits() {
        for logit in [-4.0f32, -0.5, 0.0, 1.25, 3.0] {
            let p = 1.0 / (1.0 + (-logit).exp());
            assert!((inverse_sigmoid(p) - logit).abs() < 1e-3, "logit {logit}");
        }
        assert!(inverse_sigmoid(0.0).is_finite());
        assert!(inverse_sigmoid(1.0).is_finite());
    }

    #[test]
    fn generic_labels_are_rejected() {
        let map = labels(&[("0", "LABEL_0"), ("1", "LABEL_1")]);
        assert_eq!(sentiment_label_indices(&map), None);
    }
}
