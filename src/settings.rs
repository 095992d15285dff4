//! Layered runtime settings.
//!
//! [`Settings::load`] reads, in order:
//! 1. `config/default.toml`
//! 2. `config/{REVIEW_PIPELINES_ENV}.toml` (`development` when unset)
//! 3. environment variables prefixed `REVIEW_PIPELINES__`, e.g.
//!    `REVIEW_PIPELINES__MONGO__URI` or
//!    `REVIEW_PIPELINES__MONGO__COLLECTIONS__REVIEWS_RAW`
//!
//! Every field has a default, so all three sources are optional.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Logical collection keys known to the rest of the crate.
pub const COLLECTION_KEYS: [&str; 7] = [
    "metadata_raw",
    "metadata_clean",
    "reviews_raw",
    "reviews_clean",
    "users_rating",
    "sentiment_scores",
    "summarized_reviews",
];

const ENV_SELECTOR: &str = "REVIEW_PIPELINES_ENV";
const ENV_PREFIX: &str = "REVIEW_PIPELINES";

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Document database connection and collection mapping.
    pub mongo: MongoSettings,
    /// Relational database connection.
    pub postgres: PostgresSettings,
    /// Sentiment model and windowing.
    pub sentiment: SentimentSettings,
    /// Summarization model and batching.
    pub summarizer: SummarizerSettings,
    /// Log filter used by binaries.
    pub logging: LoggingSettings,
}

/// Document database settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MongoSettings {
    /// Connection URI without the port.
    pub uri: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub db: String,
    /// Logical key to physical collection name. Keys not given keep their
    /// default mapping.
    #[serde(deserialize_with = "merge_with_default_collections")]
    pub collections: BTreeMap<String, String>,
}

fn default_collections() -> BTreeMap<String, String> {
    COLLECTION_KEYS
        .iter()
        .map(|key| (key.to_string(), key.to_string()))
        .collect()
}

fn merge_with_default_collections<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let overrides = BTreeMap::<String, String>::deserialize(deserializer)?;
    let mut collections = default_collections();
    collections.extend(overrides);
    Ok(collections)
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost".to_string(),
            port: 27017,
            db: "book_reviews".to_string(),
            collections: default_collections(),
        }
    }
}

/// Relational database settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PostgresSettings {
    /// Connection URL.
    pub url: String,
    /// Schema the analytics tables live in.
    pub schema: String,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/book_reviews".to_string(),
            schema: "public".to_string(),
        }
    }
}

/// Sentiment scorer settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SentimentSettings {
    /// Hub repo of a ModernBERT sentiment checkpoint.
    pub model: String,
    /// Window length in tokens.
    pub max_len: usize,
    /// Overlap between consecutive windows.
    pub stride: usize,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            model: "clapAI/modernBERT-base-multilingual-sentiment".to_string(),
            max_len: 512,
            stride: 128,
        }
    }
}

/// Summarizer settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SummarizerSettings {
    /// Hub repo of a T5 checkpoint.
    pub model: String,
    /// Prompts per generation batch.
    pub batch_size: usize,
    /// Maximum prompt words per review group.
    pub word_limit: usize,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            model: "google-t5/t5-small".to_string(),
            batch_size: 8,
            word_limit: 250,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `info` or `review_pipelines=debug`.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from config files and environment, then validate.
    pub fn load() -> Result<Self> {
        let env = std::env::var(ENV_SELECTOR).unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        tracing::debug!(env = %env, db = %settings.mongo.db, "loaded settings");
        Ok(settings)
    }

    /// Load settings from a single TOML file, then validate.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| {
            PipelineError::Configuration(format!("Failed to parse config file: {e}"))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges and the collection mapping.
    ///
    /// The sentiment window is only checked against the overlap here. The
    /// tokenizer's special tokens also count against `max_len`, and that is
    /// checked once the tokenizer is loaded by
    /// [`SentimentScorerBuilder::build`](crate::sentiment::SentimentScorerBuilder::build).
    pub fn validate(&self) -> Result<()> {
        if self.sentiment.max_len == 0 {
            return Err(PipelineError::Configuration(
                "sentiment.max_len must be greater than 0".into(),
            ));
        }

        if self.sentiment.stride >= self.sentiment.max_len {
            return Err(PipelineError::Configuration(format!(
                "sentiment.stride ({}) must be less than sentiment.max_len ({})",
                self.sentiment.stride, self.sentiment.max_len
            )));
        }

        if self.summarizer.batch_size == 0 {
            return Err(PipelineError::Configuration(
                "summarizer.batch_size must be greater than 0".into(),
            ));
        }

        if self.summarizer.word_limit == 0 {
            return Err(PipelineError::Configuration(
                "summarizer.word_limit must be greater than 0".into(),
            ));
        }

        if let Some((key, _)) = self
            .mongo
            .collections
            .iter()
            .find(|(_, name)| name.trim().is_empty())
        {
            return Err(PipelineError::Configuration(format!(
                "mongo.collections.{key} must name a collection"
            )));
        }

        Ok(())
    }

    /// Resolve a logical collection key to its physical name.
    pub fn collection(&self, key: &str) -> Result<&str> {
        self.mongo
            .collections
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| unknown_collection(key, self.mongo.collections.keys()))
    }
}

pub(crate) fn unknown_collection<'a>(
    key: &str,
    known: impl Iterator<Item = &'a String>,
) -> PipelineError {
    let known: Vec<&str> = known.map(String::as_str).collect();
    PipelineError::Configuration(format!(
        "Invalid collection name '{key}'. Must be one of: {known:?}"
    ))
}
