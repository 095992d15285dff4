//! Document persistence addressed by logical collection key.
//!
//! Callers never name physical collections. They pass a key such as
//! `"reviews_clean"` and [`Collections`] maps it to the name configured in
//! [`MongoSettings`]. An unknown key is a
//! [`Configuration`](PipelineError::Configuration) error.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};
use crate::settings::{unknown_collection, MongoSettings};

mod memory;

pub use memory::MemoryStore;

/// A schemaless document.
pub type Document = Map<String, Value>;

/// Field every stored document is keyed by.
pub const ID_FIELD: &str = "_id";

/// CRUD over named collections of JSON documents.
///
/// Filters are top-level equality matches; an empty filter matches every
/// document. Updates assign top-level fields (`$set` semantics) and only
/// count documents whose contents actually changed.
pub trait DocumentStore {
    /// Insert one document and return its id. A missing `_id` is assigned a
    /// fresh UUID.
    fn insert_one(&self, collection: &str, document: Document) -> Result<String>;

    /// Insert documents in order and return their ids in the same order.
    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<Vec<String>>;

    /// All documents matching `filter`, in insertion order.
    ///
    /// `projection` maps field names to `1` (keep) or `0` (drop). `_id` is
    /// kept unless explicitly dropped.
    fn find(
        &self,
        collection: &str,
        filter: &Document,
        projection: Option<&Document>,
    ) -> Result<Vec<Document>>;

    /// First document matching `filter`.
    fn find_one(&self, collection: &str, filter: &Document) -> Result<Option<Document>> {
        Ok(self.find(collection, filter, None)?.into_iter().next())
    }

    /// Set fields on the first matching document. Returns the modified count.
    fn update_one(&self, collection: &str, filter: &Document, set: &Document) -> Result<u64>;

    /// Set fields on every matching document. Returns the modified count.
    fn update_many(&self, collection: &str, filter: &Document, set: &Document) -> Result<u64>;

    /// Delete the first matching document. Returns the deleted count.
    fn delete_one(&self, collection: &str, filter: &Document) -> Result<u64>;

    /// Delete every matching document. Returns the deleted count.
    fn delete_many(&self, collection: &str, filter: &Document) -> Result<u64>;

    /// Append `values` to the array `field` of the first matching document
    /// (`$push` with `$each`), creating the array when the field is absent.
    /// The read and the write happen as one step, so concurrent pushes to the
    /// same document are never lost.
    ///
    /// Returns the modified count, which is 0 when nothing matches or
    /// `values` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] if the field exists and is not
    /// an array.
    fn push_many(
        &self,
        collection: &str,
        filter: &Document,
        field: &str,
        values: Vec<Value>,
    ) -> Result<u64>;

    /// Require distinct values of `field` across the collection. Documents
    /// without the field are not constrained. Idempotent.
    ///
    /// Once created, inserts and updates that would duplicate a value fail
    /// with [`PipelineError::Validation`] and store nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] if stored documents already
    /// share a value of `field`.
    fn create_unique_index(&self, collection: &str, field: &str) -> Result<()>;
}

/// Logical key to physical collection name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    names: BTreeMap<String, String>,
}

impl Collections {
    /// Use an explicit mapping.
    pub fn new(names: BTreeMap<String, String>) -> Self {
        Self { names }
    }

    /// Use the mapping from the `[mongo]` settings section.
    pub fn from_settings(settings: &MongoSettings) -> Self {
        Self::new(settings.collections.clone())
    }

    /// Physical name for `key`.
    pub fn resolve(&self, key: &str) -> Result<&str> {
        self.names
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| unknown_collection(key, self.names.keys()))
    }

    /// Known logical keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}

impl Default for Collections {
    fn default() -> Self {
        Self::from_settings(&MongoSettings::default())
    }
}

/// Build a [`Document`] from a JSON object value.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] if `value` is not an object.
pub fn document(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(PipelineError::Validation(format!(
            "Expected a JSON object for a document, got {other}"
        ))),
    }
}

/// String form of a document id.
pub(crate) fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_default_keys() {
        let collections = Collections::default();
        assert_eq!(collections.resolve("sentiment_scores").unwrap(), "sentiment_scores");
        assert_eq!(collections.keys().count(), 7);
    }

    #[test]
    fn unknown_key_is_configuration_error() {
        let collections = Collections::default();
        assert!(matches!(
            collections.resolve("reviews"),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn document_requires_an_object() {
        assert!(document(json!({"a": 1})).is_ok());
        assert!(matches!(
            document(json!([1, 2])),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn id_string_unquotes_strings() {
        assert_eq!(id_string(&json!("abc")), "abc");
        assert_eq!(id_string(&json!(42)), "42");
    }
}
