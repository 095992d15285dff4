//! In-process [`DocumentStore`].

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use uuid::Uuid;

use super::{id_string, Collections, Document, DocumentStore, ID_FIELD};
use crate::error::{PipelineError, Result};

type Physical = HashMap<String, Collection>;

/// Documents held in memory, keyed by physical collection name.
///
/// Useful for tests and dry runs. Contents are lost when dropped. Every
/// operation takes the store lock once, so each call is atomic with respect
/// to other threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Collections,
    documents: RwLock<Physical>,
}

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<Document>,
    unique: BTreeSet<String>,
}

impl Collection {
    /// Fail if `doc` repeats a uniquely indexed value held by any stored
    /// document other than the one at `skip`.
    fn check_unique(&self, doc: &Document, skip: Option<usize>) -> Result<()> {
        for field in &self.unique {
            let Some(value) = doc.get(field) else {
                continue;
            };
            let taken = self
                .documents
                .iter()
                .enumerate()
                .any(|(index, other)| Some(index) != skip && other.get(field) == Some(value));
            if taken {
                return Err(duplicate(field, value));
            }
        }
        Ok(())
    }
}

fn duplicate(field: &str, value: &Value) -> PipelineError {
    PipelineError::Validation(format!("Duplicate value {value} for unique field '{field}'"))
}

impl MemoryStore {
    /// Create an empty store using `collections` to resolve keys.
    pub fn new(collections: Collections) -> Self {
        Self {
            collections,
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Number of documents stored under a logical key.
    pub fn count(&self, collection: &str) -> Result<usize> {
        let name = self.collections.resolve(collection)?;
        Ok(self.read()?.get(name).map_or(0, |c| c.documents.len()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Physical>> {
        self.documents
            .read()
            .map_err(|e| PipelineError::Unexpected(format!("Store lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Physical>> {
        self.documents
            .write()
            .map_err(|e| PipelineError::Unexpected(format!("Store lock poisoned: {e}")))
    }

    fn update(
        &self,
        collection: &str,
        filter: &Document,
        set: &Document,
        many: bool,
    ) -> Result<u64> {
        let name = self.collections.resolve(collection)?;
        let mut documents = self.write()?;
        let Some(stored) = documents.get_mut(name) else {
            return Ok(0);
        };

        let limit = if many { usize::MAX } else { 1 };
        let targets: Vec<usize> = stored
            .documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| matches(doc, filter))
            .map(|(index, _)| index)
            .take(limit)
            .collect();

        let mut modified = 0;
        for index in targets {
            let mut candidate = stored.documents[index].clone();
            if !apply_set(&mut candidate, set) {
                continue;
            }
            stored.check_unique(&candidate, Some(index))?;
            stored.documents[index] = candidate;
            modified += 1;
        }

        tracing::debug!(collection = name, modified, "updated documents");
        Ok(modified)
    }

    fn delete(&self, collection: &str, filter: &Document, many: bool) -> Result<u64> {
        let name = self.collections.resolve(collection)?;
        let mut documents = self.write()?;
        let Some(stored) = documents.get_mut(name) else {
            return Ok(0);
        };
        let stored = &mut stored.documents;

        let before = stored.len();
        if many {
            stored.retain(|doc| !matches(doc, filter));
        } else if let Some(index) = stored.iter().position(|doc| matches(doc, filter)) {
            stored.remove(index);
        }

        let deleted = (before - stored.len()) as u64;
        tracing::debug!(collection = name, deleted, "deleted documents");
        Ok(deleted)
    }
}

impl DocumentStore for MemoryStore {
    fn insert_one(&self, collection: &str, document: Document) -> Result<String> {
        let mut ids = self.insert_many(collection, vec![document])?;
        ids.pop()
            .ok_or_else(|| PipelineError::Unexpected("Insert returned no id".into()))
    }

    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<Vec<String>> {
        let name = self.collections.resolve(collection)?;
        let mut stored = self.write()?;
        let target = stored.entry(name.to_string()).or_default();

        // Nothing is stored unless the whole batch passes the unique indexes.
        let mut ids = Vec::with_capacity(documents.len());
        let mut pending: Vec<Document> = Vec::with_capacity(documents.len());
        for mut doc in documents {
            let id = doc
                .entry(ID_FIELD)
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            ids.push(id_string(id));

            target.check_unique(&doc, None)?;
            for field in &target.unique {
                if let Some(value) = doc.get(field) {
                    if pending.iter().any(|other| other.get(field) == Some(value)) {
                        return Err(duplicate(field, value));
                    }
                }
            }
            pending.push(doc);
        }
        target.documents.extend(pending);

        tracing::debug!(collection = name, inserted = ids.len(), "inserted documents");
        Ok(ids)
    }

    fn find(
        &self,
        collection: &str,
        filter: &Document,
        projection: Option<&Document>,
    ) -> Result<Vec<Document>> {
        let name = self.collections.resolve(collection)?;
        let projection = projection.map(Projection::parse).transpose()?;
        let documents = self.read()?;

        Ok(documents
            .get(name)
            .into_iter()
            .flat_map(|c| c.documents.iter())
            .filter(|doc| matches(doc, filter))
            .map(|doc| match &projection {
                Some(projection) => projection.apply(doc),
                None => doc.clone(),
            })
            .collect())
    }

    fn update_one(&self, collection: &str, filter: &Document, set: &Document) -> Result<u64> {
        self.update(collection, filter, set, false)
    }

    fn update_many(&self, collection: &str, filter: &Document, set: &Document) -> Result<u64> {
        self.update(collection, filter, set, true)
    }

    fn delete_one(&self, collection: &str, filter: &Document) -> Result<u64> {
        self.delete(collection, filter, false)
    }

    fn delete_many(&self, collection: &str, filter: &Document) -> Result<u64> {
        self.delete(collection, filter, true)
    }

    fn push_many(
        &self,
        collection: &str,
        filter: &Document,
        field: &str,
        values: Vec<Value>,
    ) -> Result<u64> {
        let name = self.collections.resolve(collection)?;
        if values.is_empty() {
            return Ok(0);
        }

        let mut documents = self.write()?;
        let Some(doc) = documents
            .get_mut(name)
            .and_then(|c| c.documents.iter_mut().find(|doc| matches(doc, filter)))
        else {
            return Ok(0);
        };

        let pushed = values.len();
        match doc
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => items.extend(values),
            other => {
                return Err(PipelineError::Validation(format!(
                    "Cannot push to '{field}': it holds {other}, not an array"
                )))
            }
        }

        tracing::debug!(collection = name, field, pushed, "pushed array values");
        Ok(1)
    }

    fn create_unique_index(&self, collection: &str, field: &str) -> Result<()> {
        let name = self.collections.resolve(collection)?;
        let mut documents = self.write()?;
        let target = documents.entry(name.to_string()).or_default();
        if target.unique.contains(field) {
            return Ok(());
        }

        let mut seen: Vec<&Value> = Vec::new();
        for value in target.documents.iter().filter_map(|doc| doc.get(field)) {
            if seen.contains(&value) {
                return Err(duplicate(field, value));
            }
            seen.push(value);
        }

        target.unique.insert(field.to_string());
        tracing::debug!(collection = name, field, "created unique index");
        Ok(())
    }
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, expected)| doc.get(field) == Some(expected))
}

/// Assign fields; true if anything changed.
fn apply_set(doc: &mut Document, set: &Document) -> bool {
    let mut changed = false;
    for (field, value) in set {
        if doc.get(field) != Some(value) {
            doc.insert(field.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

enum Projection {
    Include { fields: Vec<String>, keep_id: bool },
    Exclude { fields: Vec<String> },
}

impl Projection {
    fn parse(spec: &Document) -> Result<Self> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        let mut keep_id = true;

        for (field, flag) in spec {
            let keep = match flag {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
                other => {
                    return Err(PipelineError::Validation(format!(
                        "Projection value for '{field}' must be 0/1 or a bool, got {other}"
                    )))
                }
            };
            if field == ID_FIELD {
                keep_id = keep;
            } else if keep {
                include.push(field.clone());
            } else {
                exclude.push(field.clone());
            }
        }

        match (include.is_empty(), exclude.is_empty()) {
            (false, false) => Err(PipelineError::Validation(
                "Projection cannot mix included and excluded fields".into(),
            )),
            (false, true) => Ok(Projection::Include {
                fields: include,
                keep_id,
            }),
            (true, _) => {
                if !keep_id {
                    exclude.push(ID_FIELD.to_string());
                }
                Ok(Projection::Exclude { fields: exclude })
            }
        }
    }

    fn apply(&self, doc: &Document) -> Document {
        match self {
            Projection::Include { fields, keep_id } => doc
                .iter()
                .filter(|(field, _)| {
                    (*keep_id && field.as_str() == ID_FIELD) || fields.contains(*field)
                })
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect(),
            Projection::Exclude { fields } => doc
                .iter()
                .filter(|(field, _)| !fields.contains(*field))
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect(),
        }
    }
}
