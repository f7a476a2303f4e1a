//! In-memory [`DocumentStore`] backed by [`DashMap`].
//!
//! Each collection is its own `DashMap`, so readers never block one another.
//! Writers on the same collection serialize on a per-collection mutex only
//! for the unique-index check and the write that follows it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use devcamper_core::{Document, FilterNode, ID_FIELD};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use uuid::Uuid;

use crate::storage::engine::{DocumentStore, FindSpec, StoreError, StoreResult};

#[derive(Debug, Clone)]
struct StoredDocument {
    /// Insertion sequence; the tie-break when sort keys compare equal.
    seq: u64,
    doc: Document,
}

#[derive(Default)]
struct Collection {
    documents: DashMap<String, StoredDocument>,
    unique_indexes: RwLock<Vec<Vec<String>>>,
    write_lock: Mutex<()>,
}

impl Collection {
    /// Point-in-time copy of the matching records, in insertion order.
    fn matching(&self, filter: &FilterNode) -> Vec<StoredDocument> {
        let mut found: Vec<StoredDocument> = self
            .documents
            .iter()
            .filter(|entry| filter.matches(&entry.doc))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|stored| stored.seq);
        found
    }

    /// First unique index `candidate` would collide on, ignoring `own_id`.
    fn violated_index(&self, candidate: &Document, own_id: Option<&str>) -> Option<Vec<String>> {
        let indexes = self.unique_indexes.read();
        indexes
            .iter()
            .find(|fields| {
                let key = index_key(candidate, fields);
                self.documents.iter().any(|entry| {
                    own_id != Some(entry.key().as_str()) && index_key(&entry.doc, fields) == key
                })
            })
            .cloned()
    }
}

fn index_key(doc: &Document, fields: &[String]) -> Vec<Value> {
    fields
        .iter()
        .map(|f| doc.get(f).cloned().unwrap_or(Value::Null))
        .collect()
}

/// In-memory document store for development, tests and single-node use.
pub struct MemoryStore {
    collections: DashMap<String, Arc<Collection>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    fn collection(&self, name: &str) -> Arc<Collection> {
        if let Some(existing) = self.collections.get(name) {
            return Arc::clone(existing.value());
        }
        Arc::clone(self.collections.entry(name.to_string()).or_default().value())
    }

    fn duplicate(collection: &str, fields: Vec<String>) -> StoreError {
        StoreError::DuplicateKey {
            collection: collection.to_string(),
            fields,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_unique_index(&self, collection: &str, fields: &[String]) -> StoreResult<()> {
        let coll = self.collection(collection);
        let mut indexes = coll.unique_indexes.write();
        if !indexes.iter().any(|existing| existing.as_slice() == fields) {
            indexes.push(fields.to_vec());
        }
        Ok(())
    }

    async fn find(&self, collection: &str, spec: &FindSpec) -> StoreResult<Vec<Document>> {
        let mut found = self.collection(collection).matching(&spec.filter);
        if !spec.sort.is_empty() {
            found.sort_by(|a, b| spec.compare(&a.doc, &b.doc));
        }
        let window = found
            .into_iter()
            .skip(spec.skip)
            .take(spec.limit.unwrap_or(usize::MAX));
        Ok(match &spec.projection {
            Some(projection) => window.map(|stored| projection.apply(&stored.doc)).collect(),
            None => window.map(|stored| stored.doc).collect(),
        })
    }

    async fn count(&self, collection: &str, filter: &FilterNode) -> StoreResult<usize> {
        let coll = self.collection(collection);
        Ok(coll.documents.iter().filter(|entry| filter.matches(&entry.doc)).count())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let coll = self.collection(collection);
        let found = coll.documents.get(id).map(|entry| entry.doc.clone());
        Ok(found)
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> StoreResult<Document> {
        let coll = self.collection(collection);
        let id = Uuid::new_v4().simple().to_string();
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        let _write = coll.write_lock.lock();
        if let Some(fields) = coll.violated_index(&doc, None) {
            return Err(Self::duplicate(collection, fields));
        }
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        coll.documents.insert(id, StoredDocument { seq, doc: doc.clone() });
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> StoreResult<Option<Document>> {
        let coll = self.collection(collection);
        let _write = coll.write_lock.lock();
        let Some(mut stored) = coll.documents.get(id).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        for (key, value) in patch {
            if key != ID_FIELD {
                stored.doc.insert(key, value);
            }
        }
        if let Some(fields) = coll.violated_index(&stored.doc, Some(id)) {
            return Err(Self::duplicate(collection, fields));
        }
        let updated = stored.doc.clone();
        coll.documents.insert(id.to_string(), stored);
        Ok(Some(updated))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let coll = self.collection(collection);
        let _write = coll.write_lock.lock();
        Ok(coll.documents.remove(id).map(|(_, stored)| stored.doc))
    }

    async fn delete_many(&self, collection: &str, filter: &FilterNode) -> StoreResult<usize> {
        let coll = self.collection(collection);
        let _write = coll.write_lock.lock();
        let before = coll.documents.len();
        coll.documents.retain(|_, stored| !filter.matches(&stored.doc));
        Ok(before - coll.documents.len())
    }
}
