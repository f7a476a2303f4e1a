//! Document store trait and the query shape it executes.
//!
//! Defines [`DocumentStore`], the collection abstraction every service talks
//! to. Implementations own identifier assignment and unique-index
//! enforcement; filtering, sorting and windowing are expressed through
//! [`FindSpec`] so a backend can push them down.

use async_trait::async_trait;
use devcamper_core::query::compare::{compare_values, lookup};
use devcamper_core::{Document, FilterNode, Projection, QueryDescriptor, SortDirection, SortKey};

/// Errors surfaced by a [`DocumentStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write would violate a unique index.
    #[error("duplicate key in {collection} on ({})", .fields.join(", "))]
    DuplicateKey {
        collection: String,
        fields: Vec<String>,
    },

    /// The call did not complete within the configured bound.
    #[error("storage call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Anything else the backend reports.
    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

/// A `find` request: filter, then sort, then skip/limit, then projection.
///
/// Sort keys always read the full stored record, so projecting a sort field
/// away does not change ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    pub filter: FilterNode,
    pub sort: Vec<SortKey>,
    pub skip: usize,
    /// `None` returns every match after `skip`.
    pub limit: Option<usize>,
    pub projection: Option<Projection>,
}

impl FindSpec {
    /// All records matching `filter`, in insertion order.
    #[must_use]
    pub fn matching(filter: FilterNode) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// The page of records a [`QueryDescriptor`] asks for.
    #[must_use]
    pub fn from_descriptor(descriptor: &QueryDescriptor) -> Self {
        Self {
            filter: descriptor.filter.clone(),
            sort: descriptor.sort.clone(),
            skip: descriptor.window.start_index(),
            limit: Some(descriptor.window.limit()),
            projection: descriptor.projection.clone(),
        }
    }

    #[must_use]
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Orders two records by the sort keys, left to right.
    #[must_use]
    pub fn compare(&self, a: &Document, b: &Document) -> std::cmp::Ordering {
        self.sort
            .iter()
            .map(|key| {
                let ord = compare_values(lookup(a, &key.field), lookup(b, &key.field));
                match key.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Async collection abstraction over named document collections.
///
/// Shared as `Arc<dyn DocumentStore>` across request tasks.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Declares a unique index over `fields`. Idempotent.
    async fn ensure_unique_index(&self, collection: &str, fields: &[String]) -> StoreResult<()>;

    /// Records matching `spec`, sorted and windowed.
    async fn find(&self, collection: &str, spec: &FindSpec) -> StoreResult<Vec<Document>>;

    /// Number of records matching `filter`.
    async fn count(&self, collection: &str, filter: &FilterNode) -> StoreResult<usize>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Inserts `doc`, assigning a fresh `_id`. Returns the stored record.
    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<Document>;

    /// Merges `patch` into the record's top-level fields.
    ///
    /// Returns the updated record, or `None` if `id` does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Document)
        -> StoreResult<Option<Document>>;

    /// Removes a record, returning it if it existed.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Removes every record matching `filter`, returning how many went.
    async fn delete_many(&self, collection: &str, filter: &FilterNode) -> StoreResult<usize>;
}

#[cfg(test)]
mod tests {
    use devcamper_core::{translate, QueryParams};
    use serde_json::json;

    use super::*;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn find_spec_mirrors_descriptor_window() {
        let params = QueryParams::new()
            .with("page", "3")
            .with("limit", "4")
            .with("select", "name");
        let spec = FindSpec::from_descriptor(&translate(&params));
        assert_eq!(spec.skip, 8);
        assert_eq!(spec.limit, Some(4));
        assert!(spec.projection.is_some());
    }

    #[test]
    fn compare_breaks_ties_left_to_right() {
        let spec = FindSpec {
            sort: vec![SortKey::desc("rating"), SortKey::asc("title")],
            ..FindSpec::default()
        };
        let a = doc(json!({"rating": 8, "title": "b"}));
        let b = doc(json!({"rating": 8, "title": "a"}));
        let c = doc(json!({"rating": 9, "title": "z"}));
        assert!(spec.compare(&c, &a).is_lt());
        assert!(spec.compare(&b, &a).is_lt());
        assert!(spec.compare(&a, &a).is_eq());
    }

    #[test]
    fn duplicate_key_message_lists_fields() {
        let err = StoreError::DuplicateKey {
            collection: "reviews".into(),
            fields: vec!["bootcamp".into(), "user".into()],
        };
        assert_eq!(err.to_string(), "duplicate key in reviews on (bootcamp, user)");
    }
}
