//! Per-call timeout enforcement for any [`DocumentStore`].
//!
//! Calls that exceed the bound fail with [`StoreError::Timeout`]. Nothing is
//! retried.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use devcamper_core::{Document, FilterNode};

use crate::storage::engine::{DocumentStore, FindSpec, StoreError, StoreResult};

/// Wraps a store so that every call is bounded by `timeout`.
pub struct TimedStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimedStore<S> {
    #[must_use]
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_elapsed) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(timeout_ms, "storage call timed out");
                Err(StoreError::Timeout { timeout_ms })
            }
        }
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for TimedStore<S> {
    async fn ensure_unique_index(&self, collection: &str, fields: &[String]) -> StoreResult<()> {
        self.bounded(self.inner.ensure_unique_index(collection, fields)).await
    }

    async fn find(&self, collection: &str, spec: &FindSpec) -> StoreResult<Vec<Document>> {
        self.bounded(self.inner.find(collection, spec)).await
    }

    async fn count(&self, collection: &str, filter: &FilterNode) -> StoreResult<usize> {
        self.bounded(self.inner.count(collection, filter)).await
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.bounded(self.inner.get(collection, id)).await
    }

    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<Document> {
        self.bounded(self.inner.insert(collection, doc)).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> StoreResult<Option<Document>> {
        self.bounded(self.inner.update(collection, id, patch)).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.bounded(self.inner.delete(collection, id)).await
    }

    async fn delete_many(&self, collection: &str, filter: &FilterNode) -> StoreResult<usize> {
        self.bounded(self.inner.delete_many(collection, filter)).await
    }
}
