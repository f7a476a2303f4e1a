//! Recomputes derived aggregates on a parent record after its dependents change.
//!
//! Called explicitly by the write path. There is no locking: two concurrent
//! recomputes for the same parent race and the last write wins.

use std::sync::Arc;

use devcamper_core::{AggregateRule, Document, FilterNode, FilterTerm};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::storage::{DocumentStore, FindSpec, StoreResult};

#[derive(Clone)]
pub struct AggregateRecalculator {
    store: Arc<dyn DocumentStore>,
}

impl AggregateRecalculator {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Recomputes `rule` for `parent_id` from the current dependents and
    /// writes the result onto the parent. Returns the value written.
    ///
    /// # Errors
    ///
    /// Returns the storage error if reading dependents or writing the parent fails.
    pub async fn recompute(&self, rule: &AggregateRule, parent_id: &str) -> StoreResult<Value> {
        let scope = FilterNode::from_terms([FilterTerm::eq(rule.parent_ref, parent_id.into())]);
        let dependents = self
            .store
            .find(rule.child_collection, &FindSpec::matching(scope))
            .await?;
        let value = rule.compute(&dependents);

        let mut patch = Document::new();
        patch.insert(rule.target_field.to_string(), value.clone());
        match self.store.update(rule.parent_collection, parent_id, patch).await? {
            Some(_) => debug!(
                aggregate = rule.name,
                parent_id,
                dependents = dependents.len(),
                %value,
                "aggregate recomputed"
            ),
            None => warn!(aggregate = rule.name, parent_id, "aggregate parent no longer exists"),
        }
        Ok(value)
    }

    /// Like [`recompute`](Self::recompute) but never fails: errors are
    /// logged and swallowed so the triggering write still succeeds.
    pub async fn refresh(&self, rule: &AggregateRule, parent_id: &str) {
        if let Err(err) = self.recompute(rule, parent_id).await {
            error!(
                aggregate = rule.name,
                parent_id,
                error = %err,
                "failed to persist recomputed aggregate"
            );
        }
    }
}
