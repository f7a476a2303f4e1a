//! Executes a [`QueryDescriptor`] against a collection and builds one page of
//! results: filtered count, sorted window, projection, then expansions.

use std::collections::HashMap;
use std::sync::Arc;

use devcamper_core::types::document_id;
use devcamper_core::{
    ComparisonOp, Document, Expansion, FilterNode, FilterTerm, Pagination, QueryDescriptor,
    ResultPage,
};
use serde_json::Value;
use tracing::debug;

use crate::storage::{DocumentStore, FindSpec, StoreResult};

/// Read-only executor shared by every list route.
#[derive(Clone)]
pub struct ResultExecutor {
    store: Arc<dyn DocumentStore>,
}

impl ResultExecutor {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Runs `descriptor` against `collection`.
    ///
    /// `total_count` is the size of the filtered population, so `next` is
    /// only offered while more matching records remain.
    ///
    /// # Errors
    ///
    /// Propagates the first storage failure; nothing is retried.
    pub async fn execute(
        &self,
        collection: &str,
        descriptor: &QueryDescriptor,
    ) -> StoreResult<ResultPage> {
        let total_count = self.store.count(collection, &descriptor.filter).await?;
        let mut items = self
            .store
            .find(collection, &FindSpec::from_descriptor(descriptor))
            .await?;

        for expansion in &descriptor.expansions {
            let survives = descriptor
                .projection
                .as_ref()
                .is_none_or(|p| p.includes(&expansion.field));
            if survives {
                self.expand(&mut items, expansion).await?;
            }
        }

        debug!(
            collection,
            total_count,
            returned = items.len(),
            page = descriptor.window.page(),
            "executed result query"
        );
        Ok(ResultPage {
            items,
            total_count,
            pagination: Pagination::for_window(&descriptor.window, total_count),
        })
    }

    /// Replaces each reference in `items` with the selected fields of the
    /// referenced record, or `null` if it no longer exists.
    async fn expand(&self, items: &mut [Document], expansion: &Expansion) -> StoreResult<()> {
        let mut ids: Vec<Value> = Vec::new();
        for item in items.iter() {
            if let Some(id @ Value::String(_)) = item.get(&expansion.field) {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        if ids.is_empty() {
            return Ok(());
        }

        let lookup = FindSpec::matching(FilterNode::from_terms([FilterTerm::new(
            devcamper_core::ID_FIELD,
            ComparisonOp::In,
            Value::Array(ids),
        )]))
        .with_projection(expansion.projection());
        let related: HashMap<String, Document> = self
            .store
            .find(&expansion.collection, &lookup)
            .await?
            .into_iter()
            .filter_map(|doc| Some((document_id(&doc)?.to_string(), doc)))
            .collect();

        for item in items.iter_mut() {
            let Some(Value::String(id)) = item.get(&expansion.field) else {
                continue;
            };
            let inlined = related.get(id).cloned().map_or(Value::Null, Value::Object);
            item.insert(expansion.field.clone(), inlined);
        }
        Ok(())
    }
}
