//! HTTP handlers and the shared state they extract.

pub mod health;
pub mod resources;
pub mod results;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use results::{advanced_results, send_results, ResultsRoute};

use std::sync::Arc;
use std::time::Instant;

use devcamper_core::TranslateOptions;

use super::ShutdownController;
use crate::service::{AggregateRecalculator, ResourceService, ResultExecutor};
use crate::storage::DocumentStore;

/// Shared application state passed to handlers via `State`.
///
/// Every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub resources: Arc<ResourceService>,
    pub results: ResultExecutor,
    /// Query translation tunables applied to every list route.
    pub query: TranslateOptions,
    pub shutdown: Arc<ShutdownController>,
    /// Process start, for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    /// Wires the services around one shared store.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        query: TranslateOptions,
        shutdown: Arc<ShutdownController>,
    ) -> Self {
        let recalculator = AggregateRecalculator::new(Arc::clone(&store));
        Self {
            resources: Arc::new(ResourceService::new(Arc::clone(&store), recalculator)),
            results: ResultExecutor::new(store),
            query,
            shutdown,
            start_time: Instant::now(),
        }
    }
}
