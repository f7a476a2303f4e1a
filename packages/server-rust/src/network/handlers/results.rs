//! The `advanced_results` middleware and the handler that sends its output.
//!
//! List routes wrap [`send_results`] in [`advanced_results`], which translates
//! the query string, runs it against the route's collection and attaches the
//! resulting [`AdvancedResults`] to the request extensions.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use devcamper_core::{translate_with, AdvancedResults, Expansion, TranslateOptions};

use super::AppState;
use crate::error::ApiError;
use crate::network::extract::query_params;
use crate::service::ResultExecutor;

/// Middleware state for one list route.
#[derive(Clone)]
pub struct ResultsRoute {
    executor: ResultExecutor,
    options: TranslateOptions,
    collection: &'static str,
    expansions: Vec<Expansion>,
}

impl ResultsRoute {
    #[must_use]
    pub fn new(state: &AppState, collection: &'static str) -> Self {
        Self {
            executor: state.results.clone(),
            options: state.query,
            collection,
            expansions: Vec::new(),
        }
    }

    /// Inlines `expansion` into every listed record.
    #[must_use]
    pub fn expanding(mut self, expansion: Expansion) -> Self {
        self.expansions.push(expansion);
        self
    }
}

/// Runs the route's query and stores the page in the request extensions
/// before calling the next handler.
pub async fn advanced_results(
    State(route): State<ResultsRoute>,
    mut request: Request,
    next: Next,
) -> Response {
    let params = query_params(request.uri());
    let descriptor = translate_with(&params, &route.options).with_expansions(route.expansions.clone());

    match route.executor.execute(route.collection, &descriptor).await {
        Ok(page) => {
            request.extensions_mut().insert(AdvancedResults::from(page));
            next.run(request).await
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

/// Sends the results attached by [`advanced_results`].
pub async fn send_results(Extension(results): Extension<AdvancedResults>) -> Json<AdvancedResults> {
    Json(results)
}
