//! HTTP server lifecycle: build the router, bind, serve, drain.
//!
//! `new()` wires shared state, `start()` binds the listener and `serve()`
//! accepts connections until the shutdown future resolves, then drains.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::handler::Handler;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, MethodRouter};
use axum::Router;
use devcamper_core::models::{bootcamp, course, review};
use devcamper_core::Expansion;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::resources::{
    bootcamp_courses, bootcamp_reviews, create_bootcamp, create_course, create_review,
    delete_bootcamp, delete_course, delete_review, get_bootcamp, get_course, get_review,
    update_bootcamp, update_course, update_review,
};
use super::handlers::{
    advanced_results, health_handler, liveness_handler, readiness_handler, send_results, AppState,
    ResultsRoute,
};
use super::middleware::{admit_request, apply_http_layers};
use super::shutdown::ShutdownController;

/// Prefix every API route is mounted under.
pub const API_PREFIX: &str = "/api/v1";

/// Expansion used by the course and review lists.
fn bootcamp_summary() -> Expansion {
    Expansion::new(
        course::BOOTCAMP,
        bootcamp::COLLECTION,
        [bootcamp::NAME, bootcamp::DESCRIPTION],
    )
}

/// `GET` returning [`advanced_results`] for `route`.
fn list_route(route: ResultsRoute) -> MethodRouter<AppState> {
    get(send_results.layer(from_fn_with_state(route, advanced_results)))
}

/// Resource routes, relative to [`API_PREFIX`].
fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/bootcamps",
            list_route(ResultsRoute::new(state, bootcamp::COLLECTION)).post(create_bootcamp),
        )
        .route(
            "/bootcamps/{id}",
            get(get_bootcamp).put(update_bootcamp).delete(delete_bootcamp),
        )
        .route("/bootcamps/{id}/courses", get(bootcamp_courses).post(create_course))
        .route("/bootcamps/{id}/reviews", get(bootcamp_reviews).post(create_review))
        .route(
            "/courses",
            list_route(ResultsRoute::new(state, course::COLLECTION).expanding(bootcamp_summary())),
        )
        .route(
            "/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route(
            "/reviews",
            list_route(ResultsRoute::new(state, review::COLLECTION).expanding(bootcamp_summary())),
        )
        .route(
            "/reviews/{id}",
            get(get_review).put(update_review).delete(delete_review),
        )
        .route_layer(from_fn_with_state(Arc::clone(&state.shutdown), admit_request))
}

/// Assembles the full application: health probes, the API, static files,
/// and the transport middleware around all of it.
pub fn build_router(state: AppState, config: &NetworkConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .nest(API_PREFIX, api_routes(&state));

    if let Some(dir) = &config.public_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    apply_http_layers(router, config).with_state(state)
}

/// Owns the listener and the shared state for one server run.
pub struct NetworkModule {
    config: NetworkConfig,
    state: AppState,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    #[must_use]
    pub fn new(config: NetworkConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            listener: None,
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.state.shutdown)
    }

    /// Binds the configured address and returns the bound port, which
    /// differs from the configured one when that is 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();
        info!(host = %self.config.host, port, "TCP listener bound");
        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves or the server fails, then drains
    /// in-flight requests for up to the configured drain timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called or the server hits a
    /// fatal I/O error. Draining happens either way.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let controller = Arc::clone(&self.state.shutdown);
        let router = build_router(self.state, &self.config);

        controller.set_ready();
        info!("serving HTTP connections");

        let stop = Arc::clone(&controller);
        let app = router.into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                stop.trigger_shutdown();
            })
            .await;

        drain(&controller, &self.config).await;
        result.map_err(Into::into)
    }
}

async fn drain(controller: &ShutdownController, config: &NetworkConfig) {
    controller.trigger_shutdown();
    if controller.wait_for_drain(config.drain_timeout).await {
        info!("all in-flight requests drained");
    } else {
        warn!(
            in_flight = controller.in_flight_count(),
            "drain timeout expired with requests still in flight"
        );
    }
}
