//! HTTP middleware for the `DevCamper` server.
//!
//! Layers are listed outermost first: the first layer sees the request first
//! and the response last.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::GovernorLayer;
use tracing::warn;

use super::config::{NetworkConfig, RateLimit};
use super::shutdown::ShutdownController;
use crate::error::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Wraps `router` in the transport middleware stack.
///
/// 1. `SetRequestId`: assigns a UUID `x-request-id` unless the client sent one
/// 2. `Trace`: one span per request carrying method, URI and request id
/// 3. `Compression`: gzip responses
/// 4. `CORS`: configured origins, REST methods
/// 5. Security headers: `nosniff`, `DENY` framing, `no-referrer`
/// 6. `Timeout`: 503 once `request_timeout` passes
/// 7. `PropagateRequestId`: echoes `x-request-id` on the response
/// 8. `Governor`: 429 once a client IP exhausts its [`RateLimit`]
///
/// Body extractors reject payloads above `body_limit` with 413.
pub fn apply_http_layers<S>(router: Router<S>, config: &NetworkConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http",
                method = %request.method(),
                uri = %request.uri(),
                request_id,
            )
        }))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(x_request_id));

    let router = router.layer(DefaultBodyLimit::max(config.body_limit));
    apply_rate_limit(router, config.rate_limit).layer(layers)
}

/// Adds the per-IP governor when `limit` is set. The key is taken from
/// `x-forwarded-for`, `x-real-ip` or `forwarded`, then the peer address.
fn apply_rate_limit<S>(router: Router<S>, limit: Option<RateLimit>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let Some(limit) = limit else {
        return router;
    };
    let Some(config) = GovernorConfigBuilder::default()
        .period(limit.period)
        .burst_size(limit.burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
    else {
        warn!(?limit, "invalid rate limit, requests are not limited");
        return router;
    };
    router.layer(GovernorLayer {
        config: Arc::new(config),
    })
}

/// Builds the CORS layer. A `*` entry allows any origin; otherwise only the
/// listed origins that parse as header values.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Admits API requests while the server accepts work and counts them as in
/// flight until the response is produced. Draining servers answer 503.
pub async fn admit_request(
    State(shutdown): State<Arc<ShutdownController>>,
    request: Request,
    next: Next,
) -> Response {
    if !shutdown.is_accepting() {
        return ApiError::Unavailable.into_response();
    }
    let _in_flight = shutdown.in_flight_guard();
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum::middleware::from_fn_with_state;
    use axum::routing::{get, post};
    use tower::ServiceExt;

    use super::*;

    fn router(config: &NetworkConfig, shutdown: Arc<ShutdownController>) -> Router {
        let inner = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/slow", get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                "late"
            }))
            .route("/echo", post(|body: String| async move { body }))
            .route_layer(from_fn_with_state(shutdown, admit_request));
        apply_http_layers(inner, config)
    }

    fn get_request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn responses_carry_request_id_and_security_headers() {
        let response = router(&NetworkConfig::default(), Arc::new(ShutdownController::new()))
            .oneshot(get_request("/ok"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert!(headers.contains_key(REQUEST_ID_HEADER));
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    }

    #[tokio::test]
    async fn client_request_id_is_echoed() {
        let request = Request::builder()
            .uri("/ok")
            .header(REQUEST_ID_HEADER, "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = router(&NetworkConfig::default(), Arc::new(ShutdownController::new()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "abc-123");
    }

    #[tokio::test]
    async fn slow_requests_time_out_with_503() {
        let config = NetworkConfig {
            request_timeout: Duration::from_millis(50),
            ..NetworkConfig::default()
        };
        let response = router(&config, Arc::new(ShutdownController::new()))
            .oneshot(get_request("/slow"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected() {
        let config = NetworkConfig {
            body_limit: 8,
            ..NetworkConfig::default()
        };
        let request = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .header(header::CONTENT_LENGTH, "32")
            .body(Body::from("x".repeat(32)))
            .unwrap();
        let response = router(&config, Arc::new(ShutdownController::new()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn draining_server_refuses_new_requests() {
        let shutdown = Arc::new(ShutdownController::new());
        shutdown.trigger_shutdown();
        let response = router(&NetworkConfig::default(), Arc::clone(&shutdown))
            .oneshot(get_request("/ok"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(shutdown.in_flight_count(), 0);
    }

    fn preflight(origin: &str) -> Request {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/ok")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn cors_wildcard_allows_any_origin() {
        let response = router(&NetworkConfig::default(), Arc::new(ShutdownController::new()))
            .oneshot(preflight("http://anywhere.test"))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn cors_list_allows_only_listed_origins() {
        let config = NetworkConfig {
            cors_origins: vec!["http://localhost:3000".to_string()],
            ..NetworkConfig::default()
        };
        let app = router(&config, Arc::new(ShutdownController::new()));

        let allowed = app.clone().oneshot(preflight("http://localhost:3000")).await.unwrap();
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );

        let denied = app.oneshot(preflight("http://evil.test")).await.unwrap();
        assert!(!denied.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    fn from_ip(ip: &str) -> Request {
        Request::builder()
            .uri("/ok")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn rate_limit_rejects_clients_over_budget() {
        let config = NetworkConfig {
            rate_limit: Some(RateLimit {
                period: Duration::from_secs(60),
                burst: 2,
            }),
            ..NetworkConfig::default()
        };
        let app = router(&config, Arc::new(ShutdownController::new()));

        for _ in 0..2 {
            let response = app.clone().oneshot(from_ip("10.0.0.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let limited = app.clone().oneshot(from_ip("10.0.0.1")).await.unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key(REQUEST_ID_HEADER));

        let other = app.oneshot(from_ip("10.0.0.2")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }
}
