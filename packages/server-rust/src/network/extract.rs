//! Request extractors: caller identity, JSON bodies and raw query parameters.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use axum::Json;
use devcamper_core::{Document, Principal, QueryParams, RequestContext, Role};

use super::middleware::REQUEST_ID_HEADER;
use crate::error::ApiError;

/// Header carrying the authenticated user id, set by the upstream gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Per-request context built from trusted identity headers.
///
/// No identity headers means an anonymous caller. An id without a valid
/// role (or the reverse) is rejected with 401.
#[derive(Debug, Clone)]
pub struct Caller(pub RequestContext);

impl Caller {
    /// Builds the context from request headers.
    ///
    /// # Errors
    ///
    /// [`ApiError::Unauthenticated`] when the identity headers are partial or
    /// name an unknown role.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        let request_id = header(REQUEST_ID_HEADER).unwrap_or("-").to_string();

        match (header(USER_ID_HEADER), header(USER_ROLE_HEADER)) {
            (None, None) => Ok(Caller(RequestContext::anonymous(request_id))),
            (Some(id), Some(role)) => {
                let role: Role = role.parse().map_err(|_| ApiError::Unauthenticated)?;
                Ok(Caller(RequestContext::authenticated(
                    request_id,
                    Principal::new(id, role),
                )))
            }
            _ => Err(ApiError::Unauthenticated),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Caller::from_headers(&parts.headers)
    }
}

/// JSON object body. Malformed or non-object bodies are a 400 in the API's
/// error format rather than axum's plain-text rejection.
#[derive(Debug, Clone)]
pub struct JsonBody(pub Document);

impl<S: Send + Sync> FromRequest<S> for JsonBody {
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Document>::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(JsonBody(body))
    }
}

/// Groups the URI's query pairs by key. Repeated keys keep every value.
///
/// An undecodable query string is treated as empty.
#[must_use]
pub fn query_params(uri: &Uri) -> QueryParams {
    match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(pairs)) => pairs.into_iter().collect(),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "ignoring undecodable query string");
            QueryParams::new()
        }
    }
}
