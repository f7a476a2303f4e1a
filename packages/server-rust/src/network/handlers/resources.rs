//! Single-record and nested-list handlers for bootcamps, courses and reviews.

use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::Json;
use devcamper_core::{translate_with, AdvancedResults};
use serde_json::{json, Value};

use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::network::extract::{query_params, Caller, JsonBody};
use crate::service::ResourceKind;

type Envelope = Json<Value>;

fn envelope(data: impl Into<Value>) -> Envelope {
    Json(json!({ "success": true, "data": data.into() }))
}

async fn fetch(state: &AppState, kind: ResourceKind, id: &str) -> ApiResult<Envelope> {
    let doc = state.resources.get(kind, id).await?;
    Ok(envelope(doc))
}

async fn create(
    state: &AppState,
    caller: Caller,
    kind: ResourceKind,
    parent: Option<&str>,
    body: JsonBody,
) -> ApiResult<(StatusCode, Envelope)> {
    let created = state.resources.create(&caller.0, kind, parent, body.0).await?;
    Ok((StatusCode::CREATED, envelope(created)))
}

async fn update(
    state: &AppState,
    caller: Caller,
    kind: ResourceKind,
    id: &str,
    body: JsonBody,
) -> ApiResult<Envelope> {
    let updated = state.resources.update(&caller.0, kind, id, body.0).await?;
    Ok(envelope(updated))
}

async fn remove(state: &AppState, caller: Caller, kind: ResourceKind, id: &str) -> ApiResult<Envelope> {
    state.resources.delete(&caller.0, kind, id).await?;
    Ok(envelope(json!({})))
}

/// Lists a bootcamp's dependents, with the usual query parameters.
async fn list_for_bootcamp(
    state: &AppState,
    kind: ResourceKind,
    bootcamp_id: &str,
    uri: &Uri,
) -> ApiResult<Json<AdvancedResults>> {
    let Some(parent_ref) = kind.parent_ref() else {
        return Err(ApiError::BadRequest(format!(
            "{} records do not belong to a bootcamp",
            kind.label()
        )));
    };
    let descriptor = translate_with(&query_params(uri), &state.query).scoped_to(parent_ref, bootcamp_id);
    let page = state.results.execute(kind.collection(), &descriptor).await?;
    Ok(Json(AdvancedResults::from(page)))
}

// ---------------------------------------------------------------------------
// Bootcamps
// ---------------------------------------------------------------------------

pub async fn get_bootcamp(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Envelope> {
    fetch(&state, ResourceKind::Bootcamp, &id).await
}

pub async fn create_bootcamp(
    State(state): State<AppState>,
    caller: Caller,
    body: JsonBody,
) -> ApiResult<(StatusCode, Envelope)> {
    create(&state, caller, ResourceKind::Bootcamp, None, body).await
}

pub async fn update_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: Caller,
    body: JsonBody,
) -> ApiResult<Envelope> {
    update(&state, caller, ResourceKind::Bootcamp, &id, body).await
}

pub async fn delete_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: Caller,
) -> ApiResult<Envelope> {
    remove(&state, caller, ResourceKind::Bootcamp, &id).await
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

pub async fn bootcamp_courses(
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: Uri,
) -> ApiResult<Json<AdvancedResults>> {
    list_for_bootcamp(&state, ResourceKind::Course, &id, &uri).await
}

pub async fn create_course(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    caller: Caller,
    body: JsonBody,
) -> ApiResult<(StatusCode, Envelope)> {
    create(&state, caller, ResourceKind::Course, Some(&bootcamp_id), body).await
}

pub async fn get_course(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Envelope> {
    fetch(&state, ResourceKind::Course, &id).await
}

pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: Caller,
    body: JsonBody,
) -> ApiResult<Envelope> {
    update(&state, caller, ResourceKind::Course, &id, body).await
}

pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: Caller,
) -> ApiResult<Envelope> {
    remove(&state, caller, ResourceKind::Course, &id).await
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

pub async fn bootcamp_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: Uri,
) -> ApiResult<Json<AdvancedResults>> {
    list_for_bootcamp(&state, ResourceKind::Review, &id, &uri).await
}

pub async fn create_review(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    caller: Caller,
    body: JsonBody,
) -> ApiResult<(StatusCode, Envelope)> {
    create(&state, caller, ResourceKind::Review, Some(&bootcamp_id), body).await
}

pub async fn get_review(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Envelope> {
    fetch(&state, ResourceKind::Review, &id).await
}

pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: Caller,
    body: JsonBody,
) -> ApiResult<Envelope> {
    update(&state, caller, ResourceKind::Review, &id, body).await
}

pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: Caller,
) -> ApiResult<Envelope> {
    remove(&state, caller, ResourceKind::Review, &id).await
}
