//! HTTP route handlers: health and the activity record endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use actlog_core::{Action, InvalidAction, Principal, RecordFilter, RecordId, RecordPatch, TransitionError};
use actlog_service::ServiceError;

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": actlog_core::ACTLOG_VERSION,
    });
    (StatusCode::OK, Json(response))
}

/// Render a service failure. Status codes:
/// NotFound 404, validation 400, Conflict 409, Storage 500.
pub(crate) fn service_error_response(err: ServiceError) -> Response {
    match err {
        ServiceError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not found").into_response(),
        ServiceError::InvalidAction(e) => invalid_action_response(&e),
        ServiceError::Transition(e) => {
            let body = match &e {
                TransitionError::InvalidStatusValue { .. } => serde_json::json!({
                    "error": e.to_string(),
                    "valid": TransitionError::valid_choices(),
                }),
                TransitionError::InvalidTransition { from, to, allowed } => serde_json::json!({
                    "error": e.to_string(),
                    "current": from,
                    "requested": to,
                    "allowed": allowed,
                }),
            };
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
        ServiceError::Conflict { .. } => {
            json_error(StatusCode::CONFLICT, &err.to_string()).into_response()
        }
        ServiceError::Storage(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal storage error").into_response()
        }
    }
}

fn invalid_action_response(e: &InvalidAction) -> Response {
    let body = serde_json::json!({
        "error": e.to_string(),
        "valid": e.valid_choices(),
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Parse a record id path segment. Anything that is not a `u64` cannot name
/// a record, so it answers like an absent one.
fn record_id(raw: &str) -> Result<RecordId, Response> {
    raw.parse::<u64>()
        .map(RecordId)
        .map_err(|_| json_error(StatusCode::NOT_FOUND, "not found").into_response())
}

/// Unwrap a JSON body, rendering extractor rejections as `{error}`.
fn json_body(body: Result<Json<serde_json::Value>, JsonRejection>) -> Result<serde_json::Value, Response> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(json_error(rejection.status(), &rejection.body_text()).into_response()),
    }
}

/// Stringify a JSON value for error messages; strings lose their quotes.
fn raw_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read an optional `metadata` field: absent -> None, null -> Some(None).
fn metadata_field(body: &serde_json::Map<String, serde_json::Value>) -> Option<Option<serde_json::Value>> {
    body.get("metadata").map(|v| match v {
        serde_json::Value::Null => None,
        other => Some(other.clone()),
    })
}

/// POST /records
///
/// `owner` and `status` in the body are ignored: the owner is the caller and
/// every record starts at `PENDING`.
pub(crate) async fn handle_create_record(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let parsed = match json_body(body) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let body = match parsed.as_object() {
        Some(b) => b,
        None => {
            return json_error(StatusCode::BAD_REQUEST, "request body must be a JSON object")
                .into_response()
        }
    };

    let action = match body.get("action") {
        Some(v) => raw_value(v),
        None => {
            return json_error(StatusCode::BAD_REQUEST, "missing 'action' field").into_response()
        }
    };
    let metadata = metadata_field(body).flatten();

    match state.service.create(&principal, &action, metadata).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => service_error_response(e),
    }
}

/// Query string for GET /records.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    action: Option<String>,
    created_at: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<RecordFilter, Response> {
        let action = match self.action.filter(|a| !a.is_empty()) {
            Some(a) => Some(a.parse::<Action>().map_err(|e| invalid_action_response(&e))?),
            None => None,
        };
        let created_at = match self.created_at.filter(|t| !t.is_empty()) {
            Some(t) => Some(OffsetDateTime::parse(&t, &Rfc3339).map_err(|_| {
                json_error(
                    StatusCode::BAD_REQUEST,
                    &format!("invalid 'created_at' filter '{}': expected RFC 3339", t),
                )
                .into_response()
            })?),
            None => None,
        };
        Ok(RecordFilter { action, created_at })
    }
}

/// GET /records
pub(crate) async fn handle_list_records(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> Response {
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(response) => return response,
    };

    match state.service.list(&principal, &filter).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => service_error_response(e),
    }
}

/// GET /records/{id}
pub(crate) async fn handle_get_record(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match record_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.service.get(id, &principal).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => service_error_response(e),
    }
}

/// PATCH /records/{id}
///
/// Only `action` and `metadata` are mutable here. A body naming `status` is
/// rejected outright: the transition endpoint is the only way to change it.
pub(crate) async fn handle_update_record(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(raw_id): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let id = match record_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let parsed = match json_body(body) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let body = match parsed.as_object() {
        Some(b) => b,
        None => {
            return json_error(StatusCode::BAD_REQUEST, "request body must be a JSON object")
                .into_response()
        }
    };

    if body.contains_key("status") {
        return json_error(
            StatusCode::BAD_REQUEST,
            &format!(
                "'status' cannot be changed by a field update; use PATCH /records/{}/transition",
                id
            ),
        )
        .into_response();
    }

    let action = match body.get("action") {
        Some(v) => match raw_value(v).parse::<Action>() {
            Ok(a) => Some(a),
            Err(e) => return invalid_action_response(&e),
        },
        None => None,
    };
    let patch = RecordPatch {
        action,
        metadata: metadata_field(body),
    };

    match state
        .service
        .update_fields(id, &principal, &patch)
        .await
    {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => service_error_response(e),
    }
}

/// DELETE /records/{id}
pub(crate) async fn handle_delete_record(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match record_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.service.delete(id, &principal).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => service_error_response(e),
    }
}

/// PATCH /records/{id}/transition
pub(crate) async fn handle_transition_record(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(raw_id): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let id = match record_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let parsed = match json_body(body) {
        Ok(v) => v,
        Err(response) => return response,
    };

    // A missing or non-string status still goes through the engine so it is
    // reported as an invalid status value, after the ownership check.
    let requested = parsed.get("status").map(raw_value).unwrap_or_default();

    match state
        .service
        .transition(id, &principal, &requested)
        .await
    {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => service_error_response(e),
    }
}
