//! REST API handlers.
//!
//! Each handler reads/writes via `StateStore` and returns JSON responses.
//! Resource changes are handed to the controller as queue triggers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::info;

use rebalancer_core::ResourceKey;
use rebalancer_state::{Rebalance, RecordSet};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Rebalances ─────────────────────────────────────────────────

/// GET /api/v1/rebalances
pub async fn list_rebalances(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_rebalances() {
        Ok(resources) => ApiResponse::ok(resources).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /api/v1/rebalances/{namespace}/{name}
pub async fn get_rebalance(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.store.get_rebalance(&ResourceKey::new(namespace, name)) {
        Ok(Some(resource)) => ApiResponse::ok(resource).into_response(),
        Ok(None) => error_response("rebalance not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// PUT /api/v1/rebalances
///
/// Creates or replaces the spec; a stored status is kept.
pub async fn apply_rebalance(
    State(state): State<ApiState>,
    Json(resource): Json<Rebalance>,
) -> impl IntoResponse {
    if resource.metadata.name.trim().is_empty() || resource.metadata.namespace.trim().is_empty() {
        return error_response("metadata.name and metadata.namespace are required", StatusCode::BAD_REQUEST)
            .into_response();
    }

    match state.store.apply_rebalance(&resource) {
        Ok(stored) => {
            let key = stored.key();
            info!(resource = %key, "rebalance applied");
            state.queue.add(key);
            ApiResponse::ok(stored).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// DELETE /api/v1/rebalances/{namespace}/{name}
pub async fn delete_rebalance(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let key = ResourceKey::new(namespace, name);
    match state.store.delete_rebalance(&key) {
        Ok(true) => {
            info!(resource = %key, "rebalance deleted");
            // The next pass finds nothing and clears the gauges.
            state.queue.add(key);
            ApiResponse::ok("deleted").into_response()
        }
        Ok(false) => error_response("rebalance not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Record sets ────────────────────────────────────────────────

/// GET /api/v1/zones/{zone}/recordsets
pub async fn list_record_sets(
    State(state): State<ApiState>,
    Path(zone): Path<String>,
) -> impl IntoResponse {
    match state.store.list_record_sets(&zone) {
        Ok(records) => ApiResponse::ok(records).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// PUT /api/v1/zones/{zone}/recordsets
///
/// Names are stored fully qualified.
pub async fn put_record_set(
    State(state): State<ApiState>,
    Path(zone): Path<String>,
    Json(mut record): Json<RecordSet>,
) -> impl IntoResponse {
    let name = record.name.trim().to_string();
    if name.is_empty() || record.record_type.trim().is_empty() {
        return error_response("name and type are required", StatusCode::BAD_REQUEST).into_response();
    }
    record.name = if name.ends_with('.') { name } else { format!("{name}.") };

    match state.store.put_record_set(&zone, &record) {
        Ok(()) => ApiResponse::ok(record).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        state.gauges.render_prometheus(),
    )
}
