//! Health check handler.
//!
//! Trimmed from the teacher's TDengine-ping version down to a Postgres ping, since this crate's
//! only durable dependency is the single `sqlx` pool; still follows the same "probe the real
//! dependency, never leak internals into the response" shape.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::ApiResponse;

#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    pub timestamp_ms: u64,
}

/// Health check endpoint.
///
/// Pings the Postgres pool (if configured) but never exposes connection details in the
/// response body.
///
/// - Healthy: 200 OK + `{code: 0, data: {timestamp_ms}}`
/// - Unhealthy: 503 Service Unavailable
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let now_ms = chrono::Utc::now().timestamp_millis() as u64;

    let healthy = match state.pg_db.as_ref() {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };

    if healthy {
        (
            StatusCode::OK,
            Json(ApiResponse::success(HealthResponse {
                timestamp_ms: now_ms,
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                code: 503,
                msg: "unavailable".to_string(),
                data: None,
            }),
        )
    }
}
