//! HTTP handlers for the ingestion API.

use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;
use tracing::debug;

use super::dto::{CaptureResponse, HealthResponse, STATUS_DB_DOWN, STATUS_OK};
use super::error::AppError;
use super::state::AppState;
use crate::models::LogEntry;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// GET /health
///
/// Always 200; reports `db_down` while the store is unavailable.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.store.is_available() {
        STATUS_OK
    } else {
        STATUS_DB_DOWN
    };

    Json(HealthResponse {
        status: status.to_string(),
    })
}

/// POST /log
///
/// Validates the body, stamps a missing timestamp and appends one document.
/// The body is parsed regardless of `Content-Type`.
pub async fn handle_log(
    State(state): State<AppState>,
    body: Bytes,
) -> HandlerResult<CaptureResponse> {
    let mut entry = LogEntry::from_json(&body).map_err(|e| {
        debug!("Rejected log payload: {}", e);
        AppError::from(e)
    })?;

    entry.stamp(Utc::now());

    state.store.save(&entry).await.map_err(|e| {
        debug!(
            store = state.store.name(),
            event_type = %entry.event_type,
            "Store write failed"
        );
        AppError::from(e)
    })?;

    Ok(Json(CaptureResponse::captured()))
}
