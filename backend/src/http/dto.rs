//! Response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

pub const STATUS_OK: &str = "ok";
pub const STATUS_DB_DOWN: &str = "db_down";
pub const STATUS_CAPTURED: &str = "captured";
/// Message returned for every storage failure.
pub const SAVE_FAILED_MESSAGE: &str = "failed to save log";

/// `GET /health` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok`, or `db_down` when running degraded
    pub status: String,
}

/// `POST /log` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResponse {
    pub status: String,
}

impl CaptureResponse {
    pub fn captured() -> Self {
        Self {
            status: STATUS_CAPTURED.to_string(),
        }
    }
}

/// Error body for 4xx/5xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
