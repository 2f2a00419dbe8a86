//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use tracing::error;

use super::dto::{ErrorResponse, SAVE_FAILED_MESSAGE};
use crate::db::RepositoryError;
use crate::models::EntryError;

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Invalid request body; the message is returned to the caller.
    BadRequest(String),
    /// Store failure; details stay in the server log.
    Storage(RepositoryError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Storage(e) => {
                error!("Failed to save log: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SAVE_FAILED_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<EntryError> for AppError {
    fn from(err: EntryError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Storage(err)
    }
}
