//! Errors returned by the document API.
//!
//! Every error renders as `{"error": ..., "details"?: ...}` with a status
//! code from [`AppError::status`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("Document body must be a JSON object")]
    NotAnObject,

    #[error("No document for account {0}")]
    DocumentNotFound(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidAccountId(_) | AppError::NotAnObject => StatusCode::BAD_REQUEST,
            AppError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::Database(e) => {
                // Driver messages stay in the log
                tracing::error!(error = ?e, "document query failed");
                ErrorResponse {
                    error: "Database error".to_string(),
                    details: None,
                }
            }
            AppError::InvalidAccountId(reason) => ErrorResponse {
                error: "Invalid account id".to_string(),
                details: Some(reason.clone()),
            },
            other => ErrorResponse {
                error: other.to_string(),
                details: None,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
