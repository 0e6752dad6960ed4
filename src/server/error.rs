//! Error responses for the HTTP layer.
//!
//! This is the only place where pipeline errors are turned into something a
//! client sees. Bodies follow the `{"detail": "..."}` shape.

use crate::error::BloodworkError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request itself is unusable (wrong file type, missing field).
    #[error("{0}")]
    BadRequest(String),

    /// The analysis pipeline failed.
    #[error("Processing error: {0}")]
    Processing(#[from] BloodworkError),

    /// The upload could not be staged on disk.
    #[error("Failed to store upload: {0}")]
    Upload(#[source] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Processing(_) | ApiError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn bad_request_is_400() {
        let e = ApiError::BadRequest("Only PDF files are supported.".into());
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.to_string(), "Only PDF files are supported.");
    }

    #[test]
    fn processing_error_is_500_with_prefix() {
        let e = ApiError::from(BloodworkError::FileNotFound {
            path: PathBuf::from("uploads/x.pdf"),
        });
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(e.to_string().starts_with("Processing error: "));
    }
}
