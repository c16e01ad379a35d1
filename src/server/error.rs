//! HTTP mapping for engine errors.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, ValidationError};

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            SyncError::Authentication(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            SyncError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            SyncError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: self.error_code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for SyncError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::Malformed(rejection.body_text()).into()
    }
}

impl From<QueryRejection> for SyncError {
    fn from(rejection: QueryRejection) -> Self {
        ValidationError::Malformed(rejection.body_text()).into()
    }
}
