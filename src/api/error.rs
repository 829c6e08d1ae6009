use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

use crate::export::ExportError;
use crate::manager::ManagerError;

use super::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("resolution failed: {0}")]
    ResolutionFailed(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::ResolutionFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::ResolutionFailed(_) => "RESOLUTION_FAILED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(json!(body))).into_response()
    }
}

impl From<ManagerError> for ApiError {
    fn from(value: ManagerError) -> Self {
        match value {
            ManagerError::Validation(msg) => ApiError::InvalidPayload(msg),
            ManagerError::Resolution(e) => ApiError::from(e),
            ManagerError::NotFound(id) => ApiError::NotFound(format!("job {id}")),
            e @ ManagerError::NotCancellable { .. } => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<crate::resolver::ResolveError> for ApiError {
    fn from(value: crate::resolver::ResolveError) -> Self {
        use crate::resolver::ResolveError;
        match value {
            ResolveError::InvalidSource(_) | ResolveError::Rejected(_) => {
                ApiError::InvalidPayload(value.to_string())
            }
            ResolveError::RequestFailed(_) => ApiError::ResolutionFailed(value.to_string()),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(value: ExportError) -> Self {
        match value {
            ExportError::NotExportable => ApiError::Conflict(value.to_string()),
            ExportError::Missing(_) => ApiError::Conflict(value.to_string()),
            ExportError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}
