use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use capsule_types::api::ErrorResponse;

pub const CAPSULE_NOT_FOUND: &str = "Capsule not found";
pub const CAPSULE_PRIVATE: &str = "This capsule is private";

/// Every way a request can fail. Nothing is retried; the error ends the request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound(CAPSULE_NOT_FOUND.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Validation(msg) | ApiError::Forbidden(msg) | ApiError::NotFound(msg) => msg,
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                "Internal server error".to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
