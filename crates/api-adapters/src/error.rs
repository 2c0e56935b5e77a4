//! HTTP error mapping.
//!
//! Every failure leaves the API as `{"message": ...}`; validation failures add
//! an `errors` array. Internal details are logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domains::errors::DomainError;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    /// The request could not be decoded (bad JSON, bad multipart, bad path).
    Rejected { status: StatusCode, message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn invalid_id() -> Self {
        Self::bad_request("Invalid id")
    }

    pub fn payload_too_large() -> Self {
        ApiError::Rejected {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "Request body too large".to_string(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Domain(err) => write!(f, "{err}"),
            ApiError::Rejected { status, message } => write!(f, "{status}: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Rejected { status, message } => {
                return (status, Json(json!({ "message": message }))).into_response();
            }
            ApiError::Domain(err) => err,
        };

        let (status, body) = match err {
            DomainError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "Validation failed", "errors": errors }),
            ),
            DomainError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            DomainError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "message": message }))
            }
            DomainError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, json!({ "message": message }))
            }
            err @ DomainError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, json!({ "message": err.to_string() }))
            }
            DomainError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
