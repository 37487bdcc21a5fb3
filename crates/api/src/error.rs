//! Translates internal error types into HTTP responses (spec.md §7).
//! Kept close to the teacher's `ApiError` → `IntoResponse` shape
//! (`crates/api/src/error.rs`), with the chat-app `DaoError`/
//! `AuthError`/`OAuthError` conversions replaced by this crate's
//! `memoire_services::dao::DaoError` and `IntegrityError`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use memoire_services::dao::DaoError;
use memoire_services::integrity::IntegrityError;
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => ApiError::NotFound("resource not found".to_string()),
            DaoError::DuplicateKey(msg) => ApiError::BadRequest(msg),
            DaoError::Validation(msg) => ApiError::BadRequest(msg),
            DaoError::Sqlx(e) => ApiError::Internal(e.to_string()),
        }
    }
}

/// `IntegrityChainDivergence` (spec.md §7): detected only on
/// verification, surfaced to the operator via the trail endpoint rather
/// than retried or auto-repaired.
impl From<IntegrityError> for ApiError {
    fn from(err: IntegrityError) -> Self {
        match err {
            IntegrityError::Dao(e) => e.into(),
            IntegrityError::Divergence { segment_id, event_id } => ApiError::Internal(format!(
                "integrity chain diverged for segment {segment_id} at event {event_id}"
            )),
        }
    }
}
