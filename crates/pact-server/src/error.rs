//! Error types for the registration server.

use crate::forms::ValidationErrors;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use registration_number::AllocationError;
use registration_store::StoreError;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Server error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Submitted data is invalid")]
    Validation(ValidationErrors),

    #[error("Could not complete registration, please retry")]
    RegistrationConflict,

    #[error("Registration is closed")]
    RegistrationClosed,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED"),
            ApiError::RegistrationConflict => (StatusCode::CONFLICT, "REGISTRATION_CONFLICT"),
            ApiError::RegistrationClosed => (StatusCode::FORBIDDEN, "REGISTRATION_CLOSED"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        };

        let fields = match &self {
            ApiError::Validation(errors) => Some(errors.fields().clone()),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            fields,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        ApiError::Validation(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::UniquenessConflict { field, value } => {
                ApiError::Conflict(format!("{} {} already exists", field, value))
            }
            StoreError::InvalidRecord(msg) => ApiError::BadRequest(msg),
            StoreError::Io(e) => ApiError::Storage(e.to_string()),
            StoreError::Serialization(e) => {
                ApiError::Storage(format!("JSON serialization error: {}", e))
            }
        }
    }
}

impl From<AllocationError> for ApiError {
    fn from(e: AllocationError) -> Self {
        match e {
            AllocationError::Conflict { .. } => ApiError::RegistrationConflict,
            AllocationError::Store(e) => e.into(),
        }
    }
}
