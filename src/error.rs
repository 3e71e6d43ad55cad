// src/error.rs

use std::{collections::BTreeMap, fmt};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::StoreError;

/// Field name -> human readable messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request (malformed ids, query params, business rule violations)
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden (acting on a resource the caller does not own)
    Forbidden,

    // 404 Not Found
    NotFound,

    // 409 Conflict. Reserved for optimistic-concurrency failures.
    EditConflict,

    // 422 Unprocessable Entity
    ValidationFailed(FieldErrors),
}

impl AppError {
    pub fn invalid_credentials() -> Self {
        AppError::Unauthorized("invalid authentication credentials".to_string())
    }

    pub fn invalid_token() -> Self {
        AppError::Unauthorized("invalid or missing authentication token".to_string())
    }

    /// Single-field validation failure.
    pub fn field(field: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.to_string()]);
        AppError::ValidationFailed(fields)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
///
/// Runs inside the `TraceLayer` span, so internal errors are logged with the
/// request method and URI attached.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_body) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("the server encountered a problem and could not process your request"),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!(msg)),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!(msg)),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!("your user account doesn't have the necessary permissions to access this resource"),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                json!("the requested resource could not be found"),
            ),
            AppError::EditConflict => (
                StatusCode::CONFLICT,
                json!("unable to update the record due to an edit conflict, please try again"),
            ),
            AppError::ValidationFailed(fields) => (StatusCode::UNPROCESSABLE_ENTITY, json!(fields)),
        };
        let body = Json(json!({
            "error": error_body,
        }));

        (status, body).into_response()
    }
}

/// Store faults that reach a handler unclassified become 500s.
/// Handlers match on `StoreError` first wherever a kind carries meaning.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound,
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("is invalid ({})", e.code))
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        AppError::ValidationFailed(fields)
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
