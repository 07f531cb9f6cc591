//! HTTP error responses.
//!
//! Every failed request answers with a JSON body of the form
//! `{"error": {"type": "...", "message": "..."}}` and a status derived from
//! the [`ExecutorError`] variant.

use std::io;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use wasm_executor_common::ExecutorError;

/// Error returned by request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The registry rejected the request.
    Executor(ExecutorError),
    /// The server failed independently of the request.
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Executor(err) => status_for(err),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error type.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Executor(err) => error_type(err),
            Self::Internal(_) => "internal",
        }
    }
}

impl From<ExecutorError> for ApiError {
    fn from(err: ExecutorError) -> Self {
        Self::Executor(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_type = self.error_type();
        let message = match self {
            Self::Executor(err) => err.to_string(),
            Self::Internal(message) => message,
        };

        let body = serde_json::json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Map an [`ExecutorError`] to an HTTP status.
pub fn status_for(err: &ExecutorError) -> StatusCode {
    match err {
        ExecutorError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        ExecutorError::InstanceNotFound { .. } | ExecutorError::FunctionNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        ExecutorError::Load { source, .. } => match source.kind() {
            io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            io::ErrorKind::InvalidInput | io::ErrorKind::IsADirectory => StatusCode::BAD_REQUEST,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        },
        ExecutorError::Compile { .. }
        | ExecutorError::Validation { .. }
        | ExecutorError::Instantiation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ExecutorError::UnsupportedArity { .. }
        | ExecutorError::UnsupportedReturnArity { .. }
        | ExecutorError::UnsupportedType { .. }
        | ExecutorError::ArityMismatch { .. }
        | ExecutorError::InvalidInstanceId { .. } => StatusCode::BAD_REQUEST,
        ExecutorError::FuelExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
        ExecutorError::Trap { .. } | ExecutorError::InvalidConfig { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Map an [`ExecutorError`] to its `type` field.
pub fn error_type(err: &ExecutorError) -> &'static str {
    match err {
        ExecutorError::PermissionDenied { .. } => "permission_denied",
        ExecutorError::InstanceNotFound { .. } => "instance_not_found",
        ExecutorError::FunctionNotFound { .. } => "function_not_found",
        ExecutorError::Load { .. } => "load_failed",
        ExecutorError::Compile { .. }
        | ExecutorError::Validation { .. }
        | ExecutorError::Instantiation { .. } => "invalid_module",
        ExecutorError::UnsupportedArity { .. }
        | ExecutorError::UnsupportedReturnArity { .. }
        | ExecutorError::UnsupportedType { .. } => "unsupported_signature",
        ExecutorError::ArityMismatch { .. } => "arity_mismatch",
        ExecutorError::InvalidInstanceId { .. } => "invalid_instance_id",
        ExecutorError::Trap { .. } => "trap",
        ExecutorError::FuelExhausted { .. } => "fuel_exhausted",
        ExecutorError::InvalidConfig { .. } => "internal",
    }
}
