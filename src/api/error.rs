//! Structured API error responses with error codes

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::retrieval::RetrievalError;

/// Error codes for API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing, malformed or too many proof ids
    InvalidArgument,
    /// Store or shard host failure
    InternalError,
}

impl ErrorCode {
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::InvalidArgument => 3001,
            ErrorCode::InternalError => 8999,
        }
    }

    /// HTTP status for this code. Invalid arguments answer 409, as existing
    /// clients of the proofs endpoint expect.
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidArgument => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,

    pub numeric_code: u32,

    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error.code;
        let mut response = (status, Json(self)).into_response();

        response.headers_mut().insert(
            HeaderName::from_static("x-error-code"),
            HeaderValue::from_static(code.as_str()),
        );

        response
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::InvalidArgument(msg) => ApiError::new(ErrorCode::InvalidArgument, msg),
            RetrievalError::Internal(msg) => ApiError::new(ErrorCode::InternalError, msg),
        }
    }
}
