//! Structured API error responses with error codes
//!
//! Every failure leaving the HTTP surface carries a stable machine-readable
//! code, a numeric code grouped by category and a human-readable message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::access::AuthError;
use crate::infra::LedgerError;

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication errors (1xxx)
    /// No authentication credentials provided
    AuthRequired,
    /// Invalid API key format or value
    InvalidApiKey,
    /// Caller address header is not a valid address
    InvalidCallerAddress,
    /// Caller lacks the role or ownership the operation needs
    InsufficientPermissions,

    // Rate limiting errors (2xxx)
    RateLimitExceeded,

    // Validation errors (3xxx)
    /// Request body is malformed
    InvalidRequestBody,
    /// Field value is invalid
    InvalidFieldValue,

    // Resource errors (4xxx)
    ResourceNotFound,

    // Conflict errors (5xxx)
    /// Batch or user already exists
    AlreadyExists,

    // Lifecycle errors (7xxx)
    /// Batch status or registry state does not allow the operation
    InvalidStateTransition,
    /// Ledger writes are paused by an administrator
    LedgerPaused,

    // Server errors (8xxx)
    DatabaseError,
    /// Journal replay found an entry that does not fit
    JournalCorrupted,
    ServiceUnavailable,
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::AuthRequired => 1001,
            ErrorCode::InvalidApiKey => 1002,
            ErrorCode::InvalidCallerAddress => 1003,
            ErrorCode::InsufficientPermissions => 1005,

            ErrorCode::RateLimitExceeded => 2001,

            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::InvalidFieldValue => 3003,

            ErrorCode::ResourceNotFound => 4001,

            ErrorCode::AlreadyExists => 5004,

            ErrorCode::InvalidStateTransition => 7001,
            ErrorCode::LedgerPaused => 7002,

            ErrorCode::DatabaseError => 8001,
            ErrorCode::ServiceUnavailable => 8002,
            ErrorCode::JournalCorrupted => 8003,
            ErrorCode::InternalError => 8999,
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::AuthRequired | ErrorCode::InvalidApiKey | ErrorCode::InvalidCallerAddress => {
                StatusCode::UNAUTHORIZED
            }
            ErrorCode::InsufficientPermissions => StatusCode::FORBIDDEN,
            ErrorCode::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InvalidRequestBody | ErrorCode::InvalidFieldValue => StatusCode::BAD_REQUEST,
            ErrorCode::ResourceNotFound => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists | ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,
            ErrorCode::LedgerPaused | ErrorCode::ServiceUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorCode::DatabaseError | ErrorCode::JournalCorrupted | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code_str = match self {
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::InvalidApiKey => "INVALID_API_KEY",
            ErrorCode::InvalidCallerAddress => "INVALID_CALLER_ADDRESS",
            ErrorCode::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::LedgerPaused => "LEDGER_PAUSED",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::JournalCorrupted => "JOURNAL_CORRUPTED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", code_str)
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

/// Structured error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Seconds until a rate-limited caller may retry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,

    /// Related resource ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
                retry_after: None,
                resource_id: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.error.retry_after = Some(seconds);
        self
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        // Add error code header for easier debugging
        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(msg) => ApiError::new(ErrorCode::ResourceNotFound, msg),
            LedgerError::Unauthorized(msg) => {
                ApiError::new(ErrorCode::InsufficientPermissions, msg)
            }
            LedgerError::InvalidInput(msg) => ApiError::new(ErrorCode::InvalidFieldValue, msg),
            LedgerError::AlreadyExists(msg) => ApiError::new(ErrorCode::AlreadyExists, msg),
            LedgerError::InvalidStateTransition(msg) => {
                ApiError::new(ErrorCode::InvalidStateTransition, msg)
            }
            LedgerError::Paused => {
                ApiError::new(ErrorCode::LedgerPaused, "ledger writes are paused")
            }
            LedgerError::Database(e) => {
                tracing::error!(error = %e, "database error");
                ApiError::new(ErrorCode::DatabaseError, "database error")
            }
            LedgerError::JournalCorrupted { sequence, reason } => {
                tracing::error!(sequence, reason = %reason, "journal corrupted");
                ApiError::new(ErrorCode::JournalCorrupted, "journal corrupted")
                    .with_details(serde_json::json!({ "sequence": sequence }))
            }
            LedgerError::Serialization(e) => {
                ApiError::new(ErrorCode::InternalError, format!("serialization error: {e}"))
            }
            LedgerError::Configuration(msg) | LedgerError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                ApiError::new(ErrorCode::InternalError, msg)
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::MissingAuth => ApiError::new(ErrorCode::AuthRequired, message),
            AuthError::InvalidApiKey => ApiError::new(ErrorCode::InvalidApiKey, message),
            AuthError::InvalidCallerAddress(_) => {
                ApiError::new(ErrorCode::InvalidCallerAddress, message)
            }
            AuthError::RateLimited => {
                ApiError::new(ErrorCode::RateLimitExceeded, message).with_retry_after(60)
            }
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a validation error with field details
pub fn validation_error(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InvalidFieldValue, message.into())
        .with_details(serde_json::json!({ "field": field }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_numeric() {
        assert_eq!(ErrorCode::AuthRequired.numeric_code(), 1001);
        assert_eq!(ErrorCode::RateLimitExceeded.numeric_code(), 2001);
        assert_eq!(ErrorCode::InvalidRequestBody.numeric_code(), 3001);
        assert_eq!(ErrorCode::ResourceNotFound.numeric_code(), 4001);
        assert_eq!(ErrorCode::AlreadyExists.numeric_code(), 5004);
        assert_eq!(ErrorCode::InvalidStateTransition.numeric_code(), 7001);
        assert_eq!(ErrorCode::DatabaseError.numeric_code(), 8001);
        assert_eq!(ErrorCode::InternalError.numeric_code(), 8999);
    }

    #[test]
    fn test_ledger_error_mapping() {
        let cases = [
            (LedgerError::not_found("batch B"), StatusCode::NOT_FOUND),
            (LedgerError::unauthorized("nope"), StatusCode::FORBIDDEN),
            (LedgerError::invalid_input("bad"), StatusCode::BAD_REQUEST),
            (
                LedgerError::AlreadyExists("batch B".into()),
                StatusCode::CONFLICT,
            ),
            (
                LedgerError::invalid_transition("sold"),
                StatusCode::CONFLICT,
            ),
            (LedgerError::Paused, StatusCode::SERVICE_UNAVAILABLE),
            (
                LedgerError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(
            ApiError::from(AuthError::MissingAuth).status(),
            StatusCode::UNAUTHORIZED
        );
        let limited = ApiError::from(AuthError::RateLimited);
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.error.retry_after, Some(60));
    }

    #[test]
    fn test_validation_error() {
        let error = validation_error("address", "invalid address");
        assert_eq!(error.error.code, ErrorCode::InvalidFieldValue);
        assert_eq!(error.error.details.unwrap()["field"], "address");
    }

    #[test]
    fn test_error_serialization() {
        let error = ApiError::new(ErrorCode::ResourceNotFound, "batch B1 does not exist");
        let json = serde_json::to_string(&error).unwrap();

        assert!(json.contains("RESOURCE_NOT_FOUND"));
        assert!(json.contains("4001"));
        assert!(!json.contains("retry_after"));
    }
}
