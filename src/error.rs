//! Error handling module
//!
//! Centralized error types, result status codes and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::cache::CacheError;
use crate::domain::DomainError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Status code carried by every response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum ResultStatus {
    Ok = 0,
    Empty = 1,
    NotExisted = 2,
    Repeated = 3,
    DbException = 4,
}

impl From<ResultStatus> for u8 {
    fn from(status: ResultStatus) -> Self {
        status as u8
    }
}

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Empty input: {0}")]
    EmptyInput(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Domain(e) => AppError::Domain(e),
            CacheError::Store(e) => AppError::Store(e),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: ResultStatus,
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl AppError {
    /// Result status, HTTP status and machine code of this error
    pub fn classify(&self) -> (ResultStatus, StatusCode, &'static str) {
        match self {
            // 400 Bad Request
            AppError::EmptyInput(_) => (ResultStatus::Empty, StatusCode::BAD_REQUEST, "empty_input"),

            AppError::Domain(domain_err) => match domain_err {
                DomainError::Validation(_) => {
                    (ResultStatus::Empty, StatusCode::BAD_REQUEST, "validation_failed")
                }
                DomainError::UnknownKey(_) => {
                    (ResultStatus::Empty, StatusCode::BAD_REQUEST, "unknown_key")
                }
                DomainError::InvalidValue { .. } => {
                    (ResultStatus::Empty, StatusCode::BAD_REQUEST, "invalid_value")
                }
                DomainError::Unsupported(_) => {
                    (ResultStatus::Empty, StatusCode::BAD_REQUEST, "unsupported")
                }

                // 404 Not Found
                DomainError::NotFound { .. } => {
                    (ResultStatus::NotExisted, StatusCode::NOT_FOUND, "not_found")
                }

                // 409 Conflict
                DomainError::NameRepeated { .. } => {
                    (ResultStatus::Repeated, StatusCode::CONFLICT, "name_repeated")
                }
                DomainError::MasterUsed(_) => {
                    (ResultStatus::Repeated, StatusCode::CONFLICT, "master_used")
                }
                DomainError::SerialRepeated(_) => {
                    (ResultStatus::Repeated, StatusCode::CONFLICT, "serial_repeated")
                }
                DomainError::AlreadyMember(_) => {
                    (ResultStatus::Repeated, StatusCode::CONFLICT, "already_member")
                }
                DomainError::NotMember(_) => {
                    (ResultStatus::Repeated, StatusCode::CONFLICT, "not_member")
                }
                DomainError::HasChildren(_) => {
                    (ResultStatus::Repeated, StatusCode::CONFLICT, "has_children")
                }
            },

            // 503 for a store that timed out, 404 for a write to a missing row
            AppError::Store(StoreError::Timeout) => {
                (ResultStatus::DbException, StatusCode::SERVICE_UNAVAILABLE, "store_timeout")
            }
            AppError::Store(StoreError::NotFound { .. }) => {
                (ResultStatus::NotExisted, StatusCode::NOT_FOUND, "not_found")
            }

            // 500 Internal Server Error
            AppError::Store(_) | AppError::Database(_) => {
                (ResultStatus::DbException, StatusCode::INTERNAL_SERVER_ERROR, "database_error")
            }
            AppError::Internal(_) => {
                (ResultStatus::DbException, StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            AppError::Config(_) => {
                (ResultStatus::DbException, StatusCode::INTERNAL_SERVER_ERROR, "config_error")
            }
        }
    }

    /// Whether the caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Store(e) if e.is_retryable())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, status, error_code) = self.classify();

        if status.is_server_error() {
            tracing::error!(error = ?self, error_code, "Request failed");
        }

        let body = ErrorResponse {
            code,
            error: self.to_string(),
            error_code: error_code.to_string(),
            retryable: status == StatusCode::SERVICE_UNAVAILABLE && self.is_retryable(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err: AppError = DomainError::not_found("scene", "abc").into();
        let (code, status, error_code) = err.classify();
        assert_eq!(code, ResultStatus::NotExisted);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_code, "not_found");
    }

    #[test]
    fn test_conflicts_map_to_repeated() {
        let err: AppError = DomainError::name_repeated("group", "Sales").into();
        assert_eq!(err.classify().0, ResultStatus::Repeated);
        assert_eq!(err.classify().1, StatusCode::CONFLICT);

        let err: AppError = DomainError::AlreadyMember("u1".into()).into();
        assert_eq!(err.classify().0, ResultStatus::Repeated);
    }

    #[test]
    fn test_unknown_key_is_empty_input() {
        let err: AppError = DomainError::UnknownKey("colour".into()).into();
        assert_eq!(err.classify().0, ResultStatus::Empty);
        assert_eq!(err.classify().1, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_timeout_is_retryable() {
        let err: AppError = CacheError::Store(StoreError::Timeout).into();
        let (code, status, _) = err.classify();
        assert_eq!(code, ResultStatus::DbException);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_cache_error_keeps_domain_kind() {
        let err: AppError = CacheError::Domain(DomainError::MasterUsed("u1".into())).into();
        assert!(matches!(err, AppError::Domain(DomainError::MasterUsed(_))));
    }

    #[test]
    fn test_result_status_serializes_as_number() {
        let json = serde_json::to_string(&ResultStatus::DbException).unwrap();
        assert_eq!(json, "4");
    }
}
