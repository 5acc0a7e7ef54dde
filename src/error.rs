//! Error types for LibRent server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Out of stock: {0}")]
    OutOfStock(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error("Payment session error: {0}")]
    PaymentSession(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable reason included in every error body
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Authentication(_) => "authentication_failed",
            AppError::Authorization(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::Conflict(_) => "conflict",
            AppError::OutOfStock(_) => "out_of_stock",
            AppError::InvalidSignature(_) => "invalid_signature",
            AppError::MalformedPayload(_) => "malformed_payload",
            AppError::PaymentSession(_) => "payment_session_failed",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error. Borrowing rule violations (conflict,
    /// out-of-stock) are user-correctable and answered with 400 like plain
    /// validation failures.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::Conflict(_)
            | AppError::OutOfStock(_)
            | AppError::InvalidSignature(_)
            | AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::PaymentSession(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            error: self.reason().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_borrowing_rule_violations_are_bad_requests() {
        assert_eq!(
            AppError::Conflict("active borrowing".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::OutOfStock("inventory exhausted".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Validation("past date".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_gateway_failure_is_bad_gateway() {
        let err = AppError::PaymentSession("session create failed".into());
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.reason(), "payment_session_failed");
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(
            AppError::NotFound("no such borrowing".into()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
