//! Error types for the account service

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the account lifecycle operations
#[derive(Error, Debug)]
pub enum AccountError {
    /// Username or email already taken; carries the conflicting field
    #[error("An account with this {0} already exists")]
    Conflict(&'static str),

    /// Login or old-password check failed. Never says why.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, expired or revoked session token
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Unknown, used or expired password reset token
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Malformed input
    #[error("{0}")]
    Validation(String),

    /// Too many login attempts
    #[error("Too many attempts, try again later")]
    TooManyRequests,

    /// The gateway declined the charge
    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    /// The payment gateway failed or is not configured
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// Storage or infrastructure failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<common::error::DatabaseError> for AccountError {
    fn from(err: common::error::DatabaseError) -> Self {
        AccountError::Internal(err.into())
    }
}

impl From<common::error::CacheError> for AccountError {
    fn from(err: common::error::CacheError) -> Self {
        AccountError::Internal(err.into())
    }
}

impl From<JsonRejection> for AccountError {
    fn from(rejection: JsonRejection) -> Self {
        AccountError::Validation(rejection.body_text())
    }
}

impl AccountError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AccountError::Conflict(_) => StatusCode::CONFLICT,
            AccountError::InvalidCredentials | AccountError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            AccountError::InvalidToken | AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AccountError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            AccountError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AccountError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AccountError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            AccountError::Gateway(e) => {
                error!("Payment gateway error: {}", e);
                "Payment gateway unavailable".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for account service results
pub type AccountResult<T> = Result<T, AccountError>;
