//! Error types for the consultation service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::BookingStatus;

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Failures talking to the payment gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway rejected the request: {code}: {description}")]
    Rejected { code: String, description: String },

    #[error("Gateway unreachable: {0}")]
    Transport(String),

    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),

    #[error("Gateway not configured: {0}")]
    NotConfigured(&'static str),
}

/// A single failed input check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "email")]
    pub field: String,
    #[schema(example = "Please provide a valid email address")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application-level errors (for HTTP responses).
///
/// Each variant carries the machine-readable code clients switch on.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Booking cannot be paid in status {0}")]
    InvalidBookingStatus(BookingStatus),

    #[error("{0}")]
    InvalidSignature(String),

    #[error("{0}")]
    InvalidPayload(String),

    #[error("{0}")]
    PaymentMismatch(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("Access denied. No token provided.")]
    NoToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Webhook processing failed: {0}")]
    Webhook(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a single-field validation failure.
    pub fn field(field: &str, message: &str) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    /// Error code sent in the `error` field of the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::InvalidBookingStatus(_) => "INVALID_BOOKING_STATUS",
            AppError::InvalidSignature(_) => "INVALID_SIGNATURE",
            AppError::InvalidPayload(_) => "INVALID_PAYLOAD",
            AppError::PaymentMismatch(_) => "PAYMENT_MISMATCH",
            AppError::Duplicate(_) => "DUPLICATE_ENTRY",
            AppError::NoToken => "NO_TOKEN",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Gateway(_) => "GATEWAY_ERROR",
            AppError::Webhook(_) => "WEBHOOK_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(DomainError::ValidationError(msg)) => AppError::BadRequest(msg),
            RepoError::Domain(DomainError::InvalidPayload(msg)) => AppError::InvalidPayload(msg),
            RepoError::Domain(e) => AppError::BadRequest(e.to_string()),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Duplicate(e),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Gateway(err.to_string())
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        RepoError::Domain(err).into()
    }
}
