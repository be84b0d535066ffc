//! Error handling for the travel booking backend
//!
//! This module provides a unified error system with proper HTTP status mapping,
//! user-friendly messages, and structured error codes for client handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "BOOKING_NOT_FOUND")]
    BookingNotFound,
    #[serde(rename = "PAYMENT_NOT_FOUND")]
    PaymentNotFound,
    #[serde(rename = "PROPERTY_NOT_FOUND")]
    PropertyNotFound,
    #[serde(rename = "AMOUNT_MISMATCH")]
    AmountMismatch,
    #[serde(rename = "INVALID_AMOUNT")]
    InvalidAmount,
    #[serde(rename = "INVALID_DATE_RANGE")]
    InvalidDateRange,
    #[serde(rename = "UNAUTHENTICATED")]
    Unauthenticated,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // Gateway errors
    #[serde(rename = "GATEWAY_REJECTED")]
    GatewayRejected,
    #[serde(rename = "GATEWAY_UNAVAILABLE")]
    GatewayUnavailable,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
}

/// Domain lookups that came back empty (or belong to somebody else)
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Booking doesn't exist or isn't owned by the caller
    BookingNotFound { booking_id: String },
    /// No payment carries this transaction reference
    PaymentNotFound { tx_ref: String },
    /// Property doesn't exist
    PropertyNotFound { property_id: String },
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    /// Database connection or query failure
    Database { message: String, is_retryable: bool },
    /// Missing or invalid configuration
    Configuration { message: String },
    /// Anything else that went wrong on our side
    Internal { message: String },
}

/// Payment gateway errors
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// Gateway was reachable and explicitly declined
    GatewayRejected { gateway: String, message: String },
    /// Gateway unreachable, timed out or answered with garbage
    GatewayUnavailable { gateway: String, message: String },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Requested amount differs from the booking total
    AmountMismatch { expected: String, provided: String },
    /// Amount is not a positive decimal
    InvalidAmount { amount: String, reason: String },
    /// Check-out is not after check-in
    InvalidDateRange { start_date: String, end_date: String },
    /// Required field missing
    MissingField { field: String },
    /// Field present but unusable
    InvalidField { field: String, reason: String },
}

/// Authentication failures
#[derive(Debug, Clone)]
pub enum AuthenticationError {
    MissingToken,
    InvalidToken { reason: String },
    /// Gateway callback signature did not match
    InvalidSignature,
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
    Authentication(AuthenticationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Infrastructure(InfrastructureError::Internal {
            message: message.into(),
        }))
    }

    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Authentication(
            AuthenticationError::InvalidToken {
                reason: reason.into(),
            },
        ))
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::BookingNotFound { .. } => 404,
                DomainError::PaymentNotFound { .. } => 404,
                DomainError::PropertyNotFound { .. } => 404,
            },
            AppErrorKind::Infrastructure(_) => 500,
            // Both gateway outcomes leave a FAILED payment behind; the caller
            // sees a server-side failure either way.
            AppErrorKind::External(_) => 500,
            AppErrorKind::Validation(_) => 400,
            AppErrorKind::Authentication(_) => 401,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::BookingNotFound { .. } => ErrorCode::BookingNotFound,
                DomainError::PaymentNotFound { .. } => ErrorCode::PaymentNotFound,
                DomainError::PropertyNotFound { .. } => ErrorCode::PropertyNotFound,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
                InfrastructureError::Internal { .. } => ErrorCode::InternalError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::GatewayRejected { .. } => ErrorCode::GatewayRejected,
                ExternalError::GatewayUnavailable { .. } => ErrorCode::GatewayUnavailable,
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::AmountMismatch { .. } => ErrorCode::AmountMismatch,
                ValidationError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
                ValidationError::InvalidDateRange { .. } => ErrorCode::InvalidDateRange,
                ValidationError::MissingField { .. } | ValidationError::InvalidField { .. } => {
                    ErrorCode::ValidationError
                }
            },
            AppErrorKind::Authentication(_) => ErrorCode::Unauthenticated,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::BookingNotFound { booking_id } => {
                    format!("Booking '{}' not found", booking_id)
                }
                DomainError::PaymentNotFound { tx_ref } => {
                    format!("Payment with reference '{}' not found", tx_ref)
                }
                DomainError::PropertyNotFound { property_id } => {
                    format!("Property '{}' not found", property_id)
                }
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::GatewayRejected { message, .. } => message.clone(),
                ExternalError::GatewayUnavailable { gateway, .. } => format!(
                    "Payment gateway ({}) is temporarily unavailable. Please try again",
                    gateway
                ),
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::AmountMismatch { expected, provided } => format!(
                    "Payment amount mismatch: expected {}, got {}",
                    expected, provided
                ),
                ValidationError::InvalidAmount { amount, reason } => {
                    format!("Invalid amount '{}': {}", amount, reason)
                }
                ValidationError::InvalidDateRange {
                    start_date,
                    end_date,
                } => format!(
                    "End date {} must be after start date {}",
                    end_date, start_date
                ),
                ValidationError::MissingField { field } => {
                    format!("Required field '{}' is missing", field)
                }
                ValidationError::InvalidField { field, reason } => {
                    format!("Invalid value for '{}': {}", field, reason)
                }
            },
            AppErrorKind::Authentication(err) => match err {
                AuthenticationError::MissingToken => {
                    "Authentication credentials were not provided".to_string()
                }
                AuthenticationError::InvalidToken { .. } => {
                    "Invalid or expired authentication token".to_string()
                }
                AuthenticationError::InvalidSignature => "Invalid webhook signature".to_string(),
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Infrastructure(InfrastructureError::Database { is_retryable, .. }) => {
                *is_retryable
            }
            AppErrorKind::External(ExternalError::GatewayUnavailable { .. }) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

// From<DatabaseError> lives in database/error.rs, From<PaymentError> in payments/error.rs

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_mismatch_error() {
        let error = AppError::new(AppErrorKind::Validation(ValidationError::AmountMismatch {
            expected: "800.00".to_string(),
            provided: "799.00".to_string(),
        }));

        assert_eq!(error.status_code(), 400);
        assert_eq!(error.error_code(), ErrorCode::AmountMismatch);
        assert!(error.user_message().contains("mismatch"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_not_found_errors() {
        let error = AppError::new(AppErrorKind::Domain(DomainError::PaymentNotFound {
            tx_ref: "abc-123".to_string(),
        }));
        assert_eq!(error.status_code(), 404);
        assert_eq!(error.error_code(), ErrorCode::PaymentNotFound);
        assert!(error.user_message().contains("abc-123"));

        let error = AppError::new(AppErrorKind::Domain(DomainError::BookingNotFound {
            booking_id: "b-1".to_string(),
        }));
        assert_eq!(error.status_code(), 404);
    }

    #[test]
    fn test_gateway_errors_are_server_failures() {
        let rejected = AppError::new(AppErrorKind::External(ExternalError::GatewayRejected {
            gateway: "chapa".to_string(),
            message: "Invalid currency".to_string(),
        }));
        assert_eq!(rejected.status_code(), 500);
        assert_eq!(rejected.user_message(), "Invalid currency");
        assert!(!rejected.is_retryable());

        let unavailable = AppError::new(AppErrorKind::External(
            ExternalError::GatewayUnavailable {
                gateway: "chapa".to_string(),
                message: "connection refused".to_string(),
            },
        ));
        assert_eq!(unavailable.status_code(), 500);
        assert_eq!(unavailable.error_code(), ErrorCode::GatewayUnavailable);
        assert!(unavailable.is_retryable());
    }

    #[test]
    fn test_authentication_error() {
        let error = AppError::new(AppErrorKind::Authentication(
            AuthenticationError::MissingToken,
        ));
        assert_eq!(error.status_code(), 401);
        assert_eq!(error.error_code(), ErrorCode::Unauthenticated);
    }

    #[test]
    fn test_request_id_is_attached() {
        let error = AppError::internal("boom").with_request_id("req_1");
        assert_eq!(error.request_id.as_deref(), Some("req_1"));
        assert_eq!(error.status_code(), 500);
    }
}
