use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    /// The gateway answered and said no.
    #[error("Gateway rejected request: gateway={gateway}, message={message}")]
    Rejected {
        gateway: String,
        message: String,
        http_status: Option<u16>,
    },

    /// The gateway could not be reached or the exchange was cut short.
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// The gateway answered with something we cannot read.
    #[error("Invalid gateway response: {message}")]
    InvalidResponse { message: String },

    #[error("Webhook verification failed: {message}")]
    WebhookVerificationError { message: String },
}

impl PaymentError {
    /// Transport-class failures: the outcome at the gateway is unknown.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PaymentError::NetworkError { .. } | PaymentError::InvalidResponse { .. }
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::NetworkError { .. })
    }

    /// Text stored on the payment record when this error fails it
    pub fn detail(&self) -> String {
        match self {
            PaymentError::ValidationError { message, .. }
            | PaymentError::Rejected { message, .. }
            | PaymentError::NetworkError { message }
            | PaymentError::InvalidResponse { message }
            | PaymentError::WebhookVerificationError { message } => message.clone(),
        }
    }
}

impl From<PaymentError> for crate::error::AppError {
    fn from(err: PaymentError) -> Self {
        use crate::error::{
            AppError, AppErrorKind, AuthenticationError, ExternalError, ValidationError,
        };

        let kind = match err {
            PaymentError::ValidationError { message, field } => {
                AppErrorKind::Validation(ValidationError::InvalidField {
                    field: field.unwrap_or_else(|| "request".to_string()),
                    reason: message,
                })
            }
            PaymentError::Rejected {
                gateway, message, ..
            } => AppErrorKind::External(ExternalError::GatewayRejected { gateway, message }),
            PaymentError::NetworkError { message } | PaymentError::InvalidResponse { message } => {
                AppErrorKind::External(ExternalError::GatewayUnavailable {
                    gateway: "chapa".to_string(),
                    message,
                })
            }
            PaymentError::WebhookVerificationError { .. } => {
                AppErrorKind::Authentication(AuthenticationError::InvalidSignature)
            }
        };
        AppError::new(kind)
    }
}
