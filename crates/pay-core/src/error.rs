//! # Payment Error Types
//!
//! Typed error handling for the payment abstraction layer.
//! All fallible operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Malformed or negative amount, or an exponent the codec cannot represent
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// No provider registered under the requested key
    #[error("Provider not registered: {key} (available: {available:?})")]
    ProviderNotFound { key: String, available: Vec<String> },

    /// The gateway rejected the business request
    #[error("Provider rejected request: {message}")]
    UserError {
        message: String,
        code: Option<String>,
    },

    /// Webhook signature verification failed
    #[error("Webhook signature mismatch: {0}")]
    SignatureMismatch(String),

    /// Network/HTTP failure inside the transport
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Shorthand for an `InvalidAmount` error
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        PaymentError::InvalidAmount {
            message: message.into(),
        }
    }

    /// Shorthand for a `UserError` carrying an optional provider code
    pub fn user(message: impl Into<String>, code: Option<String>) -> Self {
        PaymentError::UserError {
            message: message.into(),
            code,
        }
    }

    /// Provider error code attached to a `UserError`, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            PaymentError::UserError { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Only transport failures qualify; retrying is left to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::TransportError(_))
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::InvalidAmount { .. } => 400,
            PaymentError::ProviderNotFound { .. } => 404,
            PaymentError::UserError { .. } => 422,
            PaymentError::SignatureMismatch(_) => 401,
            PaymentError::TransportError(_) => 503,
            PaymentError::Configuration(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
