use serde::Serialize;
use thiserror::Error;

/// A single rejected input field, reported back to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
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

/// Failures surfaced by the payment-initiation path.
///
/// Each kind is kept distinct so the caller can pick its own retry policy;
/// nothing in this crate retries on its own.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("validation failed ({} field(s))", .0.len())]
    ValidationError(Vec<FieldError>),
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    #[error("authentication failed: {0}")]
    AuthenticationError(String),
    #[error("provider rejected request: {message}")]
    BadRequestError {
        message: String,
        details: serde_json::Value,
    },
    #[error("payment service unavailable")]
    ServiceUnavailableError,
    #[error("request to payment service timed out")]
    RequestTimeoutError,
    #[error("internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Outcome of a failed call to the payment provider, before it is mapped
/// onto [`PaymentError`].
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider responded with status {status}")]
    Status {
        status: u16,
        body: serde_json::Value,
    },
    #[error("provider request timed out")]
    Timeout,
    #[error("provider transport error: {0}")]
    Transport(String),
    #[error("malformed provider response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("record store responded with status {0}")]
    Status(u16),
    #[error("malformed record store response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
