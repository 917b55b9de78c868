use crate::error::PaymentError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::BadRequestError { .. } => StatusCode::BAD_REQUEST,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::ServiceUnavailableError => StatusCode::SERVICE_UNAVAILABLE,
            Self::RequestTimeoutError => StatusCode::REQUEST_TIMEOUT,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::ValidationError(fields) => json!({
                "error": "Validation failed",
                "details": fields,
            }),
            Self::RateLimitExceeded => json!({
                "error": "Too many STK push requests, please try again later",
            }),
            Self::AuthenticationError(message) => json!({
                "error": "Authentication failed",
                "message": message,
            }),
            Self::BadRequestError { message, details } => json!({
                "error": "Bad request",
                "message": message,
                "details": details,
            }),
            Self::ServiceUnavailableError => json!({
                "error": "Service unavailable",
                "message": "M-Pesa service is currently unavailable. Please try again later.",
            }),
            Self::RequestTimeoutError => json!({
                "error": "Request timeout",
                "message": "The request took too long to process. Please try again.",
            }),
            // The detail is logged where the error is produced and never sent out.
            Self::InternalError(_) => json!({
                "error": "Internal server error",
                "message": "An unexpected error occurred",
            }),
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        if let Self::RateLimitExceeded = self {
            tracing::warn!("STK push rate limit exceeded");
        }
        (self.status_code(), Json(self.body())).into_response()
    }
}
