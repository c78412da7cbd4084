//! Error types for the codescribe service.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`ServiceError`] — **Fatal** for the request (missing field, gateway
//!   failure, unexpected internal error) or for startup (bad configuration,
//!   socket bind). Each variant knows its HTTP status and the message the
//!   caller is allowed to see.
//!
//! * [`GatewayError`] — the completion gateway's classified failure. Only two
//!   outcomes matter to the caller: the credential was rejected, or the call
//!   failed for some other reason.
//!
//! * [`ExtractionError`] — **Non-fatal**: the uploaded coding standard could
//!   not be turned into text. Logged and swallowed; the request carries on as
//!   if no document was supplied.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::net::SocketAddr;
use thiserror::Error;

/// Caller-facing message for a credential the completion service rejected.
pub const INVALID_CREDENTIAL_MESSAGE: &str =
    "Invalid API key. Please check your API key in profile settings.";

/// Caller-facing message for any other completion failure.
pub const COMPLETION_FAILED_MESSAGE: &str = "Failed to get a response from OpenAI";

/// Caller-facing message for everything that is not the caller's fault.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// All fatal errors returned by the codescribe library.
#[derive(Debug, Error)]
pub enum ServiceError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The `apiKey` field was absent or blank.
    #[error("API key is required")]
    MissingCredential,

    /// The `prompt` field was absent or blank.
    #[error("Prompt is required")]
    MissingInstruction,

    /// The request body exceeded the configured upload cap.
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    // ── Gateway errors ────────────────────────────────────────────────────
    /// The completion service call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error. The detail is logged, never returned.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::MissingCredential | ServiceError::MissingInstruction => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message placed in the `error` field of the JSON body.
    ///
    /// Internal details never leave the process; only validation and gateway
    /// errors have specific wording.
    pub fn public_message(&self) -> &'static str {
        match self {
            ServiceError::MissingCredential => "API key is required",
            ServiceError::MissingInstruction => "Prompt is required",
            ServiceError::PayloadTooLarge { .. } => "Request body too large",
            ServiceError::Gateway(GatewayError::InvalidCredential) => INVALID_CREDENTIAL_MESSAGE,
            ServiceError::Gateway(GatewayError::Failed { .. }) => COMPLETION_FAILED_MESSAGE,
            _ => UNEXPECTED_ERROR_MESSAGE,
        }
    }
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: self.public_message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Classified failure of the completion gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The completion service rejected the caller's credential.
    #[error("completion service rejected the API key")]
    InvalidCredential,

    /// Any other failure. `detail` is for server-side logs only.
    #[error("completion call failed: {detail}")]
    Failed { detail: String },
}

/// A non-fatal failure to read the uploaded coding standard.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The PDF parser returned an error.
    #[error("PDF '{file_name}' could not be parsed: {detail}")]
    Unreadable { file_name: String, detail: String },

    /// The PDF parsed but held no text (scanned or image-only document).
    #[error("PDF '{file_name}' contains no extractable text")]
    Empty { file_name: String },

    /// The extractor panicked or its blocking task was cancelled.
    #[error("PDF '{file_name}' extraction aborted: {detail}")]
    Aborted { file_name: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_requests() {
        assert_eq!(
            ServiceError::MissingCredential.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::MissingInstruction.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::MissingCredential.public_message(),
            "API key is required"
        );
        assert_eq!(
            ServiceError::MissingInstruction.public_message(),
            "Prompt is required"
        );
    }

    #[test]
    fn gateway_errors_are_server_errors_with_distinct_messages() {
        let invalid = ServiceError::from(GatewayError::InvalidCredential);
        let failed = ServiceError::from(GatewayError::Failed {
            detail: "connection reset".into(),
        });

        assert_eq!(invalid.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(invalid.public_message(), INVALID_CREDENTIAL_MESSAGE);
        assert_eq!(failed.public_message(), COMPLETION_FAILED_MESSAGE);
    }

    #[test]
    fn oversized_body_is_413() {
        let e = ServiceError::PayloadTooLarge { limit: 1024 };
        assert_eq!(e.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(e.to_string().contains("1024"));
    }

    #[test]
    fn internal_detail_is_not_public() {
        let e = ServiceError::Internal("join error: task 7 panicked".into());
        assert_eq!(e.public_message(), UNEXPECTED_ERROR_MESSAGE);
        assert!(e.to_string().contains("task 7"), "got: {e}");
    }

    #[test]
    fn extraction_error_display() {
        let e = ExtractionError::Empty {
            file_name: "standard.pdf".into(),
        };
        assert!(e.to_string().contains("standard.pdf"));
    }
}
