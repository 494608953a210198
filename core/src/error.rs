//! Error type for the sendwithus API client.
//!
//! # Design
//! Every failure travels through the one `ApiError` type. The variants exist
//! so Rust callers can `match`, but coarse-grained callers only need
//! `status()` and `message()`: a status of 0 means no HTTP response was
//! received (or the request never left the process).

use std::fmt;

/// Errors returned by `SwuClient` operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The transport failed before a response was produced (DNS, TCP, TLS,
    /// timeout, or a body that could not be read).
    Transport(String),

    /// The server answered with a status code of 300 or above. Redirects are
    /// not followed, so 3xx lands here too.
    Http { status: u16, body: String },

    /// A successful response body could not be decoded into the result type.
    Deserialization { status: u16, message: String },

    /// The request payload could not be serialized to JSON.
    Serialization(String),

    /// The client could not be configured.
    Config(String),
}

impl ApiError {
    /// HTTP status code carried by the error, 0 when no response exists.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Http { status, .. } | ApiError::Deserialization { status, .. } => *status,
            ApiError::Transport(_) | ApiError::Serialization(_) | ApiError::Config(_) => 0,
        }
    }

    /// Raw message: transport error text, response body, or decoder error.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Transport(msg)
            | ApiError::Serialization(msg)
            | ApiError::Config(msg) => msg,
            ApiError::Http { body, .. } => body,
            ApiError::Deserialization { message, .. } => message,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "swu: status code: {}, error: {}",
            self.status(),
            self.message()
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_have_status_zero() {
        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(err.status(), 0);
        assert_eq!(err.message(), "connection refused");
    }

    #[test]
    fn http_error_exposes_status_and_body() {
        let err = ApiError::Http {
            status: 404,
            body: "{\"error\":\"missing\"}".to_string(),
        };
        assert_eq!(err.status(), 404);
        assert_eq!(err.message(), "{\"error\":\"missing\"}");
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = ApiError::Http {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "swu: status code: 500, error: boom");
    }

    #[test]
    fn deserialization_error_keeps_response_status() {
        let err = ApiError::Deserialization {
            status: 200,
            message: "expected value".to_string(),
        };
        assert_eq!(err.status(), 200);
    }
}
