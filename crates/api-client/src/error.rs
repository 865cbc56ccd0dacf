//! Error taxonomy for Gateway calls
//!
//! Every failure a Gateway call can produce is classified into an
//! [`ApiError`]. Its `Display` output is the message callers receive in the
//! envelope's `error` field.

use crate::transport::TransportError;
use serde::Deserialize;
use thiserror::Error;

/// Classified Gateway failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response was received (connection failure or timeout)
    #[error("Network error. Please check your connection.")]
    Network(TransportError),

    /// 5xx response
    #[error("Server error. Please try again later.")]
    Server {
        /// HTTP status code
        status: u16,
        /// Message supplied by the server, if any
        message: String,
    },

    /// 401 or 403 response that could not be recovered by a token refresh
    #[error("Authentication failed. Please log in again.")]
    Auth {
        /// HTTP status code
        status: u16,
    },

    /// 404 response
    #[error("Resource not found.")]
    NotFound,

    /// Any other 4xx response
    #[error("{message}")]
    Client {
        /// HTTP status code
        status: u16,
        /// Message supplied by the server, or a generic one
        message: String,
    },

    /// A 2xx body that does not match the expected shape
    #[error("Invalid response from server: {0}")]
    Parse(String),

    /// Session could not be read or written
    #[error("Could not access your saved session. Please try again.")]
    Storage(String),

    /// Anything uncategorized
    #[error("An unexpected error occurred.")]
    Unknown(String),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Invalid(reason) => ApiError::Unknown(reason),
            other => ApiError::Network(other),
        }
    }
}

/// Error body shapes the backend uses
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiError {
    /// Classify a non-2xx response
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match status {
            401 | 403 => ApiError::Auth { status },
            404 => ApiError::NotFound,
            500..=599 => ApiError::Server {
                status,
                message: server_message(body).unwrap_or_default(),
            },
            400..=499 => ApiError::Client {
                status,
                message: server_message(body)
                    .unwrap_or_else(|| format!("Request failed with status {}", status)),
            },
            _ => ApiError::Unknown(format!("unexpected status {}", status)),
        }
    }

    /// HTTP status associated with this error, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. }
            | ApiError::Auth { status }
            | ApiError::Client { status, .. } => Some(*status),
            ApiError::NotFound => Some(404),
            _ => None,
        }
    }

    /// Network errors and 5xx responses are retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Server { .. })
    }

    /// 401/403
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth { .. })
    }
}

/// Extract a human-readable message from an error body
fn server_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_statuses() {
        for status in [401, 403] {
            let err = ApiError::from_response(status, b"{}");
            assert_eq!(err, ApiError::Auth { status });
            assert!(err.is_auth());
            assert!(!err.is_retryable());
            assert!(err.to_string().starts_with("Authentication failed"));
        }
    }

    #[test]
    fn test_not_found() {
        let err = ApiError::from_response(404, br#"{"message":"no such word"}"#);
        assert_eq!(err, ApiError::NotFound);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Resource not found.");
    }

    #[test]
    fn test_server_error_is_retryable() {
        let err = ApiError::from_response(502, br#"{"message":"bad gateway"}"#);
        assert_eq!(err, ApiError::Server { status: 502, message: "bad gateway".to_string() });
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Server error. Please try again later.");
    }

    #[test]
    fn test_client_error_passes_server_message_through() {
        let err = ApiError::from_response(422, br#"{"message":"Email already registered"}"#);
        assert_eq!(err.to_string(), "Email already registered");
        assert!(!err.is_retryable());

        let err = ApiError::from_response(400, br#"{"error":"Missing field: text"}"#);
        assert_eq!(err.to_string(), "Missing field: text");
    }

    #[test]
    fn test_client_error_without_message() {
        let err = ApiError::from_response(409, b"<html>conflict</html>");
        assert_eq!(err.to_string(), "Request failed with status 409");
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_unknown_status() {
        let err = ApiError::from_response(302, b"");
        assert!(matches!(err, ApiError::Unknown(_)));
        assert_eq!(err.to_string(), "An unexpected error occurred.");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_network_error_from_transport() {
        let err: ApiError = TransportError::Timeout.into();
        assert!(err.is_retryable());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Network error. Please check your connection.");
    }

    #[test]
    fn test_invalid_request_is_unknown() {
        let err: ApiError = TransportError::Invalid("bad header value".to_string()).into();
        assert_eq!(err, ApiError::Unknown("bad header value".to_string()));
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "An unexpected error occurred.");
    }
}
