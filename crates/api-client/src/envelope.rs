//! Uniform result envelope
//!
//! Every Gateway call resolves to an [`ApiResponse`]: `data` is present iff
//! the call succeeded, `error` iff it failed. The fields are private so the
//! invariant cannot be broken after construction.

use crate::error::ApiError;
use serde::Serialize;

/// `{ success, data?, error? }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    /// Failed envelope
    pub fn err(message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()) }
    }

    /// Whether the call succeeded
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Response data (only on success)
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Error message (only on failure)
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Take the data out
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Convert to a `Result` with the error message
    pub fn into_result(self) -> Result<T, String> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, error) => Err(error.unwrap_or_default()),
        }
    }

    /// Map the success payload
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse { success: self.success, data: self.data.map(f), error: self.error }
    }
}

impl<T> From<Result<T, ApiError>> for ApiResponse<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => ApiResponse::ok(data),
            Err(err) => ApiResponse::err(err.to_string()),
        }
    }
}
