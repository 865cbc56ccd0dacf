//! Lingua API client
//!
//! This crate provides the Request Gateway every outbound call goes through
//! (header injection, linear-backoff retry, one-shot token refresh), the
//! Session Store that persists the authenticated identity, and typed
//! endpoint groups for the learning backend.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use endpoints::Api;
pub use envelope::ApiResponse;
pub use error::ApiError;
pub use gateway::{Gateway, GatewayConfig};
pub use middleware::RetryPolicy;
pub use session::{Session, SessionEvent, SessionStore, User};
pub use transport::{ApiRequest, HttpMethod, MultipartForm, RawResponse, Transport, TransportError};
