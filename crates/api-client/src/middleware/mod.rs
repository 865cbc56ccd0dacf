//! Request middleware
//!
//! Cross-cutting concerns are decorators that implement [`Transport`] around
//! an inner transport. The Gateway stacks them as:
//!
//! ```text
//! AuthRecoveryLayer -> RetryLayer -> HeaderLayer -> transport
//! ```
//!
//! Auth recovery sits outermost so the refresh call and the replay each get
//! fresh headers (the replay carries the new token) and their own retry
//! budget.
//!
//! [`Transport`]: crate::transport::Transport

mod auth;
mod headers;
mod retry;

pub use auth::AuthRecoveryLayer;
pub use headers::{HeaderLayer, CLIENT_TYPE_HEADER, APP_VERSION_HEADER};
pub use retry::{RetryLayer, RetryPolicy};
