//! Session management
//!
//! This module holds the authenticated identity of the app user:
//! - [`User`] and [`Session`] records
//! - auth payloads returned by the login, register and refresh endpoints
//! - [`SessionStore`], which mirrors the session into secure storage
//! - session events for observers (e.g. navigate to login on expiry)
//!
//! # Example
//!
//! ```rust
//! use api_client::session::{Session, SessionStore, User};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SessionStore::in_memory();
//! let user = User::new("u-1", "ana", "ana@example.com");
//!
//! store.save(Session::new(user, "token-abc")).await?;
//! assert_eq!(store.token().await.as_deref(), Some("token-abc"));
//! # Ok(())
//! # }
//! ```

mod store;

pub use store::{SessionStore, TOKEN_KEY, USER_KEY};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::KvError;
use thiserror::Error;

/// Errors that can occur during session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// Secure storage error
    #[error("Storage error: {0}")]
    Storage(#[from] KvError),

    /// User record could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation needs an active session
    #[error("No active session")]
    NoSession,
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Identity, profile and gamification snapshot of the app user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend user id
    pub id: String,
    /// Unique username
    pub username: String,
    /// Email address
    pub email: String,
    /// Given name
    #[serde(default)]
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Current level
    #[serde(default)]
    pub level: u32,
    /// Total experience points
    #[serde(default)]
    pub xp: u64,
    /// Current daily streak
    #[serde(default)]
    pub streak: u32,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    /// Create a user with the identity fields set and progress at zero
    pub fn new(id: impl Into<String>, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            level: 0,
            xp: 0,
            streak: 0,
            avatar: None,
        }
    }

    /// "First Last", falling back to the username
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// The logged-in user and their auth token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// The authenticated user
    pub user: User,
    /// Always true for a stored session
    pub is_authenticated: bool,
    /// Opaque bearer token
    pub token: String,
}

impl Session {
    /// Create an authenticated session
    pub fn new(user: User, token: impl Into<String>) -> Self {
        Self { user, is_authenticated: true, token: token.into() }
    }
}

/// Body returned by `/auth/login` and `/auth/register`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    /// New bearer token
    pub token: String,
    /// The authenticated user
    pub user: User,
}

impl From<AuthPayload> for Session {
    fn from(payload: AuthPayload) -> Self {
        Session::new(payload.user, payload.token)
    }
}

/// Body returned by `/auth/refresh`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPayload {
    /// Replacement bearer token
    pub token: String,
    /// Fresh user snapshot, when the backend includes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Session event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session saved after login or registration
    Created,
    /// Token replaced by a refresh
    Refreshed,
    /// Stored user record replaced
    UserUpdated,
    /// Refresh failed; the session is about to be cleared
    Expired,
    /// Session removed from memory and storage
    Cleared,
}

/// Callback function type for session events
pub type SessionCallback = Arc<dyn Fn(SessionEvent) + Send + Sync>;
