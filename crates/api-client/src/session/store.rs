//! Session Store
//!
//! Durable, single-writer record of the current authenticated identity. The
//! session lives in memory for the request path (the Gateway reads the token
//! on every call) and is mirrored into [`SecureStorage`] as two entries: the
//! opaque token and the JSON user record.
//!
//! The store is an explicit instance shared through an `Arc`; the Gateway
//! and the endpoint groups receive it at construction.

use super::{Result, Session, SessionCallback, SessionError, SessionEvent, User};
use parking_lot::RwLock as CallbackLock;
use std::sync::Arc;
use storage::{MemoryStorage, SecureStorage};
use tokio::sync::RwLock;

/// Secure-storage key of the bearer token
pub const TOKEN_KEY: &str = "auth_token";

/// Secure-storage key of the serialized user record
pub const USER_KEY: &str = "user_data";

/// Persisted session holder
pub struct SessionStore {
    /// Backing secure storage
    storage: Arc<dyn SecureStorage>,

    /// In-memory copy of the persisted session
    current: RwLock<Option<Session>>,

    /// Session event callbacks
    callbacks: CallbackLock<Vec<SessionCallback>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("callbacks", &self.callbacks.read().len())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store over the given secure storage. Call [`load`](Self::load)
    /// at startup to pick up a previously saved session.
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self {
            storage,
            current: RwLock::new(None),
            callbacks: CallbackLock::new(Vec::new()),
        }
    }

    /// Create a store backed by process memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Read the token and user record from secure storage
    ///
    /// Returns `None` unless both entries are present. A user record that no
    /// longer parses is treated as absent and both entries are removed.
    pub async fn load(&self) -> Result<Option<Session>> {
        let token = self.storage.get_item(TOKEN_KEY).await?;
        let user_json = self.storage.get_item(USER_KEY).await?;

        let session = match (token, user_json) {
            (Some(token), Some(user_json)) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) => Some(Session::new(user, token)),
                Err(e) => {
                    tracing::warn!("Discarding unreadable stored user record: {}", e);
                    self.remove_entries().await?;
                    None
                }
            },
            _ => None,
        };

        tracing::debug!(restored = session.is_some(), "session loaded from secure storage");

        *self.current.write().await = session.clone();
        Ok(session)
    }

    /// Persist a session and make it current
    ///
    /// The user record is written before the token. If either write fails,
    /// both entries are removed and no session remains in memory or storage.
    pub async fn save(&self, session: Session) -> Result<()> {
        let user_json = serde_json::to_string(&session.user)?;

        let failure = {
            let mut current = self.current.write().await;
            let written = self.write_entries(&session.token, &user_json).await;
            match written {
                Ok(()) => {
                    *current = Some(Session { is_authenticated: true, ..session });
                    None
                }
                Err(e) => Some((e, current.take().is_some())),
            }
        };

        match failure {
            None => {
                self.emit(SessionEvent::Created);
                Ok(())
            }
            Some((e, had_session)) => {
                tracing::warn!("Could not persist session, discarding it: {}", e);
                if had_session {
                    self.emit(SessionEvent::Cleared);
                }
                Err(e)
            }
        }
    }

    /// Remove the session from memory and secure storage
    ///
    /// The in-memory session is dropped first, so requests built after this
    /// call never carry the old token even if storage removal fails.
    pub async fn clear(&self) -> Result<()> {
        self.current.write().await.take();
        let result = self.remove_entries().await;

        self.emit(SessionEvent::Cleared);
        result
    }

    /// Tear the session down after an unrecoverable auth failure
    ///
    /// Emits [`SessionEvent::Expired`] when a session was active, then clears.
    pub async fn expire(&self) -> Result<()> {
        if self.current.read().await.is_some() {
            self.emit(SessionEvent::Expired);
        }
        self.clear().await
    }

    /// Replace the token of the active session
    pub async fn update_token(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();

        {
            let mut current = self.current.write().await;
            let session = current.as_mut().ok_or(SessionError::NoSession)?;
            self.storage.set_item(TOKEN_KEY, &token).await?;
            session.token = token;
        }

        self.emit(SessionEvent::Refreshed);
        Ok(())
    }

    /// Replace the user record of the active session
    pub async fn update_user(&self, user: User) -> Result<()> {
        let user_json = serde_json::to_string(&user)?;

        {
            let mut current = self.current.write().await;
            let session = current.as_mut().ok_or(SessionError::NoSession)?;
            self.storage.set_item(USER_KEY, &user_json).await?;
            session.user = user;
        }

        self.emit(SessionEvent::UserUpdated);
        Ok(())
    }

    /// Current bearer token
    pub async fn token(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|s| s.token.clone())
    }

    /// Current session
    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Current user
    pub async fn current_user(&self) -> Option<User> {
        self.current.read().await.as_ref().map(|s| s.user.clone())
    }

    /// Whether a session is active
    pub async fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_some_and(|s| s.is_authenticated)
    }

    /// Register a session event callback
    ///
    /// Callbacks run synchronously on the task that caused the event and
    /// must not block.
    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        self.callbacks.write().push(Arc::new(callback));
    }

    async fn write_entries(&self, token: &str, user_json: &str) -> Result<()> {
        let written = match self.storage.set_item(USER_KEY, user_json).await {
            Ok(()) => self.storage.set_item(TOKEN_KEY, token).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(cleanup) = self.remove_entries().await {
                tracing::error!("Failed to roll back partial session write: {}", cleanup);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Delete both entries, attempting each even if the other fails
    async fn remove_entries(&self) -> Result<()> {
        let token = self.storage.delete_item(TOKEN_KEY).await;
        let user = self.storage.delete_item(USER_KEY).await;
        token?;
        user?;
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        tracing::debug!(?event, "session event");
        let callbacks = self.callbacks.read().clone();
        for callback in callbacks {
            callback(event);
        }
    }
}
