//! Token refresh on authorization failure

use crate::session::{RefreshPayload, SessionStore};
use crate::transport::{ApiRequest, RawResponse, Transport, TransportError};
use async_trait::async_trait;
use std::sync::Arc;

/// Recovers from a 401/403 with exactly one refresh and one replay
///
/// When a request (other than the refresh call itself) is rejected with
/// 401/403 and a token is held, the refresh endpoint is called once through
/// the inner chain. On success the new token is stored and the original
/// request is replayed once; the replay's outcome is returned whatever it is.
/// If no token is held or the refresh fails, the session is expired and the
/// original rejection is returned.
pub struct AuthRecoveryLayer<T> {
    inner: T,
    session: Arc<SessionStore>,
    refresh_path: String,
}

impl<T> AuthRecoveryLayer<T> {
    /// Wrap `inner`
    pub fn new(inner: T, session: Arc<SessionStore>, refresh_path: impl Into<String>) -> Self {
        Self { inner, session, refresh_path: refresh_path.into() }
    }
}

impl<T: Transport> AuthRecoveryLayer<T> {
    async fn refresh(&self) -> Result<(), String> {
        let response = self
            .inner
            .send(ApiRequest::post(self.refresh_path.as_str()))
            .await
            .map_err(|e| e.to_string())?;

        if !response.is_success() {
            return Err(format!("refresh rejected with status {}", response.status));
        }

        let payload: RefreshPayload = serde_json::from_slice(&response.body)
            .map_err(|e| format!("unreadable refresh response: {}", e))?;

        self.session
            .update_token(payload.token)
            .await
            .map_err(|e| e.to_string())?;

        if let Some(user) = payload.user {
            self.session.update_user(user).await.map_err(|e| e.to_string())?;
        }

        Ok(())
    }

    async fn teardown(&self) {
        if let Err(e) = self.session.expire().await {
            tracing::error!("Failed to clear session after auth failure: {}", e);
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for AuthRecoveryLayer<T> {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let response = self.inner.send(request.clone()).await?;

        if !response.is_auth_failure() || request.path == self.refresh_path {
            return Ok(response);
        }

        if self.session.token().await.is_none() {
            tracing::debug!(path = %request.path, status = response.status, "auth failure without a session");
            self.teardown().await;
            return Ok(response);
        }

        tracing::info!(path = %request.path, status = response.status, "access rejected, refreshing token");

        match self.refresh().await {
            Ok(()) => {
                tracing::info!(path = %request.path, "token refreshed, replaying request");
                self.inner.send(request).await
            }
            Err(reason) => {
                tracing::warn!("Token refresh failed, ending session: {}", reason);
                self.teardown().await;
                Ok(response)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, SessionEvent, User};
    use crate::test_utils::ScriptedTransport;
    use crate::transport::HttpMethod;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storage::{KvError, MemoryStorage, SecureStorage};

    async fn logged_in() -> Arc<SessionStore> {
        let session = Arc::new(SessionStore::in_memory());
        session
            .save(Session::new(User::new("u-1", "ana", "ana@example.com"), "expired"))
            .await
            .unwrap();
        session
    }

    fn layer(
        transport: Arc<ScriptedTransport>,
        session: Arc<SessionStore>,
    ) -> AuthRecoveryLayer<Arc<ScriptedTransport>> {
        AuthRecoveryLayer::new(transport, session, "/auth/refresh")
    }

    #[tokio::test]
    async fn test_refresh_then_replay() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(401);
        transport.push_json(200, serde_json::json!({"token": "fresh"}));
        transport.push_json(200, serde_json::json!({"totalXp": 10}));
        let session = logged_in().await;

        let response = layer(transport.clone(), session.clone())
            .send(ApiRequest::get("/user/stats"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.paths(), vec!["/user/stats", "/auth/refresh", "/user/stats"]);
        assert_eq!(transport.requests()[1].method, HttpMethod::Post);
        assert_eq!(session.token().await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_refresh_updates_user_when_returned() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(403);
        transport.push_json(
            200,
            serde_json::json!({
                "token": "fresh",
                "user": {"id": "u-1", "username": "ana", "email": "ana@example.com", "xp": 77}
            }),
        );
        transport.push_status(204);
        let session = logged_in().await;

        layer(transport, session.clone()).send(ApiRequest::get("/streak")).await.unwrap();

        assert_eq!(session.current_user().await.unwrap().xp, 77);
    }

    #[tokio::test]
    async fn test_replay_is_not_refreshed_again() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(401);
        transport.push_json(200, serde_json::json!({"token": "fresh"}));
        transport.push_status(401);
        let session = logged_in().await;

        let response = layer(transport.clone(), session.clone())
            .send(ApiRequest::get("/user/profile"))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(transport.request_count(), 3);
        assert_eq!(transport.count_path("/auth/refresh"), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_session() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(401);
        transport.push_status(401);
        let session = logged_in().await;
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        session.on_event(move |event| sink.lock().push(event));

        let response = layer(transport.clone(), session.clone())
            .send(ApiRequest::get("/user/stats"))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(transport.paths(), vec!["/user/stats", "/auth/refresh"]);
        assert!(session.current().await.is_none());
        assert_eq!(*events.lock(), vec![SessionEvent::Expired, SessionEvent::Cleared]);
    }

    #[tokio::test]
    async fn test_unreadable_refresh_body_clears_session() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(401);
        transport.push_json(200, serde_json::json!({"unexpected": true}));
        let session = logged_in().await;

        let response = layer(transport, session.clone())
            .send(ApiRequest::get("/user/stats"))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert!(session.token().await.is_none());
    }

    #[tokio::test]
    async fn test_no_token_skips_refresh() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(401);
        let session = Arc::new(SessionStore::in_memory());

        let response = layer(transport.clone(), session)
            .send(ApiRequest::get("/user/profile"))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_path_passes_through() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(401);
        let session = logged_in().await;

        let response = layer(transport.clone(), session.clone())
            .send(ApiRequest::post("/auth/refresh"))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(transport.request_count(), 1);
        // Teardown for an explicit refresh belongs to the caller
        assert!(session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_other_failures_untouched() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(404);
        transport.push_error(TransportError::Timeout);
        let session = logged_in().await;
        let layer = layer(transport.clone(), session.clone());

        let response = layer.send(ApiRequest::get("/vocabulary/w-9")).await.unwrap();
        assert_eq!(response.status, 404);

        let result = layer.send(ApiRequest::get("/vocabulary")).await;
        assert_eq!(result, Err(TransportError::Timeout));

        assert_eq!(transport.request_count(), 2);
        assert!(session.is_authenticated().await);
    }

    /// Memory storage that rejects user-record writes once locked
    #[derive(Default)]
    struct LockingStorage {
        inner: MemoryStorage,
        locked: AtomicBool,
    }

    #[async_trait]
    impl SecureStorage for LockingStorage {
        async fn get_item(&self, key: &str) -> storage::kv::Result<Option<String>> {
            self.inner.get_item(key).await
        }

        async fn set_item(&self, key: &str, value: &str) -> storage::kv::Result<()> {
            if key == crate::session::USER_KEY && self.locked.load(Ordering::SeqCst) {
                return Err(KvError::Unavailable("keychain locked".to_string()));
            }
            self.inner.set_item(key, value).await
        }

        async fn delete_item(&self, key: &str) -> storage::kv::Result<()> {
            self.inner.delete_item(key).await
        }
    }

    #[tokio::test]
    async fn test_unstorable_refreshed_user_ends_session() {
        let storage = Arc::new(LockingStorage::default());
        let session = Arc::new(SessionStore::new(storage.clone()));
        session
            .save(Session::new(User::new("u-1", "ana", "ana@example.com"), "expired"))
            .await
            .unwrap();
        storage.locked.store(true, Ordering::SeqCst);

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(401);
        transport.push_json(
            200,
            serde_json::json!({
                "token": "fresh",
                "user": {"id": "u-1", "username": "ana", "email": "ana@example.com", "xp": 77}
            }),
        );

        let response = layer(transport.clone(), session.clone())
            .send(ApiRequest::get("/streak"))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(transport.request_count(), 2);
        assert!(!session.is_authenticated().await);

        let restarted = SessionStore::new(storage);
        assert!(restarted.load().await.unwrap().is_none());
    }
}
