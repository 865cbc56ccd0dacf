//! Authentication endpoints

use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::session::{AuthPayload, RefreshPayload, Session, SessionError, User};
use crate::transport::ApiRequest;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Plain-text password, sent over TLS
    pub password: String,
}

/// Body of `/auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Desired username
    pub username: String,
    /// Account email
    pub email: String,
    /// Plain-text password, sent over TLS
    pub password: String,
    /// Given name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Login, registration and session lifecycle
#[derive(Debug, Clone)]
pub struct AuthApi {
    gateway: Arc<Gateway>,
}

impl AuthApi {
    /// Create the group over `gateway`
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Log in and persist the returned session
    pub async fn login(&self, email: &str, password: &str) -> ApiResponse<AuthPayload> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.gateway.send_json(ApiRequest::post("/auth/login"), &body).await;
        self.establish(result).await.into()
    }

    /// Create an account and persist the returned session
    pub async fn register(&self, request: &RegisterRequest) -> ApiResponse<AuthPayload> {
        let result = self.gateway.send_json(ApiRequest::post("/auth/register"), request).await;
        self.establish(result).await.into()
    }

    /// Tell the backend we are leaving, then clear the session
    ///
    /// The server call is best effort; the local session is cleared whatever
    /// its outcome.
    pub async fn logout(&self) -> ApiResponse<()> {
        let server = self.gateway.execute::<IgnoredAny>(ApiRequest::post("/auth/logout")).await;
        if let Err(e) = server {
            tracing::warn!("Logout request failed, clearing local session anyway: {:?}", e);
        }

        self.gateway
            .session()
            .clear()
            .await
            .map_err(storage_error)
            .into()
    }

    /// Exchange the current token for a new one
    ///
    /// Any failure ends the session.
    pub async fn refresh(&self) -> ApiResponse<RefreshPayload> {
        let path = self.gateway.config().refresh_path.clone();
        let session = self.gateway.session();

        let result = match self.gateway.execute::<RefreshPayload>(ApiRequest::post(path)).await {
            Ok(payload) => apply_refresh(session, &payload).await.map(|()| payload),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::warn!("Explicit token refresh failed, ending session: {:?}", e);
            if let Err(clear_err) = session.expire().await {
                tracing::error!("Failed to clear session: {}", clear_err);
            }
        }

        result.into()
    }

    /// Load the persisted session at startup
    ///
    /// Returns the restored user, or `None` when no usable session is stored.
    pub async fn restore(&self) -> ApiResponse<Option<User>> {
        self.gateway
            .session()
            .load()
            .await
            .map(|session| session.map(|s| s.user))
            .map_err(storage_error)
            .into()
    }

    async fn establish(&self, result: Result<AuthPayload, ApiError>) -> Result<AuthPayload, ApiError> {
        let payload = result?;
        self.gateway
            .session()
            .save(Session::from(payload.clone()))
            .await
            .map_err(storage_error)?;

        tracing::info!(user = %payload.user.id, "session established");
        Ok(payload)
    }
}

async fn apply_refresh(session: &crate::session::SessionStore, payload: &RefreshPayload) -> Result<(), ApiError> {
    session
        .update_token(payload.token.clone())
        .await
        .map_err(storage_error)?;

    if let Some(user) = &payload.user {
        session.update_user(user.clone()).await.map_err(storage_error)?;
    }

    Ok(())
}

fn storage_error(e: SessionError) -> ApiError {
    match e {
        SessionError::NoSession => ApiError::Auth { status: 401 },
        other => ApiError::Storage(other.to_string()),
    }
}
