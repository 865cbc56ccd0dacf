//! Request Gateway
//!
//! The single chokepoint for outbound API traffic. A [`Gateway`] owns the
//! middleware chain and turns every outcome into a typed result or an
//! [`ApiResponse`] envelope.

use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::middleware::{AuthRecoveryLayer, HeaderLayer, RetryLayer, RetryPolicy};
use crate::session::SessionStore;
use crate::transport::{ApiRequest, MultipartForm, ReqwestTransport, Transport, TransportError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Base URL used when `LINGUA_API_URL` is unset
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Per-call timeout ceiling used when `LINGUA_API_TIMEOUT_SECS` is unset
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Value of the `X-Client-Type` header
pub const DEFAULT_CLIENT_TYPE: &str = "mobile";

/// Token refresh endpoint
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Environment variable holding the API base URL
pub const ENV_API_URL: &str = "LINGUA_API_URL";

/// Environment variable holding the timeout in seconds
pub const ENV_API_TIMEOUT: &str = "LINGUA_API_TIMEOUT_SECS";

/// Environment variable overriding the reported app version
pub const ENV_APP_VERSION: &str = "LINGUA_APP_VERSION";

// =============================================================================
// Configuration
// =============================================================================

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// API base URL, e.g. `https://api.example.com/api`
    pub base_url: String,
    /// Per-call timeout ceiling
    pub timeout: Duration,
    /// Reported in `X-App-Version`
    pub app_version: String,
    /// Reported in `X-Client-Type`
    pub client_type: String,
    /// Retry behavior for network errors and 5xx responses
    pub retry: RetryPolicy,
    /// Path of the token refresh endpoint
    pub refresh_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            client_type: DEFAULT_CLIENT_TYPE.to_string(),
            retry: RetryPolicy::default(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Create a config for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Read the config from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the config through a variable lookup function
    ///
    /// Unset or empty variables fall back to the defaults. An unparsable
    /// timeout is logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(url) = read(ENV_API_URL) {
            config.base_url = url;
        }

        if let Some(raw) = read(ENV_API_TIMEOUT) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!("Ignoring invalid {}={:?}", ENV_API_TIMEOUT, raw),
            }
        }

        if let Some(version) = read(ENV_APP_VERSION) {
            config.app_version = version;
        }

        config
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the reported app version
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    /// Set the reported client type
    pub fn with_client_type(mut self, client_type: impl Into<String>) -> Self {
        self.client_type = client_type.into();
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the refresh endpoint path
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// Issues API calls through the middleware chain
///
/// Every call reads the current token from the shared [`SessionStore`];
/// auth teardown is observable through its events.
pub struct Gateway {
    config: GatewayConfig,
    session: Arc<SessionStore>,
    transport: Box<dyn Transport>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Create a gateway backed by reqwest
    pub fn new(config: GatewayConfig, session: Arc<SessionStore>) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.base_url.clone(), config.timeout)?;
        Ok(Self::with_transport(config, session, transport))
    }

    /// Create a gateway over any transport
    pub fn with_transport<T>(config: GatewayConfig, session: Arc<SessionStore>, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        let headers = HeaderLayer::new(
            transport,
            session.clone(),
            config.client_type.clone(),
            config.app_version.clone(),
        );
        let retry = RetryLayer::new(headers, config.retry.clone());
        let auth = AuthRecoveryLayer::new(retry, session.clone(), config.refresh_path.clone());

        Self {
            config,
            session,
            transport: Box::new(auth),
        }
    }

    /// The session store this gateway authenticates with
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Active configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Send a request and decode a successful body into `T`
    ///
    /// An empty body decodes as JSON `null`, so `()` and `Option<_>` targets
    /// accept bodiless responses.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let method = request.method;
        let path = request.path.clone();
        tracing::debug!(method = method.as_str(), path = %path, "sending request");

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(method = method.as_str(), path = %path, "request failed: {}", e);
                return Err(ApiError::from(e));
            }
        };

        tracing::debug!(
            method = method.as_str(),
            path = %path,
            status = response.status,
            "response received"
        );

        if !response.is_success() {
            return Err(ApiError::from_response(response.status, &response.body));
        }

        decode_body(&response.body)
    }

    /// GET `path` with query parameters
    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> ApiResponse<T> {
        let request = params
            .iter()
            .fold(ApiRequest::get(path), |request, (key, value)| request.param(*key, *value));
        self.execute(request).await.into()
    }

    /// POST `body` as JSON
    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(ApiRequest::post(path), body).await.into()
    }

    /// POST without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.execute(ApiRequest::post(path)).await.into()
    }

    /// PUT `body` as JSON
    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(ApiRequest::put(path), body).await.into()
    }

    /// DELETE `path`
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.execute(ApiRequest::delete(path)).await.into()
    }

    /// POST a multipart form
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: MultipartForm) -> ApiResponse<T> {
        self.execute(ApiRequest::post(path).multipart(form)).await.into()
    }

    /// Attach a JSON body and execute
    pub(crate) async fn send_json<T, B>(&self, request: ApiRequest, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = request
            .json_body(body)
            .map_err(|e| ApiError::Unknown(format!("failed to encode request body: {}", e)))?;
        self.execute(request).await
    }
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let result = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_slice(b"null")
    } else {
        serde_json::from_slice(body)
    };

    result.map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, User};
    use crate::test_utils::ScriptedTransport;
    use crate::transport::HttpMethod;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Streak {
        current: u32,
        longest: u32,
    }

    fn gateway(transport: Arc<ScriptedTransport>) -> Gateway {
        let config = GatewayConfig::default().with_retry(RetryPolicy::no_retry());
        Gateway::with_transport(config, Arc::new(SessionStore::in_memory()), transport)
    }

    #[test]
    fn test_config_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000/api");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.client_type, "mobile");
        assert_eq!(config.refresh_path, "/auth/refresh");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = GatewayConfig::from_lookup(|key| match key {
            ENV_API_URL => Some("https://api.lingua.test/api".to_string()),
            ENV_API_TIMEOUT => Some("30".to_string()),
            ENV_APP_VERSION => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.base_url, "https://api.lingua.test/api");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.app_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_config_invalid_timeout_ignored() {
        let config = GatewayConfig::from_lookup(|key| {
            (key == ENV_API_TIMEOUT).then(|| "soon".to_string())
        });
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[tokio::test]
    async fn test_get_success() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, serde_json::json!({"current": 5, "longest": 12}));

        let response: ApiResponse<Streak> =
            gateway(transport.clone()).get("/vocabulary", &[("level", "A2")]).await;

        assert!(response.is_success());
        assert_eq!(response.data(), Some(&Streak { current: 5, longest: 12 }));

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.params, vec![("level".to_string(), "A2".to_string())]);
        assert_eq!(sent.header_value("X-Client-Type"), Some("mobile"));
    }

    #[tokio::test]
    async fn test_empty_body_parses_as_null() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(204);
        transport.push_status(200);

        let gateway = gateway(transport);
        let unit: ApiResponse<()> = gateway.delete("/vocabulary/w-1").await;
        assert!(unit.is_success());

        let optional: ApiResponse<Option<Streak>> = gateway.get("/streak", &[]).await;
        assert_eq!(optional.into_data(), Some(None));
    }

    #[tokio::test]
    async fn test_parse_failure_envelope() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, serde_json::json!({"current": "five"}));

        let response: ApiResponse<Streak> = gateway(transport).get("/streak", &[]).await;

        assert!(!response.is_success());
        assert!(response.data().is_none());
        assert!(response.error().unwrap().starts_with("Invalid response from server"));
    }

    #[tokio::test]
    async fn test_error_classification() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(404);
        transport.push_json(422, serde_json::json!({"message": "Email already registered"}));
        transport.push_error(TransportError::Timeout);
        let gateway = gateway(transport);

        let not_found = gateway.execute::<Streak>(ApiRequest::get("/reading/x")).await;
        assert_eq!(not_found, Err(ApiError::NotFound));

        let rejected: ApiResponse<Streak> =
            gateway.post("/auth/register", &serde_json::json!({})).await;
        assert_eq!(rejected.error(), Some("Email already registered"));

        let offline: ApiResponse<Streak> = gateway.get("/streak", &[]).await;
        assert_eq!(offline.error(), Some("Network error. Please check your connection."));
    }

    #[tokio::test]
    async fn test_auth_failure_without_session_surfaces_auth_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(401);

        let response: ApiResponse<Streak> = gateway(transport.clone()).get("/user/stats", &[]).await;

        assert_eq!(response.error(), Some("Authentication failed. Please log in again."));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_put_and_upload_shapes() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, serde_json::json!({"current": 1, "longest": 1}));
        transport.push_json(200, serde_json::json!({"current": 1, "longest": 1}));

        let session = Arc::new(SessionStore::in_memory());
        session
            .save(Session::new(User::new("u-1", "ana", "ana@example.com"), "tok"))
            .await
            .unwrap();
        let gateway = Gateway::with_transport(
            GatewayConfig::default().with_app_version("9.9.9"),
            session,
            transport.clone(),
        );

        let _: ApiResponse<Streak> = gateway.put("/user/profile", &serde_json::json!({"firstName": "Ana"})).await;
        let put = transport.last_request().unwrap();
        assert_eq!(put.method, HttpMethod::Put);
        assert_eq!(put.header_value("Authorization"), Some("Bearer tok"));
        assert_eq!(put.header_value("X-App-Version"), Some("9.9.9"));

        let form = MultipartForm::new().file("audio", "take.m4a", "audio/m4a", vec![1, 2, 3]);
        let _: ApiResponse<Streak> = gateway.upload("/speaking/exercises/3/submit", form).await;
        let upload = transport.last_request().unwrap();
        assert_eq!(upload.method, HttpMethod::Post);
        assert!(upload.body.is_multipart());
        assert_eq!(upload.header_value("Content-Type"), None);
    }
}
