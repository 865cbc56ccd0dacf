//! Lingua client core
//!
//! Wires secure storage, the session store, the request gateway and the
//! typed endpoint groups into one [`App`], configured from the environment.
//!
//! ```rust,no_run
//! use lingua_app::{init_tracing, App, AppConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! init_tracing()?;
//! let app = App::bootstrap(AppConfig::from_env()).await?;
//!
//! if app.session().is_authenticated().await {
//!     let profile = app.api().user.profile().await;
//!     println!("{:?}", profile.data());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use anyhow::Context;
use api_client::{Api, Gateway, GatewayConfig, SessionStore, User};
use std::sync::Arc;
use storage::{KvConfig, KvStore, SecureStorage};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use api_client;
pub use storage;

/// Environment variable holding the secure storage location
pub const ENV_STORAGE_PATH: &str = "LINGUA_STORAGE_PATH";

/// Secure storage location used when `LINGUA_STORAGE_PATH` is unset
pub const DEFAULT_STORAGE_PATH: &str = "lingua_secure.db";

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Where the secure key-value database lives
    pub storage_path: String,
    /// Request gateway settings
    pub gateway: GatewayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_path: DEFAULT_STORAGE_PATH.to_string(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read the config from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the config through a variable lookup function
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_path = lookup(ENV_STORAGE_PATH)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_STORAGE_PATH.to_string());

        Self {
            storage_path,
            gateway: GatewayConfig::from_lookup(&lookup),
        }
    }

    /// Set the storage path
    pub fn with_storage_path(mut self, path: impl Into<String>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Set the gateway config
    pub fn with_gateway(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = gateway;
        self
    }
}

/// Install the global tracing subscriber
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Fails if a
/// subscriber is already installed.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("failed to install tracing subscriber")
}

/// A ready-to-use client: restored session, gateway and endpoint groups
#[derive(Debug)]
pub struct App {
    config: AppConfig,
    session: Arc<SessionStore>,
    gateway: Arc<Gateway>,
    api: Api,
}

impl App {
    /// Open secure storage at the configured path and wire everything up
    pub async fn bootstrap(config: AppConfig) -> anyhow::Result<Self> {
        let store = KvStore::new(KvConfig::new(config.storage_path.clone()))
            .with_context(|| format!("failed to open secure storage at {}", config.storage_path))?;

        Self::bootstrap_with_storage(config, Arc::new(store)).await
    }

    /// Wire everything up over the given secure storage
    ///
    /// A stored session is restored when present. An unreadable store is
    /// logged and the app starts logged out.
    pub async fn bootstrap_with_storage(
        config: AppConfig,
        storage: Arc<dyn SecureStorage>,
    ) -> anyhow::Result<Self> {
        let session = Arc::new(SessionStore::new(storage));

        match session.load().await {
            Ok(Some(restored)) => tracing::info!(user = %restored.user.id, "restored saved session"),
            Ok(None) => tracing::info!("no saved session"),
            Err(e) => tracing::warn!("Could not restore saved session, starting logged out: {}", e),
        }

        let gateway = Gateway::new(config.gateway.clone(), session.clone())
            .context("failed to build HTTP client")?;
        let gateway = Arc::new(gateway);
        let api = Api::new(gateway.clone());

        tracing::debug!(base_url = %config.gateway.base_url, "client ready");

        Ok(Self { config, session, gateway, api })
    }

    /// Endpoint groups
    pub fn api(&self) -> &Api {
        &self.api
    }

    /// Session store
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Request gateway
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Active configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The user of the active session, if any
    pub async fn current_user(&self) -> Option<User> {
        self.session.current_user().await
    }
}
