//! Header injection

use crate::session::SessionStore;
use crate::transport::{ApiRequest, RawResponse, Transport, TransportError};
use async_trait::async_trait;
use std::sync::Arc;

/// Client identification header
pub const CLIENT_TYPE_HEADER: &str = "X-Client-Type";

/// App version header
pub const APP_VERSION_HEADER: &str = "X-App-Version";

/// Attaches client identification, content negotiation and the bearer token
///
/// The token is read from the [`SessionStore`] when the request is sent, so a
/// replay after a refresh picks up the new token. Multipart bodies get no
/// `Content-Type` here; the transport writes it together with the boundary.
pub struct HeaderLayer<T> {
    inner: T,
    session: Arc<SessionStore>,
    client_type: String,
    app_version: String,
}

impl<T> HeaderLayer<T> {
    /// Wrap `inner`
    pub fn new(
        inner: T,
        session: Arc<SessionStore>,
        client_type: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            session,
            client_type: client_type.into(),
            app_version: app_version.into(),
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for HeaderLayer<T> {
    async fn send(&self, mut request: ApiRequest) -> Result<RawResponse, TransportError> {
        request.set_header(CLIENT_TYPE_HEADER, self.client_type.as_str());
        request.set_header(APP_VERSION_HEADER, self.app_version.as_str());
        request.set_header("Accept", "application/json");

        if request.body.is_multipart() {
            request.remove_header("Content-Type");
        } else {
            request.set_header("Content-Type", "application/json");
        }

        match self.session.token().await {
            Some(token) => request.set_header("Authorization", format!("Bearer {}", token)),
            None => request.remove_header("Authorization"),
        }

        self.inner.send(request).await
    }
}
