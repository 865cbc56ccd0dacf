//! Test doubles for the transport layer
//!
//! Available to this crate's tests and, with the `test-utils` feature, to
//! integration tests elsewhere in the workspace.

use crate::gateway::{Gateway, GatewayConfig};
use crate::middleware::RetryPolicy;
use crate::session::SessionStore;
use crate::transport::{ApiRequest, RawResponse, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::time::Instant;

/// A transport that replays a script of canned results and records requests
///
/// Results are consumed in order. Once the script is exhausted every call
/// fails with [`TransportError::Request`].
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
    sent_at: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    /// Create an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    pub fn push_response(&self, response: RawResponse) {
        self.script.lock().push_back(Ok(response));
    }

    /// Queue an empty response with the given status
    pub fn push_status(&self, status: u16) {
        self.push_response(RawResponse::new(status, Vec::new()));
    }

    /// Queue a JSON response
    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push_response(RawResponse::json(status, &body));
    }

    /// Queue a transport failure
    pub fn push_error(&self, error: TransportError) {
        self.script.lock().push_back(Err(error));
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().last().cloned()
    }

    /// Number of requests received
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Paths of the received requests, in order
    pub fn paths(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.path.clone()).collect()
    }

    /// Number of requests sent to `path`
    pub fn count_path(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.path == path).count()
    }

    /// When each request arrived (tokio clock, so pausable)
    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent_at.lock().clone()
    }

    /// Number of scripted results not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let path = request.path.clone();
        self.requests.lock().push(request);
        self.sent_at.lock().push(Instant::now());

        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request(format!("no scripted response for {}", path))))
    }
}

/// A gateway over `transport` that sends every request once
pub fn scripted_gateway(transport: Arc<ScriptedTransport>, session: Arc<SessionStore>) -> Gateway {
    let config = GatewayConfig::default().with_retry(RetryPolicy::no_retry());
    Gateway::with_transport(config, session, transport)
}

/// Canned records shared by tests
pub mod fixtures {
    use crate::session::{AuthPayload, Session, User};

    /// A fully populated user
    pub fn user() -> User {
        let mut user = User::new("u-1", "ana", "ana@example.com");
        user.first_name = "Ana".to_string();
        user.last_name = "Silva".to_string();
        user.level = 4;
        user.xp = 1250;
        user.streak = 9;
        user
    }

    /// An authenticated session for [`user`]
    pub fn session(token: &str) -> Session {
        Session::new(user(), token)
    }

    /// A login response body for [`user`]
    pub fn auth_payload(token: &str) -> serde_json::Value {
        serde_json::to_value(AuthPayload { token: token.to_string(), user: user() })
            .unwrap_or(serde_json::Value::Null)
    }
}
