//! Search and feedback

use crate::envelope::ApiResponse;
use crate::gateway::Gateway;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Id of the matched item
    pub id: String,
    /// Item category, e.g. `vocabulary` or `grammar`
    #[serde(rename = "type")]
    pub kind: String,
    /// Display title
    pub title: String,
    /// Matched excerpt
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Search response
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResults {
    /// Matches, best first
    pub results: Vec<SearchHit>,
    /// Total matches on the server
    pub total: u32,
}

/// User feedback about the app or a piece of content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// Free-form category, e.g. `bug` or `content`
    pub category: String,
    /// What the user wrote
    pub message: String,
    /// Optional 1 to 5 rating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

/// Search and feedback
#[derive(Debug, Clone)]
pub struct MiscApi {
    gateway: Arc<Gateway>,
}

impl MiscApi {
    /// Create the group over `gateway`
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Search learning content
    ///
    /// A blank query returns no results without contacting the server.
    pub async fn search(&self, query: &str) -> ApiResponse<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return ApiResponse::ok(SearchResults::default());
        }
        self.gateway.get("/search", &[("q", query)]).await
    }

    /// Send feedback
    pub async fn send_feedback(&self, feedback: &Feedback) -> ApiResponse<()> {
        self.gateway
            .post::<IgnoredAny, _>("/feedback", feedback)
            .await
            .map(|_| ())
    }
}
