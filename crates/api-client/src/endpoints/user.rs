//! Profile and user statistics endpoints

use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::session::{SessionError, User};
use crate::transport::ApiRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Editable profile fields; unset fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New given name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// New family name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// New avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Learning totals for the current user
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    /// Lifetime experience points
    pub total_xp: u64,
    /// Current level
    pub level: u32,
    /// Vocabulary words marked as learned
    pub words_learned: u32,
    /// Completed lessons across all skills
    pub lessons_completed: u32,
    /// Current daily streak
    pub current_streak: u32,
    /// Best daily streak
    pub longest_streak: u32,
    /// Total practice time
    pub time_spent_minutes: u32,
}

/// An entry in the user's activity feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Activity id
    pub id: String,
    /// Activity category, e.g. `vocabulary` or `writing`
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable summary
    #[serde(default)]
    pub description: String,
    /// Experience points awarded
    #[serde(default)]
    pub xp_earned: u32,
    /// When the activity happened
    pub created_at: DateTime<Utc>,
}

/// Profile and user statistics
#[derive(Debug, Clone)]
pub struct UserApi {
    gateway: Arc<Gateway>,
}

impl UserApi {
    /// Create the group over `gateway`
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Fetch the current user's profile
    pub async fn profile(&self) -> ApiResponse<User> {
        self.gateway.get("/user/profile", &[]).await
    }

    /// Update the profile and the stored user record
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResponse<User> {
        self.apply_update(update).await.into()
    }

    /// Fetch learning totals
    pub async fn stats(&self) -> ApiResponse<UserStats> {
        self.gateway.get("/user/stats", &[]).await
    }

    /// Fetch the most recent activities
    pub async fn activities(&self, limit: u32) -> ApiResponse<Vec<Activity>> {
        let limit = limit.to_string();
        self.gateway.get("/user/activities", &[("limit", limit.as_str())]).await
    }

    async fn apply_update(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let user: User = self.gateway.send_json(ApiRequest::put("/user/profile"), update).await?;

        match self.gateway.session().update_user(user.clone()).await {
            Ok(()) | Err(SessionError::NoSession) => Ok(user),
            Err(e) => Err(ApiError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use crate::test_utils::{fixtures, scripted_gateway, ScriptedTransport};
    use crate::transport::HttpMethod;
    use chrono::TimeZone;

    fn api(transport: &Arc<ScriptedTransport>, session: &Arc<SessionStore>) -> UserApi {
        UserApi::new(Arc::new(scripted_gateway(transport.clone(), session.clone())))
    }

    #[tokio::test]
    async fn test_profile() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, serde_json::to_value(fixtures::user()).unwrap());
        let session = Arc::new(SessionStore::in_memory());

        let response = api(&transport, &session).profile().await;

        assert_eq!(response.into_data(), Some(fixtures::user()));
        assert_eq!(transport.paths(), vec!["/user/profile"]);
    }

    #[tokio::test]
    async fn test_update_profile_updates_stored_user() {
        let mut updated = fixtures::user();
        updated.first_name = "Anabel".to_string();

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, serde_json::to_value(&updated).unwrap());
        let session = Arc::new(SessionStore::in_memory());
        session.save(fixtures::session("tok")).await.unwrap();

        let update = ProfileUpdate {
            first_name: Some("Anabel".to_string()),
            ..Default::default()
        };
        let response = api(&transport, &session).update_profile(&update).await;

        assert!(response.is_success());
        assert_eq!(session.current_user().await.unwrap().first_name, "Anabel");
        assert_eq!(transport.last_request().unwrap().method, HttpMethod::Put);
    }

    #[tokio::test]
    async fn test_stats_tolerates_missing_fields() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, serde_json::json!({"totalXp": 800, "wordsLearned": 42}));
        let session = Arc::new(SessionStore::in_memory());

        let stats = api(&transport, &session).stats().await.into_data().unwrap();

        assert_eq!(stats.total_xp, 800);
        assert_eq!(stats.words_learned, 42);
        assert_eq!(stats.longest_streak, 0);
    }

    #[tokio::test]
    async fn test_activities() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(
            200,
            serde_json::json!([{
                "id": "act-1",
                "type": "writing",
                "description": "Finished a prompt",
                "xpEarned": 30,
                "createdAt": "2024-03-01T10:00:00Z"
            }]),
        );
        let session = Arc::new(SessionStore::in_memory());

        let activities = api(&transport, &session).activities(5).await.into_data().unwrap();

        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].kind, "writing");
        assert_eq!(activities[0].created_at, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        assert_eq!(
            transport.last_request().unwrap().params,
            vec![("limit".to_string(), "5".to_string())]
        );
    }
}
