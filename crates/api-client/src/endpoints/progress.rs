//! Streaks, statistics and gamification

use crate::envelope::ApiResponse;
use crate::gateway::Gateway;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Daily streak
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Streak {
    /// Consecutive days with activity, including today
    pub current: u32,
    /// Best run so far
    pub longest: u32,
    /// Most recent day with activity
    pub last_activity: Option<DateTime<Utc>>,
}

/// Aggregate learning statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OverallStats {
    /// Lifetime experience points
    pub total_xp: u64,
    /// Current level
    pub level: u32,
    /// Vocabulary words marked as learned
    pub words_learned: u32,
    /// Exercises completed across all skills
    pub exercises_completed: u32,
    /// Share of correct answers, 0.0 to 1.0
    pub accuracy: f64,
}

/// An achievement and the user's progress towards it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    /// Achievement id
    pub id: String,
    /// Title
    pub title: String,
    /// What it takes to unlock
    #[serde(default)]
    pub description: String,
    /// Icon name or URL
    #[serde(default)]
    pub icon: Option<String>,
    /// Whether it is unlocked
    #[serde(default)]
    pub unlocked: bool,
    /// When it was unlocked
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
    /// Progress towards `target`
    #[serde(default)]
    pub progress: u32,
    /// Progress needed to unlock
    #[serde(default)]
    pub target: u32,
}

/// Level and experience towards the next one
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LevelProgress {
    /// Current level
    pub level: u32,
    /// Experience gathered within the current level
    pub current_xp: u64,
    /// Experience the current level requires
    pub xp_for_next_level: u64,
}

impl LevelProgress {
    /// Fraction of the current level completed, clamped to 0.0..=1.0
    pub fn fraction(&self) -> f64 {
        if self.xp_for_next_level == 0 {
            return 1.0;
        }
        (self.current_xp as f64 / self.xp_for_next_level as f64).clamp(0.0, 1.0)
    }
}

/// Prestige state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PrestigeStatus {
    /// Times the user has prestiged
    pub prestige_level: u32,
    /// Whether the user can prestige now
    pub can_prestige: bool,
    /// Level required to prestige
    pub required_level: u32,
}

/// Leaderboard time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeaderboardPeriod {
    /// Today
    Daily,
    /// This week
    #[default]
    Weekly,
    /// This month
    Monthly,
    /// Since the beginning
    AllTime,
}

impl LeaderboardPeriod {
    /// Query value for this period
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardPeriod::Daily => "daily",
            LeaderboardPeriod::Weekly => "weekly",
            LeaderboardPeriod::Monthly => "monthly",
            LeaderboardPeriod::AllTime => "allTime",
        }
    }
}

/// A row of the leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Position, starting at 1
    pub rank: u32,
    /// User id
    pub user_id: String,
    /// Username
    pub username: String,
    /// Avatar URL
    #[serde(default)]
    pub avatar: Option<String>,
    /// Experience gathered in the period
    #[serde(default)]
    pub xp: u64,
}

/// Streaks, statistics and gamification
#[derive(Debug, Clone)]
pub struct ProgressApi {
    gateway: Arc<Gateway>,
}

impl ProgressApi {
    /// Create the group over `gateway`
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Fetch the daily streak
    pub async fn streak(&self) -> ApiResponse<Streak> {
        self.gateway.get("/streak", &[]).await
    }

    /// Fetch aggregate statistics
    pub async fn stats(&self) -> ApiResponse<OverallStats> {
        self.gateway.get("/stats", &[]).await
    }

    /// List achievements
    pub async fn achievements(&self) -> ApiResponse<Vec<Achievement>> {
        self.gateway.get("/gamification/achievements", &[]).await
    }

    /// Fetch level progress
    pub async fn level(&self) -> ApiResponse<LevelProgress> {
        self.gateway.get("/gamification/level", &[]).await
    }

    /// Fetch prestige state
    pub async fn prestige(&self) -> ApiResponse<PrestigeStatus> {
        self.gateway.get("/gamification/prestige", &[]).await
    }

    /// Prestige: reset the level in exchange for a prestige rank
    pub async fn do_prestige(&self) -> ApiResponse<PrestigeStatus> {
        self.gateway.post_empty("/gamification/prestige").await
    }

    /// Fetch the leaderboard for `period`
    pub async fn leaderboard(&self, period: LeaderboardPeriod) -> ApiResponse<Vec<LeaderboardEntry>> {
        self.gateway
            .get("/gamification/leaderboard", &[("period", period.as_str())])
            .await
    }
}
