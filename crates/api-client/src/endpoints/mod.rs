//! Typed endpoint groups
//!
//! Each group wraps the [`Gateway`] for one area of the backend and decodes
//! responses into explicit DTOs. A body that does not match its DTO surfaces
//! as a failed envelope with a parse message.

mod auth;
mod learning;
mod misc;
mod progress;
mod user;

pub use auth::{AuthApi, LoginRequest, RegisterRequest};
pub use learning::{
    Answer, Correction, ExerciseResult, GrammarLesson, GrammarLessonDetail, LearningApi,
    ListeningExercise, Question, ReadingPassage, ReadingPassageDetail, ReviewResult,
    SpeakingExercise, SpeakingRecording, SpeakingResult, VocabularyWord, WritingFeedback,
    WritingPrompt,
};
pub use misc::{Feedback, MiscApi, SearchHit, SearchResults};
pub use progress::{
    Achievement, LeaderboardEntry, LeaderboardPeriod, LevelProgress, OverallStats, PrestigeStatus,
    ProgressApi, Streak,
};
pub use user::{Activity, ProfileUpdate, UserApi, UserStats};

use crate::gateway::Gateway;
use std::sync::Arc;

/// All endpoint groups over one shared gateway
#[derive(Debug, Clone)]
pub struct Api {
    /// Login, registration and session lifecycle
    pub auth: AuthApi,
    /// Profile and user statistics
    pub user: UserApi,
    /// Practice content and submissions
    pub learning: LearningApi,
    /// Streaks, achievements, levels and leaderboards
    pub progress: ProgressApi,
    /// Search and feedback
    pub misc: MiscApi,
}

impl Api {
    /// Build every group over `gateway`
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            auth: AuthApi::new(gateway.clone()),
            user: UserApi::new(gateway.clone()),
            learning: LearningApi::new(gateway.clone()),
            progress: ProgressApi::new(gateway.clone()),
            misc: MiscApi::new(gateway),
        }
    }
}

/// Join a path prefix and an id, percent-encoding the id
fn resource_path(prefix: &str, id: &str) -> String {
    format!("{}/{}", prefix, urlencoding::encode(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_path_encodes_ids() {
        assert_eq!(resource_path("/vocabulary", "w-12"), "/vocabulary/w-12");
        assert_eq!(resource_path("/grammar/lessons", "a/b c"), "/grammar/lessons/a%2Fb%20c");
    }
}
