//! Practice content and submissions
//!
//! Vocabulary, writing, reading, listening, speaking and grammar exercises.

use super::resource_path;
use crate::envelope::ApiResponse;
use crate::gateway::Gateway;
use crate::transport::MultipartForm;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// DTOs
// =============================================================================

/// A vocabulary entry with the user's mastery of it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyWord {
    /// Word id
    pub id: String,
    /// The word in the target language
    pub word: String,
    /// Translation in the user's language
    pub translation: String,
    /// Phonetic transcription
    #[serde(default)]
    pub pronunciation: Option<String>,
    /// Example sentence
    #[serde(default)]
    pub example: Option<String>,
    /// CEFR level, e.g. `A2`
    #[serde(default)]
    pub level: String,
    /// Mastery from 0 to 100
    #[serde(default)]
    pub mastery: u8,
}

/// Outcome of reviewing a vocabulary word
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewResult {
    /// Updated mastery from 0 to 100
    pub mastery: u8,
    /// Experience points awarded
    pub xp_earned: u32,
}

/// A writing exercise
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WritingPrompt {
    /// Prompt id
    pub id: String,
    /// Short title
    pub title: String,
    /// Instructions shown to the learner
    pub prompt: String,
    /// CEFR level
    #[serde(default)]
    pub level: String,
    /// Minimum expected length
    #[serde(default)]
    pub min_words: Option<u32>,
}

/// A single suggested fix in a writing submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    /// Text as written
    pub original: String,
    /// Suggested replacement
    pub suggestion: String,
    /// Why the change is suggested
    #[serde(default)]
    pub explanation: String,
}

/// Evaluation of a writing submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WritingFeedback {
    /// Score from 0 to 100
    pub score: u32,
    /// Overall comment
    #[serde(default)]
    pub feedback: String,
    /// Line-level corrections
    #[serde(default)]
    pub corrections: Vec<Correction>,
    /// Experience points awarded
    #[serde(default)]
    pub xp_earned: u32,
}

/// Reading passage summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPassage {
    /// Passage id
    pub id: String,
    /// Title
    pub title: String,
    /// CEFR level
    #[serde(default)]
    pub level: String,
    /// Estimated reading time
    #[serde(default)]
    pub estimated_minutes: u32,
}

/// A comprehension question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Question id
    pub id: String,
    /// Question text
    pub prompt: String,
    /// Choices for multiple-choice questions; empty for free text
    #[serde(default)]
    pub options: Vec<String>,
}

/// Full reading passage with its questions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPassageDetail {
    /// Passage id
    pub id: String,
    /// Title
    pub title: String,
    /// CEFR level
    #[serde(default)]
    pub level: String,
    /// Passage text
    pub content: String,
    /// Comprehension questions
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// A listening exercise with its questions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListeningExercise {
    /// Exercise id
    pub id: String,
    /// Title
    pub title: String,
    /// CEFR level
    #[serde(default)]
    pub level: String,
    /// Audio to play
    pub audio_url: String,
    /// Comprehension questions
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// An answer to a comprehension question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    /// Question being answered
    pub question_id: String,
    /// Selected option or free text
    pub answer: String,
}

impl Answer {
    /// Create an answer
    pub fn new(question_id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { question_id: question_id.into(), answer: answer.into() }
    }
}

/// Score for a set of answers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExerciseResult {
    /// Score from 0 to 100
    pub score: u32,
    /// Correct answers
    pub correct: u32,
    /// Questions answered
    pub total: u32,
    /// Experience points awarded
    pub xp_earned: u32,
}

/// A speaking exercise
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeakingExercise {
    /// Exercise id
    pub id: String,
    /// What the learner is asked to say
    pub prompt: String,
    /// CEFR level
    #[serde(default)]
    pub level: String,
    /// Reference sentence, when the exercise is read-aloud
    #[serde(default)]
    pub expected_text: Option<String>,
}

/// A recorded answer to a speaking exercise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakingRecording {
    /// File name reported to the server
    pub file_name: String,
    /// e.g. `audio/m4a`
    pub mime_type: String,
    /// Encoded audio
    pub bytes: Vec<u8>,
}

/// Evaluation of a speaking submission
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeakingResult {
    /// Score from 0 to 100
    pub score: u32,
    /// What the server heard
    pub transcript: String,
    /// Pronunciation feedback
    pub feedback: String,
    /// Experience points awarded
    pub xp_earned: u32,
}

/// Grammar lesson summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrammarLesson {
    /// Lesson id
    pub id: String,
    /// Title
    pub title: String,
    /// CEFR level
    #[serde(default)]
    pub level: String,
    /// One-line summary
    #[serde(default)]
    pub summary: String,
}

/// Full grammar lesson
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrammarLessonDetail {
    /// Lesson id
    pub id: String,
    /// Title
    pub title: String,
    /// CEFR level
    #[serde(default)]
    pub level: String,
    /// Lesson body
    pub content: String,
    /// Example sentences
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Serialize)]
struct ReviewBody {
    correct: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WritingSubmission<'a> {
    prompt_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct AnswerSheet<'a> {
    answers: &'a [Answer],
}

// =============================================================================
// Endpoints
// =============================================================================

/// Practice content and submissions
#[derive(Debug, Clone)]
pub struct LearningApi {
    gateway: Arc<Gateway>,
}

impl LearningApi {
    /// Create the group over `gateway`
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// List vocabulary, optionally filtered by level
    pub async fn vocabulary(&self, level: Option<&str>) -> ApiResponse<Vec<VocabularyWord>> {
        match level {
            Some(level) => self.gateway.get("/vocabulary", &[("level", level)]).await,
            None => self.gateway.get("/vocabulary", &[]).await,
        }
    }

    /// Fetch one vocabulary word
    pub async fn vocabulary_word(&self, id: &str) -> ApiResponse<VocabularyWord> {
        self.gateway.get(&resource_path("/vocabulary", id), &[]).await
    }

    /// Record a review of a vocabulary word
    pub async fn review_word(&self, id: &str, correct: bool) -> ApiResponse<ReviewResult> {
        let path = format!("{}/review", resource_path("/vocabulary", id));
        self.gateway.post(&path, &ReviewBody { correct }).await
    }

    /// List writing prompts
    pub async fn writing_prompts(&self) -> ApiResponse<Vec<WritingPrompt>> {
        self.gateway.get("/writing/prompts", &[]).await
    }

    /// Submit text for a writing prompt
    pub async fn submit_writing(&self, prompt_id: &str, text: &str) -> ApiResponse<WritingFeedback> {
        self.gateway
            .post("/writing/submit", &WritingSubmission { prompt_id, text })
            .await
    }

    /// List reading passages
    pub async fn reading_passages(&self) -> ApiResponse<Vec<ReadingPassage>> {
        self.gateway.get("/reading/passages", &[]).await
    }

    /// Fetch a reading passage with its questions
    pub async fn reading_passage(&self, id: &str) -> ApiResponse<ReadingPassageDetail> {
        self.gateway.get(&resource_path("/reading/passages", id), &[]).await
    }

    /// Submit answers for a reading passage
    pub async fn submit_reading_answers(&self, id: &str, answers: &[Answer]) -> ApiResponse<ExerciseResult> {
        let path = format!("{}/answers", resource_path("/reading/passages", id));
        self.gateway.post(&path, &AnswerSheet { answers }).await
    }

    /// List listening exercises
    pub async fn listening_exercises(&self) -> ApiResponse<Vec<ListeningExercise>> {
        self.gateway.get("/listening/exercises", &[]).await
    }

    /// Submit answers for a listening exercise
    pub async fn submit_listening_answers(&self, id: &str, answers: &[Answer]) -> ApiResponse<ExerciseResult> {
        let path = format!("{}/answers", resource_path("/listening/exercises", id));
        self.gateway.post(&path, &AnswerSheet { answers }).await
    }

    /// List speaking exercises
    pub async fn speaking_exercises(&self) -> ApiResponse<Vec<SpeakingExercise>> {
        self.gateway.get("/speaking/exercises", &[]).await
    }

    /// Upload a recording for a speaking exercise
    pub async fn submit_speaking(&self, id: &str, recording: SpeakingRecording) -> ApiResponse<SpeakingResult> {
        let path = format!("{}/submit", resource_path("/speaking/exercises", id));
        let form = MultipartForm::new()
            .text("exerciseId", id)
            .file("audio", recording.file_name, recording.mime_type, recording.bytes);
        self.gateway.upload(&path, form).await
    }

    /// List grammar lessons
    pub async fn grammar_lessons(&self) -> ApiResponse<Vec<GrammarLesson>> {
        self.gateway.get("/grammar/lessons", &[]).await
    }

    /// Fetch a grammar lesson
    pub async fn grammar_lesson(&self, id: &str) -> ApiResponse<GrammarLessonDetail> {
        self.gateway.get(&resource_path("/grammar/lessons", id), &[]).await
    }
}
