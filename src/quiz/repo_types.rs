use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::grading::{Grade, QuestionKind};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub level_id: Uuid,
    pub name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Full question row, including the answer key. Never serialized directly.
#[derive(Debug, Clone, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub text: String,
    #[sqlx(try_from = "String")]
    pub kind: QuestionKind,
    pub correct_answer: Option<String>,
    pub topic: Option<String>,
    pub options: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub score: f64,
    #[sqlx(try_from = "String")]
    pub grade: Grade,
    pub correct: i32,
    pub total: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

/// Attempt history entry with the quiz's subject for display.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttemptSummary {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub quiz_name: Option<String>,
    pub subject_name: String,
    pub score: f64,
    #[sqlx(try_from = "String")]
    pub grade: Grade,
    pub correct: i32,
    pub total: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}
