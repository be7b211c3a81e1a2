use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    grading::{QuestionKind, Score},
    repo_types::{AttemptSummary, Question, Quiz, QuizAttempt},
};
use crate::catalog::repo_types::Subject;

const QUESTION_COLUMNS: &str = "id, quiz_id, text, kind, correct_answer, topic, options";

/// Subjects that have at least one quiz at `level_id`.
pub async fn subjects_with_quiz(db: &PgPool, level_id: Uuid) -> anyhow::Result<Vec<Subject>> {
    let rows = sqlx::query_as::<_, Subject>(
        r#"
        SELECT DISTINCT s.id, s.name, s.subject_type
          FROM subjects s
          JOIN quizzes q ON q.subject_id = s.id
         WHERE q.level_id = $1
         ORDER BY s.name
        "#,
    )
    .bind(level_id)
    .fetch_all(db)
    .await
    .context("list subjects with quiz")?;
    Ok(rows)
}

pub async fn find_quiz(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Quiz>> {
    let row = sqlx::query_as::<_, Quiz>(
        "SELECT id, subject_id, level_id, name, created_at FROM quizzes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find quiz")?;
    Ok(row)
}

/// The subject's oldest quiz.
pub async fn quiz_for_subject(db: &PgPool, subject_id: Uuid) -> anyhow::Result<Option<Quiz>> {
    let row = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, subject_id, level_id, name, created_at
          FROM quizzes
         WHERE subject_id = $1
         ORDER BY created_at, id
         LIMIT 1
        "#,
    )
    .bind(subject_id)
    .fetch_optional(db)
    .await
    .context("find quiz for subject")?;
    Ok(row)
}

pub async fn topics(db: &PgPool, quiz_id: Uuid) -> anyhow::Result<Vec<String>> {
    let rows: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT topic
          FROM questions
         WHERE quiz_id = $1 AND topic IS NOT NULL
         ORDER BY topic
        "#,
    )
    .bind(quiz_id)
    .fetch_all(db)
    .await
    .context("list quiz topics")?;
    Ok(rows)
}

pub async fn questions(db: &PgPool, quiz_id: Uuid) -> anyhow::Result<Vec<Question>> {
    let rows = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = $1 ORDER BY id"
    ))
    .bind(quiz_id)
    .fetch_all(db)
    .await
    .context("list questions")?;
    Ok(rows)
}

pub async fn questions_by(
    db: &PgPool,
    quiz_id: Uuid,
    kind: QuestionKind,
    topic: &str,
) -> anyhow::Result<Vec<Question>> {
    let rows = sqlx::query_as::<_, Question>(&format!(
        r#"
        SELECT {QUESTION_COLUMNS}
          FROM questions
         WHERE quiz_id = $1 AND kind = $2 AND topic = $3
         ORDER BY id
        "#
    ))
    .bind(quiz_id)
    .bind(kind.as_str())
    .bind(topic)
    .fetch_all(db)
    .await
    .context("list questions by kind and topic")?;
    Ok(rows)
}

pub async fn insert_attempt(
    db: &PgPool,
    user_id: Uuid,
    quiz_id: Uuid,
    score: &Score,
) -> anyhow::Result<QuizAttempt> {
    let row = sqlx::query_as::<_, QuizAttempt>(
        r#"
        INSERT INTO quiz_attempts (user_id, quiz_id, score, grade, correct, total)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, quiz_id, score, grade, correct, total, completed_at
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(score.percentage)
    .bind(score.grade.as_str())
    .bind(score.correct as i32)
    .bind(score.total as i32)
    .fetch_one(db)
    .await
    .context("insert quiz attempt")?;
    Ok(row)
}

pub async fn attempts_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<AttemptSummary>> {
    let rows = sqlx::query_as::<_, AttemptSummary>(
        r#"
        SELECT a.id, a.quiz_id, q.name AS quiz_name, s.name AS subject_name,
               a.score, a.grade, a.correct, a.total, a.completed_at
          FROM quiz_attempts a
          JOIN quizzes q ON q.id = a.quiz_id
          JOIN subjects s ON s.id = q.subject_id
         WHERE a.user_id = $1
         ORDER BY a.completed_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list quiz attempts")?;
    Ok(rows)
}
