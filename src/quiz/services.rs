use std::collections::HashMap;

use rand::{seq::SliceRandom, Rng};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    grading::{self, QuestionKind, Score},
    repo,
    repo_types::{Question, QuizAttempt},
};
use crate::error::AppResult;

pub const SHEET_OBJECTIVES: usize = 30;
pub const SHEET_THEORY: usize = 20;

/// Draws up to 30 objective and 20 theory questions and shuffles them together.
pub fn practice_sheet<R: Rng + ?Sized>(questions: Vec<Question>, rng: &mut R) -> Vec<Question> {
    let (objective, theory): (Vec<_>, Vec<_>) = questions
        .into_iter()
        .partition(|q| q.kind == QuestionKind::Objective);

    let mut sheet: Vec<Question> = objective
        .choose_multiple(rng, SHEET_OBJECTIVES)
        .cloned()
        .chain(theory.choose_multiple(rng, SHEET_THEORY).cloned())
        .collect();
    sheet.shuffle(rng);
    sheet
}

/// Grades `answers` against `questions` and records the attempt.
#[instrument(skip(db, questions, answers), fields(questions = questions.len()))]
pub async fn submit(
    db: &PgPool,
    user_id: Uuid,
    quiz_id: Uuid,
    questions: &[Question],
    answers: &HashMap<Uuid, String>,
) -> AppResult<(QuizAttempt, Score)> {
    let score = grading::score(questions, answers);
    let attempt = repo::insert_attempt(db, user_id, quiz_id, &score).await?;
    info!(
        attempt_id = %attempt.id,
        %user_id,
        %quiz_id,
        correct = score.correct,
        total = score.total,
        grade = score.grade.as_str(),
        "quiz attempt recorded"
    );
    Ok((attempt, score))
}
