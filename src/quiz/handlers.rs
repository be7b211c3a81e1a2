use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{
    dto::{QuestionSheet, QuestionView, SubmitRequest, SubmitResponse, TopicList},
    grading::QuestionKind,
    repo,
    repo_types::{AttemptSummary, Quiz},
    services,
};
use crate::{
    auth::AuthUser,
    catalog::{
        self,
        repo_types::{Course, Level, Subject},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quiz", get(quiz_courses))
        .route("/quiz/level/:course_id", get(quiz_levels))
        .route("/quiz/subject/:level_id", get(quiz_subjects))
        .route("/quiz/topic/:subject_id", get(quiz_topics))
        .route("/quiz/type/:subject_id/:qtype/:topic", get(questions_by_type))
        .route("/quiz/submit/:subject_id/:topic/:qtype", post(submit_topic))
        .route("/quiz/take/:quiz_id", get(practice_sheet).post(submit_sheet))
        .route("/quiz/attempts", get(my_attempts))
}

fn parse_kind(raw: &str) -> AppResult<QuestionKind> {
    raw.parse()
        .map_err(|_| AppError::validation("Question type must be objective or theory"))
}

async fn subject_quiz(state: &AppState, subject_id: Uuid) -> AppResult<Quiz> {
    repo::quiz_for_subject(&state.db, subject_id)
        .await?
        .ok_or_else(|| AppError::not_found("No quiz available for this subject."))
}

#[instrument(skip(state))]
pub async fn quiz_courses(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> AppResult<Json<Vec<Course>>> {
    Ok(Json(catalog::repo::courses(&state.db, None).await?))
}

#[instrument(skip(state))]
pub async fn quiz_levels(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Vec<Level>>> {
    Ok(Json(catalog::repo::levels(&state.db, course_id).await?))
}

#[instrument(skip(state))]
pub async fn quiz_subjects(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(level_id): Path<Uuid>,
) -> AppResult<Json<Vec<Subject>>> {
    Ok(Json(repo::subjects_with_quiz(&state.db, level_id).await?))
}

#[instrument(skip(state))]
pub async fn quiz_topics(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(subject_id): Path<Uuid>,
) -> AppResult<Json<TopicList>> {
    let quiz = subject_quiz(&state, subject_id).await?;
    let topics = repo::topics(&state.db, quiz.id).await?;
    Ok(Json(TopicList {
        subject_id,
        quiz_id: quiz.id,
        topics,
    }))
}

#[instrument(skip(state))]
pub async fn questions_by_type(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path((subject_id, qtype, topic)): Path<(Uuid, String, String)>,
) -> AppResult<Json<QuestionSheet>> {
    let kind = parse_kind(&qtype)?;
    let quiz = subject_quiz(&state, subject_id).await?;
    let questions = repo::questions_by(&state.db, quiz.id, kind, &topic).await?;
    Ok(Json(QuestionSheet {
        quiz_id: quiz.id,
        questions: questions.into_iter().map(QuestionView::from).collect(),
    }))
}

/// Grades the topic/kind slice of the subject's quiz.
#[instrument(skip(state, payload))]
pub async fn submit_topic(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((subject_id, topic, qtype)): Path<(Uuid, String, String)>,
    Json(payload): Json<SubmitRequest>,
) -> AppResult<(StatusCode, Json<SubmitResponse>)> {
    let kind = parse_kind(&qtype)?;
    let quiz = subject_quiz(&state, subject_id).await?;
    let questions = repo::questions_by(&state.db, quiz.id, kind, &topic).await?;
    if questions.is_empty() {
        warn!(%subject_id, %topic, ?kind, "submission against empty question set");
    }
    let (attempt, score) =
        services::submit(&state.db, user_id, quiz.id, &questions, &payload.answers).await?;
    Ok((StatusCode::CREATED, Json(SubmitResponse::new(attempt, score))))
}

#[instrument(skip(state))]
pub async fn practice_sheet(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(quiz_id): Path<Uuid>,
) -> AppResult<Json<QuestionSheet>> {
    let quiz = repo::find_quiz(&state.db, quiz_id)
        .await?
        .ok_or_else(|| AppError::not_found("Quiz not available for this subject yet."))?;
    let questions = repo::questions(&state.db, quiz.id).await?;
    let sheet = services::practice_sheet(questions, &mut rand::thread_rng());
    Ok(Json(QuestionSheet {
        quiz_id: quiz.id,
        questions: sheet.into_iter().map(QuestionView::from).collect(),
    }))
}

/// Grades against the whole quiz, not just the questions that were drawn.
#[instrument(skip(state, payload))]
pub async fn submit_sheet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<SubmitRequest>,
) -> AppResult<(StatusCode, Json<SubmitResponse>)> {
    let quiz = repo::find_quiz(&state.db, quiz_id)
        .await?
        .ok_or_else(|| AppError::not_found("Quiz not available for this subject yet."))?;
    let questions = repo::questions(&state.db, quiz.id).await?;
    let (attempt, score) =
        services::submit(&state.db, user_id, quiz.id, &questions, &payload.answers).await?;
    Ok((StatusCode::CREATED, Json(SubmitResponse::new(attempt, score))))
}

#[instrument(skip(state))]
pub async fn my_attempts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<AttemptSummary>>> {
    Ok(Json(repo::attempts_for_user(&state.db, user_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_path_segment() {
        assert_eq!(parse_kind("theory").unwrap(), QuestionKind::Theory);
        assert!(matches!(parse_kind("essay"), Err(AppError::Validation(_))));
    }
}
