// src/handlers/session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError, models::answer::SubmitAnswerRequest, services::session::SessionService,
    utils::jwt::Claims,
};

/// Lists the caller's sessions, newest first.
pub async fn list_sessions(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let history = sessions.list_user_sessions(claims.user_id()?).await?;
    Ok(Json(history))
}

pub async fn get_session(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions.get_session(session_id, claims.user_id()?).await?;
    Ok(Json(session))
}

pub async fn pause_session(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions.pause_session(session_id, claims.user_id()?).await?;
    Ok(Json(session))
}

/// Resumes a paused session.
///
/// Fails with 400 `expired` (and times the session out) if no time is left.
pub async fn resume_session(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions.resume_session(session_id, claims.user_id()?).await?;
    Ok(Json(session))
}

pub async fn abandon_session(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions.abandon_session(session_id, claims.user_id()?).await?;
    Ok(Json(session))
}

/// Submits the whole quiz for grading.
pub async fn submit_quiz(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions.submit_quiz(session_id, claims.user_id()?).await?;
    Ok(Json(session))
}

pub async fn current_question(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions
        .current_question(session_id, claims.user_id()?)
        .await?;
    Ok(Json(view))
}

pub async fn question_by_index(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path((session_id, index)): Path<(i64, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions
        .question_by_index(session_id, index, claims.user_id()?)
        .await?;
    Ok(Json(view))
}

pub async fn next_question(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.next_question(session_id, claims.user_id()?).await?;
    Ok(Json(view))
}

pub async fn previous_question(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions
        .previous_question(session_id, claims.user_id()?)
        .await?;
    Ok(Json(view))
}

/// Records an answer to one question and returns immediate feedback.
pub async fn submit_answer(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let feedback = sessions
        .submit_answer(session_id, claims.user_id()?, req)
        .await?;
    Ok(Json(feedback))
}

/// Per-question breakdown of a finished session.
pub async fn get_result(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sessions.get_result(session_id, claims.user_id()?).await?;
    Ok(Json(result))
}
