// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError, models::leaderboard::LeaderboardQuery,
    services::session::SessionService, utils::jwt::Claims,
};

/// Starts a new session on a quiz for the caller.
///
/// * 201 with the session on success.
/// * 400 `conflict` if the caller already holds an active session for the quiz.
pub async fn start_session(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions.start_session(quiz_id, claims.user_id()?).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Reports whether the caller may start the quiz now, and why not otherwise.
pub async fn can_start(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let answer = sessions.can_start_session(quiz_id, claims.user_id()?).await?;
    Ok(Json(answer))
}

/// Public leaderboard of a quiz. Accepts `?limit=` or `?page=&size=`.
pub async fn get_leaderboard(
    State(sessions): State<SessionService>,
    Path(quiz_id): Path<i64>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = sessions.leaderboard(quiz_id, query).await?;
    Ok(Json(page))
}

/// The caller's best rank on a quiz.
pub async fn get_user_rank(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let rank = sessions.user_rank(quiz_id, claims.user_id()?).await?;
    Ok(Json(rank))
}
