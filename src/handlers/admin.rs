// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError, models::answer::ReviewAnswerRequest, services::session::SessionService,
};

/// Records a manual verdict on a free-text answer.
/// Admin only.
pub async fn review_answer(
    State(sessions): State<SessionService>,
    Path((session_id, question_id)): Path<(i64, i64)>,
    Json(req): Json<ReviewAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions
        .review_answer(session_id, question_id, req)
        .await?;
    Ok(Json(session))
}

/// Runs one expiry pass immediately instead of waiting for the next tick.
/// Admin only.
pub async fn sweep_expired(
    State(sessions): State<SessionService>,
) -> Result<impl IntoResponse, AppError> {
    let report = sessions.process_expired_sessions().await?;
    Ok(Json(report))
}
