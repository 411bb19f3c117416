// src/repository/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::AppError,
    models::{
        question::{AnswerOption, CatalogQuestion, QuestionType},
        quiz::{CorrectAnswer, Quiz},
        session::{NewSession, Session, SessionAnswer, SessionStatus},
    },
    repository::{QuizCatalog, SessionStore, SessionUnit},
};

const SESSION_COLUMNS: &str = "\
    id, user_id, quiz_id, status, created_at, started_at, finished_at, expires_at, \
    time_spent_seconds, total_questions, answered_questions, correct_answers, \
    current_question_index, score, points_earned, max_points, is_passed";

const ANSWER_COLUMNS: &str = "\
    id, session_id, question_id, selected_answer_id, selected_answer_ids, text_response, \
    is_correct, points_awarded, answered_at, time_spent_seconds, answer_order, is_reviewed, \
    reviewer_feedback";

/// Leaderboard order; mirrors `Session::ranking_cmp`.
const RANKING_ORDER: &str =
    "COALESCE(score, 0) DESC, time_spent_seconds ASC, finished_at ASC, id ASC";

/// Helper struct for fetching quiz headers.
#[derive(sqlx::FromRow)]
struct QuizRow {
    id: i64,
    title: String,
    is_active: bool,
    duration_minutes: i32,
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    #[sqlx(try_from = "String")]
    question_type: QuestionType,
    content: String,
    explanation: Option<String>,
}

#[derive(sqlx::FromRow)]
struct OptionRow {
    id: i64,
    question_id: i64,
    content: String,
    is_correct: bool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
}

/// Catalog reading the `quizzes`, `questions`, `answers` and `users` tables.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizCatalog for PgCatalog {
    async fn get_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, QuizRow>(
            "SELECT id, title, is_active, duration_minutes FROM quizzes WHERE id = $1",
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch quiz {}: {:?}", quiz_id, e);
            AppError::from(e)
        })?;

        let Some(quiz) = quiz else {
            return Ok(None);
        };

        let question_rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, question_type, content, explanation
            FROM questions
            WHERE quiz_id = $1
            ORDER BY position ASC, id ASC
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let question_ids: Vec<i64> = question_rows.iter().map(|q| q.id).collect();
        let option_rows = sqlx::query_as::<_, OptionRow>(
            r#"
            SELECT id, question_id, content, is_correct
            FROM answers
            WHERE question_id = ANY($1)
            ORDER BY position ASC, id ASC
            "#,
        )
        .bind(&question_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut options_by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
        for row in option_rows {
            options_by_question
                .entry(row.question_id)
                .or_default()
                .push(AnswerOption {
                    id: row.id,
                    content: row.content,
                    is_correct: row.is_correct,
                });
        }

        let questions = question_rows
            .into_iter()
            .map(|q| CatalogQuestion {
                options: options_by_question.remove(&q.id).unwrap_or_default(),
                id: q.id,
                question_type: q.question_type,
                content: q.content,
                explanation: q.explanation,
            })
            .collect();

        Ok(Some(Quiz {
            id: quiz.id,
            title: quiz.title,
            active: quiz.is_active,
            duration_minutes: quiz.duration_minutes,
            questions,
        }))
    }

    async fn correct_answer(&self, question_id: i64) -> Result<Option<CorrectAnswer>, AppError> {
        let question = sqlx::query_as::<_, QuestionRow>(
            "SELECT id, question_type, content, explanation FROM questions WHERE id = $1",
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(question) = question else {
            return Ok(None);
        };

        let correct_option_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM answers WHERE question_id = $1 AND is_correct ORDER BY id",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CorrectAnswer {
            question_id: question.id,
            question_type: question.question_type,
            correct_option_ids,
        }))
    }

    async fn display_names(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        // Use QueryBuilder for dynamic IN clause
        let mut query_builder =
            QueryBuilder::<Postgres>::new("SELECT id, username FROM users WHERE id IN (");
        let mut separated = query_builder.separated(",");
        for id in user_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<UserRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch display names: {:?}", e);
                AppError::from(e)
            })?;

        Ok(rows.into_iter().map(|u| (u.id, u.username)).collect())
    }
}

/// Session store over the `quiz_sessions` and `session_answers` tables.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn completed_status_names() -> Vec<&'static str> {
    SessionStatus::COMPLETED.iter().map(|s| s.as_str()).collect()
}

fn active_status_names() -> Vec<&'static str> {
    SessionStatus::ACTIVE.iter().map(|s| s.as_str()).collect()
}

#[async_trait]
impl SessionStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn SessionUnit>, AppError> {
        let tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to start transaction: {:?}", e);
            AppError::from(e)
        })?;
        Ok(Box::new(PgUnit { tx }))
    }

    async fn find_session(&self, session_id: i64) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM quiz_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn find_active_session_for(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM quiz_sessions WHERE user_id = $1 AND quiz_id = $2 AND status = ANY($3)",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(quiz_id)
        .bind(active_status_names())
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn find_session_answers(&self, session_id: i64) -> Result<Vec<SessionAnswer>, AppError> {
        let answers = sqlx::query_as::<_, SessionAnswer>(&format!(
            "SELECT {} FROM session_answers WHERE session_id = $1 ORDER BY answer_order, id",
            ANSWER_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn find_expired_sessions(&self, now: DateTime<Utc>) -> Result<Vec<Session>, AppError> {
        let sessions = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM quiz_sessions WHERE status = $1 AND expires_at <= $2 ORDER BY expires_at",
            SESSION_COLUMNS
        ))
        .bind(SessionStatus::InProgress.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch expired sessions: {:?}", e);
            AppError::from(e)
        })?;
        Ok(sessions)
    }

    async fn find_user_sessions(&self, user_id: i64) -> Result<Vec<Session>, AppError> {
        let sessions = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM quiz_sessions WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn completed_page(
        &self,
        quiz_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Session>, AppError> {
        let sessions = sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT {} FROM quiz_sessions
            WHERE quiz_id = $1 AND status = ANY($2)
            ORDER BY {}
            LIMIT $3 OFFSET $4
            "#,
            SESSION_COLUMNS, RANKING_ORDER
        ))
        .bind(quiz_id)
        .bind(completed_status_names())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch leaderboard page: {:?}", e);
            AppError::from(e)
        })?;
        Ok(sessions)
    }

    async fn count_completed(&self, quiz_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quiz_sessions WHERE quiz_id = $1 AND status = ANY($2)",
        )
        .bind(quiz_id)
        .bind(completed_status_names())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_outranking(&self, session: &Session) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM quiz_sessions
            WHERE quiz_id = $1 AND status = ANY($2)
              AND (COALESCE(score, 0) > $3
                   OR (COALESCE(score, 0) = $3 AND time_spent_seconds < $4))
            "#,
        )
        .bind(session.quiz_id)
        .bind(completed_status_names())
        .bind(session.final_score())
        .bind(session.time_spent_seconds)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn best_completed_for(
        &self,
        quiz_id: i64,
        user_id: i64,
    ) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT {} FROM quiz_sessions
            WHERE quiz_id = $1 AND user_id = $2 AND status = ANY($3)
            ORDER BY {}
            LIMIT 1
            "#,
            SESSION_COLUMNS, RANKING_ORDER
        ))
        .bind(quiz_id)
        .bind(user_id)
        .bind(completed_status_names())
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }
}

/// A Postgres transaction. Rolled back by sqlx when dropped uncommitted.
struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SessionUnit for PgUnit {
    async fn lock_session(&mut self, session_id: i64) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM quiz_sessions WHERE id = $1 FOR UPDATE",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(session)
    }

    async fn find_active_session_for(
        &mut self,
        user_id: i64,
        quiz_id: i64,
    ) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM quiz_sessions WHERE user_id = $1 AND quiz_id = $2 AND status = ANY($3) FOR UPDATE",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(quiz_id)
        .bind(active_status_names())
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(session)
    }

    async fn insert_session(&mut self, new: &NewSession) -> Result<Session, AppError> {
        // The partial unique index rejects a second active row for (user, quiz);
        // `From<sqlx::Error>` turns that violation into `Conflict`.
        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            INSERT INTO quiz_sessions (
                user_id, quiz_id, status, created_at, started_at, expires_at,
                total_questions, max_points
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(new.user_id)
        .bind(new.quiz_id)
        .bind(new.status.as_str())
        .bind(new.created_at)
        .bind(new.started_at)
        .bind(new.expires_at)
        .bind(new.total_questions)
        .bind(new.max_points)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(session)
    }

    async fn save_session(&mut self, session: &Session) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE quiz_sessions SET
                status = $2,
                started_at = $3,
                finished_at = $4,
                expires_at = $5,
                time_spent_seconds = $6,
                total_questions = $7,
                answered_questions = $8,
                correct_answers = $9,
                current_question_index = $10,
                score = $11,
                points_earned = $12,
                max_points = $13,
                is_passed = $14
            WHERE id = $1
            "#,
        )
        .bind(session.id)
        .bind(session.status.as_str())
        .bind(session.started_at)
        .bind(session.finished_at)
        .bind(session.expires_at)
        .bind(session.time_spent_seconds)
        .bind(session.total_questions)
        .bind(session.answered_questions)
        .bind(session.correct_answers)
        .bind(session.current_question_index)
        .bind(session.score)
        .bind(session.points_earned)
        .bind(session.max_points)
        .bind(session.is_passed)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save session {}: {:?}", session.id, e);
            AppError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Session {} not found",
                session.id
            )));
        }
        Ok(())
    }

    async fn find_session_answers(
        &mut self,
        session_id: i64,
    ) -> Result<Vec<SessionAnswer>, AppError> {
        let answers = sqlx::query_as::<_, SessionAnswer>(&format!(
            "SELECT {} FROM session_answers WHERE session_id = $1 ORDER BY answer_order, id",
            ANSWER_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(answers)
    }

    async fn upsert_session_answer(
        &mut self,
        answer: &SessionAnswer,
    ) -> Result<SessionAnswer, AppError> {
        // Upsert: one row per (session, question); the first answer_order is kept.
        let stored = sqlx::query_as::<_, SessionAnswer>(&format!(
            r#"
            INSERT INTO session_answers (
                session_id, question_id, selected_answer_id, selected_answer_ids,
                text_response, is_correct, points_awarded, answered_at,
                time_spent_seconds, answer_order, is_reviewed, reviewer_feedback
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (session_id, question_id) DO UPDATE SET
                selected_answer_id = EXCLUDED.selected_answer_id,
                selected_answer_ids = EXCLUDED.selected_answer_ids,
                text_response = EXCLUDED.text_response,
                is_correct = EXCLUDED.is_correct,
                points_awarded = EXCLUDED.points_awarded,
                answered_at = EXCLUDED.answered_at,
                time_spent_seconds = EXCLUDED.time_spent_seconds,
                is_reviewed = EXCLUDED.is_reviewed,
                reviewer_feedback = EXCLUDED.reviewer_feedback
            RETURNING {}
            "#,
            ANSWER_COLUMNS
        ))
        .bind(answer.session_id)
        .bind(answer.question_id)
        .bind(answer.selected_answer_id)
        .bind(answer.selected_answer_ids.clone())
        .bind(answer.text_response.clone())
        .bind(answer.is_correct)
        .bind(answer.points_awarded)
        .bind(answer.answered_at)
        .bind(answer.time_spent_seconds)
        .bind(answer.answer_order)
        .bind(answer.is_reviewed)
        .bind(answer.reviewer_feedback.clone())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert session answer: {:?}", e);
            AppError::from(e)
        })?;
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let PgUnit { tx } = *self;
        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit transaction: {:?}", e);
            AppError::from(e)
        })
    }
}
