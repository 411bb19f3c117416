// src/repository/mod.rs

//! Storage seams of the session engine.
//!
//! The quiz catalog is owned by another part of the system and is only read
//! here. Sessions and their answers are owned by the engine; every mutation
//! goes through a [`SessionUnit`] so the aggregate columns of a session and
//! its answer rows always commit together.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        quiz::{CorrectAnswer, Quiz},
        session::{NewSession, Session, SessionAnswer},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryCatalog, MemoryStore};
pub use postgres::{PgCatalog, PgStore};

/// Read-only access to quizzes, questions and user display names.
#[async_trait]
pub trait QuizCatalog: Send + Sync {
    /// Quiz metadata with its questions in catalog order, or `None` if absent.
    async fn get_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError>;

    /// Correctness facts for one question, or `None` if absent.
    async fn correct_answer(&self, question_id: i64) -> Result<Option<CorrectAnswer>, AppError>;

    /// Display names for the given users. Unknown ids are simply left out.
    async fn display_names(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>, AppError>;
}

/// Session persistence. Read paths see committed data only.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Opens an atomic unit of work. Dropping it without `commit` rolls back.
    async fn begin(&self) -> Result<Box<dyn SessionUnit>, AppError>;

    async fn find_session(&self, session_id: i64) -> Result<Option<Session>, AppError>;

    async fn find_active_session_for(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> Result<Option<Session>, AppError>;

    /// Answers of a session ordered by `answer_order`.
    async fn find_session_answers(&self, session_id: i64) -> Result<Vec<SessionAnswer>, AppError>;

    /// `IN_PROGRESS` sessions whose deadline is at or before `now`.
    async fn find_expired_sessions(&self, now: DateTime<Utc>) -> Result<Vec<Session>, AppError>;

    /// All sessions of a user, newest first.
    async fn find_user_sessions(&self, user_id: i64) -> Result<Vec<Session>, AppError>;

    /// Completed (`SUBMITTED`, `GRADED` or `TIMED_OUT`) sessions of a quiz in
    /// leaderboard order, at most `limit` of them starting at `offset`.
    async fn completed_page(
        &self,
        quiz_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Session>, AppError>;

    async fn count_completed(&self, quiz_id: i64) -> Result<i64, AppError>;

    /// Completed sessions of the same quiz that strictly outrank `session`.
    async fn count_outranking(&self, session: &Session) -> Result<i64, AppError>;

    /// The user's highest-ranked completed session on a quiz.
    async fn best_completed_for(
        &self,
        quiz_id: i64,
        user_id: i64,
    ) -> Result<Option<Session>, AppError>;
}

/// One atomic unit of work over sessions and answers.
#[async_trait]
pub trait SessionUnit: Send {
    /// Loads a session and holds it exclusively until the unit ends.
    async fn lock_session(&mut self, session_id: i64) -> Result<Option<Session>, AppError>;

    async fn find_active_session_for(
        &mut self,
        user_id: i64,
        quiz_id: i64,
    ) -> Result<Option<Session>, AppError>;

    /// Inserts a session. Fails with `Conflict` if the user already holds an
    /// active session for the same quiz.
    async fn insert_session(&mut self, session: &NewSession) -> Result<Session, AppError>;

    async fn save_session(&mut self, session: &Session) -> Result<(), AppError>;

    async fn find_session_answers(&mut self, session_id: i64)
    -> Result<Vec<SessionAnswer>, AppError>;

    /// Inserts or replaces the answer for `(session_id, question_id)`.
    /// The `id` of the argument is ignored; the stored row is returned.
    async fn upsert_session_answer(
        &mut self,
        answer: &SessionAnswer,
    ) -> Result<SessionAnswer, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
