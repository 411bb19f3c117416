// src/services/session/mod.rs

//! The Quiz Session Engine.
//!
//! One [`SessionService`] drives a user's attempt at a quiz from start to
//! grading. Its operations are split by concern:
//!
//! * [`lifecycle`]: start, pause, resume, abandon and session lookups.
//! * [`navigator`]: question display and cursor movement.
//! * [`recorder`]: answer recording, auto-grading and manual review.
//! * [`finalizer`]: submission, timing out and result views.
//! * [`leaderboard`]: ranking of completed sessions.
//! * [`sweeper`]: the periodic expiry pass.
//!
//! Every mutation runs inside one [`SessionUnit`] and commits once.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    config::{Config, DEFAULT_PASSING_SCORE},
    error::AppError,
    models::{
        quiz::Quiz,
        session::{Session, SessionResponse, SessionStatus},
    },
    repository::{QuizCatalog, SessionStore, SessionUnit},
    utils::clock::Clock,
};

pub mod finalizer;
pub mod leaderboard;
pub mod lifecycle;
pub mod navigator;
pub mod recorder;
pub mod scoring;
pub mod sweeper;

pub use sweeper::{SweepReport, spawn_expiry_sweeper};

/// Grading and ranking knobs that vary per deployment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionPolicy {
    /// Minimum percentage for `is_passed`.
    pub passing_score: f64,
    pub leaderboard_default_limit: i64,
    pub leaderboard_max_limit: i64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            passing_score: DEFAULT_PASSING_SCORE,
            leaderboard_default_limit: 10,
            leaderboard_max_limit: 100,
        }
    }
}

impl From<&Config> for SessionPolicy {
    fn from(config: &Config) -> Self {
        Self {
            passing_score: config.passing_score,
            leaderboard_default_limit: config.leaderboard_default_limit.max(1),
            leaderboard_max_limit: config.leaderboard_max_limit.max(1),
        }
    }
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    catalog: Arc<dyn QuizCatalog>,
    clock: Clock,
    policy: SessionPolicy,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog: Arc<dyn QuizCatalog>,
        clock: Clock,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    async fn load_quiz(&self, quiz_id: i64) -> Result<Quiz, AppError> {
        self.catalog
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz_id)))
    }

    /// Committed read of a session the caller owns.
    async fn find_owned(&self, session_id: i64, user_id: i64) -> Result<Session, AppError> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or_else(|| session_not_found(session_id))?;
        session.ensure_owner(user_id)?;
        Ok(session)
    }

    /// Locks an owned `IN_PROGRESS` session for mutation.
    ///
    /// A session whose deadline has passed is timed out on the spot and the
    /// call fails with `Expired`.
    async fn open_running(
        &self,
        session_id: i64,
        user_id: i64,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<(Box<dyn SessionUnit>, Session, Quiz), AppError> {
        let mut unit = self.store.begin().await?;
        let session = lock_owned(&mut *unit, session_id, user_id).await?;
        session.ensure_status(&[SessionStatus::InProgress], action)?;
        let quiz = self.load_quiz(session.quiz_id).await?;

        if session.is_expired(now) {
            return self.reject_expired(unit, session, &quiz, now).await;
        }
        Ok((unit, session, quiz))
    }

    /// Finalizes `session` as `TIMED_OUT`, commits, and fails with `Expired`.
    async fn reject_expired<T>(
        &self,
        mut unit: Box<dyn SessionUnit>,
        mut session: Session,
        quiz: &Quiz,
        now: DateTime<Utc>,
    ) -> Result<T, AppError> {
        self.finalize_in(&mut *unit, &mut session, quiz, SessionStatus::TimedOut, now)
            .await?;
        unit.commit().await?;
        tracing::info!(
            session_id = session.id,
            user_id = session.user_id,
            quiz_id = session.quiz_id,
            "Session timed out during interaction"
        );
        Err(AppError::Expired(format!(
            "Session {} has expired",
            session.id
        )))
    }

    fn respond(&self, session: Session, quiz: &Quiz, now: DateTime<Utc>) -> SessionResponse {
        let remaining_seconds = session.remaining_seconds(now, quiz.duration_seconds());
        SessionResponse {
            session,
            remaining_seconds,
        }
    }
}

/// Locks a session inside `unit` and checks ownership.
async fn lock_owned(
    unit: &mut dyn SessionUnit,
    session_id: i64,
    user_id: i64,
) -> Result<Session, AppError> {
    let session = unit
        .lock_session(session_id)
        .await?
        .ok_or_else(|| session_not_found(session_id))?;
    session.ensure_owner(user_id)?;
    Ok(session)
}

fn session_not_found(session_id: i64) -> AppError {
    AppError::NotFound(format!("Session {} not found", session_id))
}
