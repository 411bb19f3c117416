// src/services/session/lifecycle.rs

use chrono::Duration;

use crate::{
    error::AppError,
    models::{
        quiz::CanStartResponse,
        session::{NewSession, Session, SessionResponse, SessionStatus},
    },
    services::session::{SessionService, lock_owned, scoring::POINTS_PER_QUESTION},
};

impl SessionService {
    /// Starts a new attempt at a quiz.
    ///
    /// * Quiz must exist (`NotFound`) and be active (`InvalidState`).
    /// * The user must not already hold an active session for it (`Conflict`).
    /// * The quiz must have at least one question (`InvalidState`).
    ///
    /// The existence check and the insert run in the same unit of work; the
    /// store's conditional insert closes the remaining race. An active session
    /// that is already past its deadline is timed out instead of conflicting.
    pub async fn start_session(
        &self,
        quiz_id: i64,
        user_id: i64,
    ) -> Result<SessionResponse, AppError> {
        let quiz = self.load_quiz(quiz_id).await?;
        if !quiz.active {
            return Err(AppError::InvalidState(format!(
                "Quiz {} is not active",
                quiz_id
            )));
        }

        let now = self.clock.now();
        let mut unit = self.store.begin().await?;
        if let Some(mut existing) = unit.find_active_session_for(user_id, quiz_id).await? {
            if !existing.is_expired(now) {
                return Err(AppError::Conflict(format!(
                    "Session {} is already active for this quiz",
                    existing.id
                )));
            }
            // Past its deadline but not swept yet: time it out in this unit.
            self.finalize_in(&mut *unit, &mut existing, &quiz, SessionStatus::TimedOut, now)
                .await?;
        }

        if quiz.questions.is_empty() {
            return Err(AppError::InvalidState(format!(
                "Quiz {} has no questions",
                quiz_id
            )));
        }

        // Starting is immediate: NOT_STARTED never reaches storage.
        let draft = NewSession {
            user_id,
            quiz_id,
            status: SessionStatus::InProgress,
            created_at: now,
            started_at: Some(now),
            expires_at: Some(now + quiz.duration()),
            total_questions: quiz.question_count(),
            max_points: quiz.question_count() * POINTS_PER_QUESTION,
        };

        let session = unit.insert_session(&draft).await?;
        unit.commit().await?;

        tracing::info!(
            session_id = session.id,
            user_id,
            quiz_id,
            "Session started"
        );
        Ok(self.respond(session, &quiz, now))
    }

    pub async fn get_session(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<SessionResponse, AppError> {
        let session = self.find_owned(session_id, user_id).await?;
        let quiz = self.load_quiz(session.quiz_id).await?;
        Ok(self.respond(session, &quiz, self.clock.now()))
    }

    /// The caller's sessions, newest first.
    pub async fn list_user_sessions(&self, user_id: i64) -> Result<Vec<Session>, AppError> {
        self.store.find_user_sessions(user_id).await
    }

    /// Pauses a running session, banking the active time consumed so far.
    pub async fn pause_session(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<SessionResponse, AppError> {
        let now = self.clock.now();
        let (mut unit, mut session, quiz) =
            self.open_running(session_id, user_id, "pause", now).await?;

        session.time_spent_seconds = session.active_seconds(now, quiz.duration_seconds());
        session.status = SessionStatus::Paused;
        unit.save_session(&session).await?;
        unit.commit().await?;

        tracing::info!(
            session_id,
            user_id,
            time_spent_seconds = session.time_spent_seconds,
            "Session paused"
        );
        Ok(self.respond(session, &quiz, now))
    }

    /// Resumes a paused session with whatever time budget is left.
    ///
    /// If nothing is left the session is timed out and the call fails with `Expired`.
    pub async fn resume_session(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<SessionResponse, AppError> {
        let now = self.clock.now();
        let mut unit = self.store.begin().await?;
        let mut session = lock_owned(&mut *unit, session_id, user_id).await?;
        session.ensure_status(&[SessionStatus::Paused], "resume")?;
        let quiz = self.load_quiz(session.quiz_id).await?;

        let remaining = quiz.duration_seconds() - i64::from(session.time_spent_seconds);
        if remaining <= 0 {
            return self.reject_expired(unit, session, &quiz, now).await;
        }

        session.expires_at = Some(now + Duration::seconds(remaining));
        session.status = SessionStatus::InProgress;
        unit.save_session(&session).await?;
        unit.commit().await?;

        tracing::info!(session_id, user_id, remaining, "Session resumed");
        Ok(self.respond(session, &quiz, now))
    }

    /// Gives up on a session. Only submitted and graded sessions are refused;
    /// a timed-out session can still be marked abandoned by its owner.
    pub async fn abandon_session(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<SessionResponse, AppError> {
        let now = self.clock.now();
        let mut unit = self.store.begin().await?;
        let mut session = lock_owned(&mut *unit, session_id, user_id).await?;
        if matches!(
            session.status,
            SessionStatus::Submitted | SessionStatus::Graded
        ) {
            return Err(AppError::InvalidState(format!(
                "Cannot abandon a session that is {}",
                session.status
            )));
        }
        let quiz = self.load_quiz(session.quiz_id).await?;

        session.time_spent_seconds = session.active_seconds(now, quiz.duration_seconds());
        session.status = SessionStatus::Abandoned;
        session.finished_at = session.finished_at.or(Some(now));
        unit.save_session(&session).await?;
        unit.commit().await?;

        tracing::info!(session_id, user_id, "Session abandoned");
        Ok(self.respond(session, &quiz, now))
    }

    /// Whether `user_id` could start `quiz_id` right now, and if not, why.
    pub async fn can_start_session(
        &self,
        quiz_id: i64,
        user_id: i64,
    ) -> Result<CanStartResponse, AppError> {
        let refuse = |reason: &str, active_session_id: Option<i64>| CanStartResponse {
            quiz_id,
            can_start: false,
            reason: Some(reason.to_string()),
            active_session_id,
        };

        let Some(quiz) = self.catalog.get_quiz(quiz_id).await? else {
            return Ok(refuse("Quiz not found", None));
        };
        if !quiz.active {
            return Ok(refuse("Quiz is not active", None));
        }
        // A session past its deadline is timed out by the next start, so it does not block.
        let now = self.clock.now();
        let active = self.store.find_active_session_for(user_id, quiz_id).await?;
        if let Some(active) = active.filter(|session| !session.is_expired(now)) {
            return Ok(refuse(
                "An active session already exists for this quiz",
                Some(active.id),
            ));
        }
        if quiz.questions.is_empty() {
            return Ok(refuse("Quiz has no questions", None));
        }

        Ok(CanStartResponse {
            quiz_id,
            can_start: true,
            reason: None,
            active_session_id: None,
        })
    }
}
