// src/models/session.rs

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::{error::AppError, models::question::UnknownVariant};

/// State of a quiz attempt.
///
/// `NotStarted` is never observed outside the engine: starting a session moves it
/// to `InProgress` before the first commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Paused,
    Submitted,
    TimedOut,
    Abandoned,
    Graded,
}

impl SessionStatus {
    /// States in which a user holds the quiz "open". At most one per (user, quiz).
    pub const ACTIVE: [SessionStatus; 3] = [
        SessionStatus::NotStarted,
        SessionStatus::InProgress,
        SessionStatus::Paused,
    ];

    /// States that count for results and leaderboards.
    pub const COMPLETED: [SessionStatus; 3] = [
        SessionStatus::Submitted,
        SessionStatus::Graded,
        SessionStatus::TimedOut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "NOT_STARTED",
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Paused => "PAUSED",
            SessionStatus::Submitted => "SUBMITTED",
            SessionStatus::TimedOut => "TIMED_OUT",
            SessionStatus::Abandoned => "ABANDONED",
            SessionStatus::Graded => "GRADED",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_completed(&self) -> bool {
        Self::COMPLETED.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SessionStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "NOT_STARTED" => Ok(SessionStatus::NotStarted),
            "IN_PROGRESS" => Ok(SessionStatus::InProgress),
            "PAUSED" => Ok(SessionStatus::Paused),
            "SUBMITTED" => Ok(SessionStatus::Submitted),
            "TIMED_OUT" => Ok(SessionStatus::TimedOut),
            "ABANDONED" => Ok(SessionStatus::Abandoned),
            "GRADED" => Ok(SessionStatus::Graded),
            _ => Err(UnknownVariant {
                column: "status",
                value,
            }),
        }
    }
}

/// Represents the 'quiz_sessions' table: one attempt by one user at one quiz.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,

    #[sqlx(try_from = "String")]
    pub status: SessionStatus,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,

    /// Active (non-paused) seconds consumed. Snapshotted on pause and finalization.
    pub time_spent_seconds: i32,

    pub total_questions: i32,
    pub answered_questions: i32,
    pub correct_answers: i32,
    pub current_question_index: i32,

    /// Percentage 0-100 with two decimals. `None` while the session is active.
    pub score: Option<f64>,
    pub points_earned: i32,
    pub max_points: i32,

    /// `None` until the session is graded.
    pub is_passed: Option<bool>,
}

impl Session {
    /// Fails with `Forbidden` unless `user_id` owns the session.
    pub fn ensure_owner(&self, user_id: i64) -> Result<(), AppError> {
        if self.user_id != user_id {
            return Err(AppError::Forbidden(
                "You do not have access to this session".to_string(),
            ));
        }
        Ok(())
    }

    /// Fails with `InvalidState` unless the status is one of `allowed`.
    pub fn ensure_status(&self, allowed: &[SessionStatus], action: &str) -> Result<(), AppError> {
        if !allowed.contains(&self.status) {
            return Err(AppError::InvalidState(format!(
                "Cannot {} a session that is {}",
                action, self.status
            )));
        }
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::InProgress && self.expires_at.is_some_and(|at| at <= now)
    }

    /// Active seconds consumed as of `now`, capped at the quiz duration.
    ///
    /// While running, the deadline always equals the last resume instant plus the
    /// unconsumed budget, so `duration - (expires_at - now)` is the banked time plus
    /// the time since resuming. Paused and finished sessions keep their snapshot.
    pub fn active_seconds(&self, now: DateTime<Utc>, duration_seconds: i64) -> i32 {
        let elapsed = match (self.status, self.expires_at) {
            (SessionStatus::InProgress, Some(expires_at)) => {
                duration_seconds - (expires_at - now).num_seconds()
            }
            _ => i64::from(self.time_spent_seconds),
        };
        elapsed.clamp(0, duration_seconds) as i32
    }

    /// Seconds left before the deadline; zero once the session stops running.
    pub fn remaining_seconds(&self, now: DateTime<Utc>, duration_seconds: i64) -> i64 {
        match self.status {
            SessionStatus::InProgress => self
                .expires_at
                .map(|at| (at - now).num_seconds().max(0))
                .unwrap_or(0),
            SessionStatus::Paused => {
                (duration_seconds - i64::from(self.time_spent_seconds)).max(0)
            }
            _ => 0,
        }
    }

    /// Score used for ranking; an unscored session counts as zero.
    pub fn final_score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }

    /// Strictly better standing: higher score, or equal score in less time.
    pub fn outranks(&self, other: &Session) -> bool {
        let (mine, theirs) = (self.final_score(), other.final_score());
        mine > theirs || (mine == theirs && self.time_spent_seconds < other.time_spent_seconds)
    }

    /// Leaderboard order: higher score first, then less time spent.
    ///
    /// Finish time and id only break exact ties so that the order is stable.
    pub fn ranking_cmp(&self, other: &Session) -> Ordering {
        other
            .final_score()
            .total_cmp(&self.final_score())
            .then(self.time_spent_seconds.cmp(&other.time_spent_seconds))
            .then(self.finished_at.cmp(&other.finished_at))
            .then(self.id.cmp(&other.id))
    }
}

/// Values for inserting a new session row.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: i64,
    pub quiz_id: i64,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub total_questions: i32,
    pub max_points: i32,
}

/// Represents the 'session_answers' table: one response to one question.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct SessionAnswer {
    pub id: i64,
    pub session_id: i64,
    pub question_id: i64,
    pub selected_answer_id: Option<i64>,
    pub selected_answer_ids: Option<Vec<i64>>,
    pub text_response: Option<String>,

    /// `None` means "pending manual review".
    pub is_correct: Option<bool>,
    pub points_awarded: i32,
    pub answered_at: DateTime<Utc>,
    pub time_spent_seconds: i32,

    /// 1-based position in which the question was first answered.
    pub answer_order: i32,
    pub is_reviewed: bool,
    pub reviewer_feedback: Option<String>,
}

impl SessionAnswer {
    pub fn is_pending_review(&self) -> bool {
        self.is_correct.is_none()
    }
}

/// Session payload returned to callers, with the live countdown.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: Session,
    pub remaining_seconds: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn running(now: DateTime<Utc>) -> Session {
        Session {
            id: 1,
            user_id: 10,
            quiz_id: 100,
            status: SessionStatus::InProgress,
            created_at: now,
            started_at: Some(now),
            finished_at: None,
            expires_at: Some(now + Duration::minutes(10)),
            time_spent_seconds: 0,
            total_questions: 4,
            answered_questions: 0,
            correct_answers: 0,
            current_question_index: 0,
            score: None,
            points_earned: 0,
            max_points: 4,
            is_passed: None,
        }
    }

    #[test]
    fn test_active_seconds_tracks_deadline() {
        let now = Utc::now();
        let session = running(now);
        assert_eq!(session.active_seconds(now + Duration::minutes(3), 600), 180);
        // Past the deadline the value is capped at the quiz duration.
        assert_eq!(session.active_seconds(now + Duration::minutes(30), 600), 600);
    }

    #[test]
    fn test_paused_session_keeps_snapshot() {
        let now = Utc::now();
        let mut session = running(now);
        session.status = SessionStatus::Paused;
        session.time_spent_seconds = 180;
        assert_eq!(session.active_seconds(now + Duration::hours(5), 600), 180);
        assert_eq!(session.remaining_seconds(now + Duration::hours(5), 600), 420);
        assert!(!session.is_expired(now + Duration::hours(5)));
    }

    #[test]
    fn test_ownership_and_status_guards() {
        let session = running(Utc::now());
        assert!(session.ensure_owner(10).is_ok());
        assert!(matches!(session.ensure_owner(11), Err(AppError::Forbidden(_))));
        assert!(matches!(
            session.ensure_status(&[SessionStatus::Paused], "resume"),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn test_status_sets() {
        assert!(SessionStatus::Paused.is_active());
        assert!(SessionStatus::TimedOut.is_completed());
        assert!(SessionStatus::Abandoned.is_terminal());
        assert!(!SessionStatus::Abandoned.is_completed());
        assert_eq!(
            SessionStatus::try_from("GRADED".to_string()),
            Ok(SessionStatus::Graded)
        );
    }
}
