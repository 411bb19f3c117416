// src/repository/memory.rs

//! In-memory implementations for tests and local demos.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::AppError,
    models::{
        quiz::{CorrectAnswer, Quiz},
        session::{NewSession, Session, SessionAnswer},
    },
    repository::{QuizCatalog, SessionStore, SessionUnit},
};

/// Catalog backed by plain maps, filled before the engine is built.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    quizzes: HashMap<i64, Quiz>,
    users: HashMap<i64, String>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quiz(mut self, quiz: Quiz) -> Self {
        self.quizzes.insert(quiz.id, quiz);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user_id: i64, username: impl Into<String>) -> Self {
        self.users.insert(user_id, username.into());
        self
    }
}

#[async_trait]
impl QuizCatalog for MemoryCatalog {
    async fn get_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        Ok(self.quizzes.get(&quiz_id).cloned())
    }

    async fn correct_answer(&self, question_id: i64) -> Result<Option<CorrectAnswer>, AppError> {
        Ok(self
            .quizzes
            .values()
            .flat_map(|quiz| quiz.questions.iter())
            .find(|q| q.id == question_id)
            .map(CorrectAnswer::from))
    }

    async fn display_names(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>, AppError> {
        Ok(user_ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryData {
    sessions: BTreeMap<i64, Session>,
    answers: BTreeMap<i64, SessionAnswer>,
    next_session_id: i64,
    next_answer_id: i64,
}

impl MemoryData {
    fn active_session_for(&self, user_id: i64, quiz_id: i64) -> Option<Session> {
        self.sessions
            .values()
            .find(|s| s.user_id == user_id && s.quiz_id == quiz_id && s.status.is_active())
            .cloned()
    }

    fn completed_for(&self, quiz_id: i64) -> Vec<Session> {
        self.sessions
            .values()
            .filter(|s| s.quiz_id == quiz_id && s.status.is_completed())
            .cloned()
            .collect()
    }

    fn answers_of(&self, session_id: i64) -> Vec<SessionAnswer> {
        let mut answers: Vec<SessionAnswer> = self
            .answers
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| (a.answer_order, a.id));
        answers
    }
}

/// Session store guarded by a single async mutex.
///
/// A unit of work holds the lock for its whole lifetime and edits a staged copy,
/// which replaces the shared data only on commit. That makes every unit
/// serializable with respect to every other unit and every read.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<MemoryData>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored answer rows across all sessions.
    pub async fn answer_count(&self) -> usize {
        self.data.lock().await.answers.len()
    }

    /// Overwrites a stored session as-is, bypassing the engine. Test fixture helper.
    pub async fn put_session(&self, session: Session) {
        let mut data = self.data.lock().await;
        data.next_session_id = data.next_session_id.max(session.id);
        data.sessions.insert(session.id, session);
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn SessionUnit>, AppError> {
        let guard = Arc::clone(&self.data).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnit { guard, staged }))
    }

    async fn find_session(&self, session_id: i64) -> Result<Option<Session>, AppError> {
        Ok(self.data.lock().await.sessions.get(&session_id).cloned())
    }

    async fn find_active_session_for(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> Result<Option<Session>, AppError> {
        Ok(self.data.lock().await.active_session_for(user_id, quiz_id))
    }

    async fn find_session_answers(&self, session_id: i64) -> Result<Vec<SessionAnswer>, AppError> {
        Ok(self.data.lock().await.answers_of(session_id))
    }

    async fn find_expired_sessions(&self, now: DateTime<Utc>) -> Result<Vec<Session>, AppError> {
        Ok(self
            .data
            .lock()
            .await
            .sessions
            .values()
            .filter(|s| s.is_expired(now))
            .cloned()
            .collect())
    }

    async fn find_user_sessions(&self, user_id: i64) -> Result<Vec<Session>, AppError> {
        let mut sessions: Vec<Session> = self
            .data
            .lock()
            .await
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn completed_page(
        &self,
        quiz_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Session>, AppError> {
        let mut sessions = self.data.lock().await.completed_for(quiz_id);
        sessions.sort_by(Session::ranking_cmp);
        Ok(sessions
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn count_completed(&self, quiz_id: i64) -> Result<i64, AppError> {
        Ok(self.data.lock().await.completed_for(quiz_id).len() as i64)
    }

    async fn count_outranking(&self, session: &Session) -> Result<i64, AppError> {
        let field = self.data.lock().await.completed_for(session.quiz_id);
        Ok(field.iter().filter(|other| other.outranks(session)).count() as i64)
    }

    async fn best_completed_for(
        &self,
        quiz_id: i64,
        user_id: i64,
    ) -> Result<Option<Session>, AppError> {
        Ok(self
            .data
            .lock()
            .await
            .completed_for(quiz_id)
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .min_by(Session::ranking_cmp))
    }
}

struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryData>,
    staged: MemoryData,
}

#[async_trait]
impl SessionUnit for MemoryUnit {
    async fn lock_session(&mut self, session_id: i64) -> Result<Option<Session>, AppError> {
        Ok(self.staged.sessions.get(&session_id).cloned())
    }

    async fn find_active_session_for(
        &mut self,
        user_id: i64,
        quiz_id: i64,
    ) -> Result<Option<Session>, AppError> {
        Ok(self.staged.active_session_for(user_id, quiz_id))
    }

    async fn insert_session(&mut self, new: &NewSession) -> Result<Session, AppError> {
        if new.status.is_active()
            && self
                .staged
                .active_session_for(new.user_id, new.quiz_id)
                .is_some()
        {
            return Err(AppError::Conflict(
                "An active session already exists for this quiz".to_string(),
            ));
        }

        self.staged.next_session_id += 1;
        let session = Session {
            id: self.staged.next_session_id,
            user_id: new.user_id,
            quiz_id: new.quiz_id,
            status: new.status,
            created_at: new.created_at,
            started_at: new.started_at,
            finished_at: None,
            expires_at: new.expires_at,
            time_spent_seconds: 0,
            total_questions: new.total_questions,
            answered_questions: 0,
            correct_answers: 0,
            current_question_index: 0,
            score: None,
            points_earned: 0,
            max_points: new.max_points,
            is_passed: None,
        };
        self.staged.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn save_session(&mut self, session: &Session) -> Result<(), AppError> {
        match self.staged.sessions.get_mut(&session.id) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Session {} not found",
                session.id
            ))),
        }
    }

    async fn find_session_answers(
        &mut self,
        session_id: i64,
    ) -> Result<Vec<SessionAnswer>, AppError> {
        Ok(self.staged.answers_of(session_id))
    }

    async fn upsert_session_answer(
        &mut self,
        answer: &SessionAnswer,
    ) -> Result<SessionAnswer, AppError> {
        let existing = self
            .staged
            .answers
            .values()
            .find(|a| a.session_id == answer.session_id && a.question_id == answer.question_id)
            .map(|a| (a.id, a.answer_order));

        let stored = match existing {
            Some((id, answer_order)) => SessionAnswer {
                id,
                answer_order,
                ..answer.clone()
            },
            None => {
                self.staged.next_answer_id += 1;
                SessionAnswer {
                    id: self.staged.next_answer_id,
                    ..answer.clone()
                }
            }
        };
        self.staged.answers.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryUnit { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::SessionStatus;

    fn new_session(user_id: i64, quiz_id: i64) -> NewSession {
        let now = Utc::now();
        NewSession {
            user_id,
            quiz_id,
            status: SessionStatus::InProgress,
            created_at: now,
            started_at: Some(now),
            expires_at: Some(now + chrono::Duration::minutes(5)),
            total_questions: 2,
            max_points: 2,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_unit_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut unit = store.begin().await.unwrap();
            unit.insert_session(&new_session(1, 1)).await.unwrap();
        }
        assert!(store.find_session(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_active_session_conflicts() {
        let store = MemoryStore::new();
        let mut unit = store.begin().await.unwrap();
        unit.insert_session(&new_session(1, 1)).await.unwrap();
        let err = unit.insert_session(&new_session(1, 1)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        // Other quizzes and other users are unaffected.
        unit.insert_session(&new_session(1, 2)).await.unwrap();
        unit.insert_session(&new_session(2, 1)).await.unwrap();
        unit.commit().await.unwrap();
        assert_eq!(store.find_user_sessions(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_completed_page_and_counts_follow_ranking() {
        let store = MemoryStore::new();
        let mut unit = store.begin().await.unwrap();
        let base = unit.insert_session(&new_session(1, 1)).await.unwrap();
        unit.commit().await.unwrap();

        let finished = |id: i64, user_id: i64, score: f64, time: i32| Session {
            id,
            user_id,
            status: SessionStatus::Submitted,
            score: Some(score),
            time_spent_seconds: time,
            finished_at: Some(base.created_at),
            ..base.clone()
        };
        store.put_session(finished(1, 1, 50.0, 100)).await;
        store.put_session(finished(2, 2, 90.0, 300)).await;
        store.put_session(finished(3, 3, 90.0, 200)).await;
        store.put_session(finished(4, 1, 75.0, 100)).await;
        // Still running, never ranked.
        store
            .put_session(Session {
                id: 5,
                user_id: 4,
                score: None,
                ..base.clone()
            })
            .await;

        assert_eq!(store.count_completed(1).await.unwrap(), 4);

        let page = store.completed_page(1, 1, 2).await.unwrap();
        let ids: Vec<i64> = page.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 4]);

        let last = store.find_session(1).await.unwrap().unwrap();
        assert_eq!(store.count_outranking(&last).await.unwrap(), 3);

        let best = store.best_completed_for(1, 1).await.unwrap().unwrap();
        assert_eq!(best.id, 4);
        assert!(store.best_completed_for(1, 4).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_question() {
        let store = MemoryStore::new();
        let mut unit = store.begin().await.unwrap();
        let session = unit.insert_session(&new_session(1, 1)).await.unwrap();
        let answer = SessionAnswer {
            id: 0,
            session_id: session.id,
            question_id: 5,
            selected_answer_id: Some(1),
            selected_answer_ids: None,
            text_response: None,
            is_correct: Some(false),
            points_awarded: 0,
            answered_at: Utc::now(),
            time_spent_seconds: 3,
            answer_order: 1,
            is_reviewed: false,
            reviewer_feedback: None,
        };
        let first = unit.upsert_session_answer(&answer).await.unwrap();
        let second = unit
            .upsert_session_answer(&SessionAnswer {
                selected_answer_id: Some(2),
                is_correct: Some(true),
                answer_order: 9,
                ..answer
            })
            .await
            .unwrap();
        unit.commit().await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.answer_order, 1);
        assert_eq!(store.answer_count().await, 1);
    }
}
