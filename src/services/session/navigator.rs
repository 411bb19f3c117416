// src/services/session/navigator.rs

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        question::SessionQuestionView,
        quiz::Quiz,
        session::{Session, SessionAnswer},
    },
    services::session::SessionService,
};

impl SessionService {
    /// The question under the session's cursor.
    pub async fn current_question(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<SessionQuestionView, AppError> {
        let now = self.clock.now();
        let (mut unit, session, quiz) = self
            .open_running(session_id, user_id, "read questions of", now)
            .await?;
        let answers = unit.find_session_answers(session.id).await?;
        question_view(&session, &quiz, &answers, session.current_question_index, now)
    }

    /// The question at `index`, without correctness data, plus any answer
    /// already recorded for it. Does not move the cursor.
    pub async fn question_by_index(
        &self,
        session_id: i64,
        index: i32,
        user_id: i64,
    ) -> Result<SessionQuestionView, AppError> {
        let now = self.clock.now();
        let (mut unit, session, quiz) = self
            .open_running(session_id, user_id, "read questions of", now)
            .await?;
        let answers = unit.find_session_answers(session.id).await?;
        question_view(&session, &quiz, &answers, index, now)
    }

    pub async fn next_question(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<SessionQuestionView, AppError> {
        self.move_cursor(session_id, user_id, 1).await
    }

    pub async fn previous_question(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<SessionQuestionView, AppError> {
        self.move_cursor(session_id, user_id, -1).await
    }

    async fn move_cursor(
        &self,
        session_id: i64,
        user_id: i64,
        step: i32,
    ) -> Result<SessionQuestionView, AppError> {
        let now = self.clock.now();
        let (mut unit, mut session, quiz) = self
            .open_running(session_id, user_id, "navigate", now)
            .await?;

        let target = session.current_question_index + step;
        if target >= session.total_questions {
            return Err(AppError::InvalidState("No more questions".to_string()));
        }
        if target < 0 {
            return Err(AppError::InvalidState(
                "Already at first question".to_string(),
            ));
        }

        session.current_question_index = target;
        unit.save_session(&session).await?;
        let answers = unit.find_session_answers(session.id).await?;
        unit.commit().await?;

        question_view(&session, &quiz, &answers, target, now)
    }
}

fn question_view(
    session: &Session,
    quiz: &Quiz,
    answers: &[SessionAnswer],
    index: i32,
    now: DateTime<Utc>,
) -> Result<SessionQuestionView, AppError> {
    if index < 0 || index >= session.total_questions {
        return Err(AppError::InvalidInput(format!(
            "Question index {} is out of range [0, {})",
            index, session.total_questions
        )));
    }
    let question = quiz.question_at(index).ok_or_else(|| {
        AppError::NotFound(format!("Question at index {} no longer exists", index))
    })?;
    let previous = answers.iter().find(|a| a.question_id == question.id);

    Ok(SessionQuestionView {
        session_id: session.id,
        question_index: index,
        total_questions: session.total_questions,
        question: question.to_public(),
        is_answered: previous.is_some(),
        selected_answer_id: previous.and_then(|a| a.selected_answer_id),
        selected_answer_ids: previous.and_then(|a| a.selected_answer_ids.clone()),
        text_response: previous.and_then(|a| a.text_response.clone()),
        remaining_seconds: session.remaining_seconds(now, quiz.duration_seconds()),
    })
}
