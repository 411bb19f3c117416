// src/services/session/finalizer.rs

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        question::CatalogQuestion,
        quiz::Quiz,
        result::{QuestionResult, ResultOption, ResultStatistics, SessionResult},
        session::{Session, SessionAnswer, SessionResponse, SessionStatus},
    },
    repository::SessionUnit,
    services::session::{
        SessionService, lock_owned,
        scoring::{AnswerTotals, POINTS_PER_QUESTION, round2, score_percentage},
    },
};

impl SessionService {
    /// Recomputes the final aggregates of `session` from its answers and moves
    /// it to the terminal `status`. Shared by submission, interactive expiry
    /// and the sweeper, so all three produce identical figures.
    pub(super) async fn finalize_in(
        &self,
        unit: &mut dyn SessionUnit,
        session: &mut Session,
        quiz: &Quiz,
        status: SessionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let answers = unit.find_session_answers(session.id).await?;
        AnswerTotals::from_answers(&answers).apply_to(session);

        let score = score_percentage(session.correct_answers, session.total_questions);
        session.time_spent_seconds = session.active_seconds(now, quiz.duration_seconds());
        session.score = Some(score);
        session.is_passed = Some(score >= self.policy.passing_score);
        session.status = status;
        session.finished_at = Some(now);

        unit.save_session(session).await
    }

    /// Hands a session in for grading.
    ///
    /// A running session past its deadline is finalized as `TIMED_OUT` instead;
    /// the call still succeeds since the answers are kept either way.
    pub async fn submit_quiz(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<SessionResponse, AppError> {
        let now = self.clock.now();
        let mut unit = self.store.begin().await?;
        let mut session = lock_owned(&mut *unit, session_id, user_id).await?;
        session.ensure_status(&[SessionStatus::InProgress, SessionStatus::Paused], "submit")?;
        let quiz = self.load_quiz(session.quiz_id).await?;

        let status = if session.is_expired(now) {
            SessionStatus::TimedOut
        } else {
            SessionStatus::Submitted
        };
        self.finalize_in(&mut *unit, &mut session, &quiz, status, now)
            .await?;
        unit.commit().await?;

        tracing::info!(
            session_id,
            user_id,
            quiz_id = session.quiz_id,
            status = %session.status,
            score = ?session.score,
            "Session finalized"
        );
        Ok(self.respond(session, &quiz, now))
    }

    /// Per-question breakdown and statistics of a finished session.
    pub async fn get_result(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<SessionResult, AppError> {
        let session = self.find_owned(session_id, user_id).await?;
        if !session.status.is_completed() {
            return Err(AppError::InvalidState(format!(
                "Session {} has not yet been submitted",
                session_id
            )));
        }
        let quiz = self.load_quiz(session.quiz_id).await?;
        let answers = self.store.find_session_answers(session.id).await?;

        let questions: Vec<QuestionResult> = quiz
            .questions
            .iter()
            .enumerate()
            .map(|(i, question)| {
                let answer = answers.iter().find(|a| a.question_id == question.id);
                question_result(i as i32 + 1, question, answer)
            })
            .collect();

        let (rank, total_participants) = self.standing(&session).await?;
        let statistics = statistics(&session, rank, total_participants);

        Ok(SessionResult::header(
            &session,
            quiz.title,
            self.policy.passing_score,
            questions,
            statistics,
        ))
    }
}

fn question_result(
    position: i32,
    question: &CatalogQuestion,
    answer: Option<&SessionAnswer>,
) -> QuestionResult {
    let selected: Vec<i64> = match answer {
        Some(a) => match (&a.selected_answer_ids, a.selected_answer_id) {
            (Some(ids), _) => ids.clone(),
            (None, Some(id)) => vec![id],
            (None, None) => Vec::new(),
        },
        None => Vec::new(),
    };
    let correct = question.correct_option_ids();
    let content_of = |ids: &[i64]| -> Vec<String> {
        ids.iter()
            .filter_map(|id| question.option(*id).map(|o| o.content.clone()))
            .collect()
    };

    QuestionResult {
        question_id: question.id,
        position,
        content: question.content.clone(),
        question_type: question.question_type,
        explanation: question.explanation.clone(),
        is_answered: answer.is_some(),
        selected_content: content_of(&selected),
        text_response: answer.and_then(|a| a.text_response.clone()),
        correct_content: content_of(&correct),
        is_correct: answer.and_then(|a| a.is_correct),
        points_awarded: answer.map_or(0, |a| a.points_awarded),
        max_points: POINTS_PER_QUESTION,
        time_spent_seconds: answer.map_or(0, |a| a.time_spent_seconds),
        is_reviewed: answer.is_some_and(|a| a.is_reviewed),
        reviewer_feedback: answer.and_then(|a| a.reviewer_feedback.clone()),
        options: question
            .options
            .iter()
            .map(|o| ResultOption {
                id: o.id,
                content: o.content.clone(),
                is_selected: selected.contains(&o.id),
                is_correct: o.is_correct,
            })
            .collect(),
        selected_answer_ids: selected,
        correct_answer_ids: correct,
    }
}

fn statistics(session: &Session, rank: i64, total_participants: i64) -> ResultStatistics {
    let answered = f64::from(session.answered_questions);
    let (accuracy, average_time_per_question) = if session.answered_questions > 0 {
        (
            round2(f64::from(session.correct_answers) / answered * 100.0),
            round2(f64::from(session.time_spent_seconds) / answered),
        )
    } else {
        (0.0, 0.0)
    };
    ResultStatistics {
        accuracy,
        average_time_per_question,
        rank,
        total_participants,
    }
}
