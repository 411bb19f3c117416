// src/services/session/recorder.rs

use validator::Validate;

use crate::{
    error::AppError,
    models::{
        answer::{AnswerFeedback, ReviewAnswerRequest, SubmitAnswerRequest},
        session::{SessionAnswer, SessionResponse, SessionStatus},
    },
    services::session::{
        SessionService,
        scoring::{
            AnswerTotals, Grade, Selection, feedback_message, grade, score_percentage,
        },
        session_not_found,
    },
    utils::html::clean_optional_text,
};

impl SessionService {
    /// Records (or replaces) the answer to one question and grades it.
    ///
    /// * First answers bump the running aggregates incrementally.
    /// * A resubmission whose grade changed recomputes the aggregates from the
    ///   full answer set, so repeated or concurrent submissions cannot drift.
    pub async fn submit_answer(
        &self,
        session_id: i64,
        user_id: i64,
        req: SubmitAnswerRequest,
    ) -> Result<AnswerFeedback, AppError> {
        req.validate()?;

        let now = self.clock.now();
        let (mut unit, mut session, quiz) = self
            .open_running(session_id, user_id, "answer questions of", now)
            .await?;

        let question = quiz.question(req.question_id).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Question {} is not part of quiz {}",
                req.question_id, quiz.id
            ))
        })?;
        let selection = Selection::from_request(question, &req)?;

        let answers = unit.find_session_answers(session.id).await?;
        let existing = answers.iter().find(|a| a.question_id == question.id).cloned();

        let record = match &existing {
            // Same selection as before: keep the recorded verdict and review state.
            Some(previous) if selection.matches(previous) => SessionAnswer {
                answered_at: now,
                time_spent_seconds: req.time_spent_seconds,
                ..previous.clone()
            },
            _ => {
                let key = self
                    .catalog
                    .correct_answer(question.id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Question {} not found", question.id))
                    })?;
                let graded = grade(&selection, &key);
                let mut record = SessionAnswer {
                    id: existing.as_ref().map_or(0, |a| a.id),
                    session_id: session.id,
                    question_id: question.id,
                    selected_answer_id: None,
                    selected_answer_ids: None,
                    text_response: None,
                    is_correct: graded.is_correct,
                    points_awarded: graded.points,
                    answered_at: now,
                    time_spent_seconds: req.time_spent_seconds,
                    answer_order: existing
                        .as_ref()
                        .map_or(session.answered_questions + 1, |a| a.answer_order),
                    is_reviewed: false,
                    reviewer_feedback: None,
                };
                selection.store_into(&mut record);
                record
            }
        };

        let stored = unit.upsert_session_answer(&record).await?;

        match &existing {
            None => {
                session.answered_questions += 1;
                if stored.is_correct == Some(true) {
                    session.correct_answers += 1;
                }
                session.points_earned += stored.points_awarded;
            }
            Some(previous)
                if previous.is_correct != stored.is_correct
                    || previous.points_awarded != stored.points_awarded =>
            {
                let all = unit.find_session_answers(session.id).await?;
                AnswerTotals::from_answers(&all).apply_to(&mut session);
            }
            Some(_) => {}
        }

        unit.save_session(&session).await?;
        unit.commit().await?;

        tracing::debug!(
            session_id,
            question_id = stored.question_id,
            is_correct = ?stored.is_correct,
            resubmission = existing.is_some(),
            "Answer recorded"
        );

        Ok(AnswerFeedback {
            success: true,
            question_id: stored.question_id,
            is_correct: stored.is_correct,
            points_awarded: stored.points_awarded,
            answered_questions: session.answered_questions,
            total_questions: session.total_questions,
            running_score: score_percentage(session.correct_answers, session.total_questions),
            remaining_seconds: session.remaining_seconds(now, quiz.duration_seconds()),
            feedback: feedback_message(stored.is_correct).to_string(),
        })
    }

    /// Records a reviewer's verdict on a free-text answer of a finished session.
    ///
    /// Aggregates, score and pass verdict are recomputed from all answers. A
    /// `SUBMITTED` session becomes `GRADED` once no answer awaits review.
    pub async fn review_answer(
        &self,
        session_id: i64,
        question_id: i64,
        req: ReviewAnswerRequest,
    ) -> Result<SessionResponse, AppError> {
        req.validate()?;

        let now = self.clock.now();
        let mut unit = self.store.begin().await?;
        let mut session = unit
            .lock_session(session_id)
            .await?
            .ok_or_else(|| session_not_found(session_id))?;
        session.ensure_status(&SessionStatus::COMPLETED, "review")?;
        let quiz = self.load_quiz(session.quiz_id).await?;

        let question = quiz.question(question_id).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Question {} is not part of quiz {}",
                question_id, quiz.id
            ))
        })?;
        if question.question_type.is_auto_gradable() {
            return Err(AppError::InvalidInput(format!(
                "Question {} is graded automatically",
                question_id
            )));
        }

        let answers = unit.find_session_answers(session.id).await?;
        let answer = answers
            .into_iter()
            .find(|a| a.question_id == question_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No answer to question {} in session {}",
                    question_id, session_id
                ))
            })?;

        let verdict = Grade::decided(req.is_correct);
        let reviewed = SessionAnswer {
            is_correct: verdict.is_correct,
            points_awarded: verdict.points,
            is_reviewed: true,
            reviewer_feedback: clean_optional_text(req.feedback.as_deref()),
            ..answer
        };
        unit.upsert_session_answer(&reviewed).await?;

        let all = unit.find_session_answers(session.id).await?;
        AnswerTotals::from_answers(&all).apply_to(&mut session);
        let score = score_percentage(session.correct_answers, session.total_questions);
        session.score = Some(score);
        session.is_passed = Some(score >= self.policy.passing_score);
        if session.status == SessionStatus::Submitted && !all.iter().any(|a| a.is_pending_review())
        {
            session.status = SessionStatus::Graded;
        }

        unit.save_session(&session).await?;
        unit.commit().await?;

        tracing::info!(
            session_id,
            question_id,
            is_correct = req.is_correct,
            status = %session.status,
            "Answer reviewed"
        );
        Ok(self.respond(session, &quiz, now))
    }
}
