// src/models/result.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{
    question::QuestionType,
    session::{Session, SessionStatus},
};

/// Full outcome of a finished session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    pub session_id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub user_id: i64,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: i32,
    pub total_questions: i32,
    pub answered_questions: i32,
    pub correct_answers: i32,
    pub score: f64,
    pub points_earned: i32,
    pub max_points: i32,
    pub is_passed: bool,
    pub passing_score: f64,
    pub questions: Vec<QuestionResult>,
    pub statistics: ResultStatistics,
}

impl SessionResult {
    pub fn header(
        session: &Session,
        quiz_title: String,
        passing_score: f64,
        questions: Vec<QuestionResult>,
        statistics: ResultStatistics,
    ) -> Self {
        Self {
            session_id: session.id,
            quiz_id: session.quiz_id,
            quiz_title,
            user_id: session.user_id,
            status: session.status,
            started_at: session.started_at,
            finished_at: session.finished_at,
            time_spent_seconds: session.time_spent_seconds,
            total_questions: session.total_questions,
            answered_questions: session.answered_questions,
            correct_answers: session.correct_answers,
            score: session.score.unwrap_or(0.0),
            points_earned: session.points_earned,
            max_points: session.max_points,
            is_passed: session.is_passed.unwrap_or(false),
            passing_score,
            questions,
            statistics,
        }
    }
}

/// Per-question breakdown, in catalog order.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionResult {
    pub question_id: i64,
    pub position: i32,
    pub content: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub explanation: Option<String>,
    pub is_answered: bool,
    pub selected_answer_ids: Vec<i64>,
    pub selected_content: Vec<String>,
    pub text_response: Option<String>,
    pub correct_answer_ids: Vec<i64>,
    pub correct_content: Vec<String>,
    pub is_correct: Option<bool>,
    pub points_awarded: i32,
    pub max_points: i32,
    pub time_spent_seconds: i32,
    pub is_reviewed: bool,
    pub reviewer_feedback: Option<String>,
    pub options: Vec<ResultOption>,
}

/// An option annotated with the user's choice and the answer key.
#[derive(Debug, Clone, Serialize)]
pub struct ResultOption {
    pub id: i64,
    pub content: String,
    pub is_selected: bool,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultStatistics {
    /// Correct answers over answered questions, as a percentage.
    pub accuracy: f64,
    pub average_time_per_question: f64,
    pub rank: i64,
    pub total_participants: i64,
}
