// src/models/answer.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::html::{MAX_REVIEW_FEEDBACK_CHARS, MAX_TEXT_RESPONSE_CHARS};

/// DTO for submitting one answer inside a running session.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,

    /// Chosen option for single-choice and true/false questions.
    pub selected_answer_id: Option<i64>,

    /// Chosen options for multiple-choice questions.
    #[validate(length(max = 50))]
    pub selected_answer_ids: Option<Vec<i64>>,

    /// Response for free-text questions.
    #[validate(length(max = MAX_TEXT_RESPONSE_CHARS))]
    pub text_response: Option<String>,

    /// Client-measured seconds spent on this question.
    #[validate(range(min = 0, max = 86400))]
    #[serde(default)]
    pub time_spent_seconds: i32,
}

/// Live feedback for a recorded answer.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerFeedback {
    pub success: bool,
    pub question_id: i64,
    pub is_correct: Option<bool>,
    pub points_awarded: i32,
    pub answered_questions: i32,
    pub total_questions: i32,
    /// `correct_answers / total_questions` as a percentage, for progress display only.
    pub running_score: f64,
    pub remaining_seconds: i64,
    pub feedback: String,
}

/// DTO for an administrator's verdict on a free-text answer.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewAnswerRequest {
    pub is_correct: bool,
    #[validate(length(max = MAX_REVIEW_FEEDBACK_CHARS))]
    pub feedback: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_time_is_rejected() {
        let req = SubmitAnswerRequest {
            question_id: 1,
            selected_answer_id: Some(2),
            time_spent_seconds: -5,
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_time_defaults_to_zero() {
        let req: SubmitAnswerRequest =
            serde_json::from_str(r#"{"question_id": 3, "selected_answer_id": 9}"#).unwrap();
        assert_eq!(req.time_spent_seconds, 0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_oversized_text_is_rejected() {
        let req = SubmitAnswerRequest {
            question_id: 1,
            text_response: Some("x".repeat(MAX_TEXT_RESPONSE_CHARS as usize + 1)),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_text_at_the_cap_is_accepted() {
        let req = SubmitAnswerRequest {
            question_id: 1,
            text_response: Some("x".repeat(MAX_TEXT_RESPONSE_CHARS as usize)),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_oversized_review_feedback_is_rejected() {
        let req = ReviewAnswerRequest {
            is_correct: true,
            feedback: Some("y".repeat(MAX_REVIEW_FEEDBACK_CHARS as usize + 1)),
        };
        assert!(req.validate().is_err());

        let req = ReviewAnswerRequest {
            is_correct: false,
            feedback: Some("y".repeat(MAX_REVIEW_FEEDBACK_CHARS as usize)),
        };
        assert!(req.validate().is_ok());
    }
}
