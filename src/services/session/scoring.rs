// src/services/session/scoring.rs

use crate::{
    error::AppError,
    models::{
        answer::SubmitAnswerRequest,
        question::{CatalogQuestion, QuestionType},
        quiz::CorrectAnswer,
        session::{Session, SessionAnswer},
    },
    utils::html::clean_optional_text,
};

/// Every question is worth one point, whatever its type.
pub const POINTS_PER_QUESTION: i32 = 1;

/// `correct / total * 100`, rounded half-up to two decimals.
///
/// Computed in integer hundredths so that exact halves round up instead of
/// falling victim to binary floating point.
pub fn score_percentage(correct: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let correct = i64::from(correct.max(0));
    let total = i64::from(total);
    let hundredths = (correct * 20_000 + total) / (2 * total);
    hundredths as f64 / 100.0
}

/// Rounds half-up to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregates derived from the full answer set of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerTotals {
    pub answered: i32,
    pub correct: i32,
    pub points: i32,
}

impl AnswerTotals {
    pub fn from_answers(answers: &[SessionAnswer]) -> Self {
        answers.iter().fold(Self::default(), |mut totals, answer| {
            totals.answered += 1;
            if answer.is_correct == Some(true) {
                totals.correct += 1;
            }
            totals.points += answer.points_awarded;
            totals
        })
    }

    /// Overwrites the aggregate columns of `session`.
    pub fn apply_to(&self, session: &mut Session) {
        session.answered_questions = self.answered;
        session.correct_answers = self.correct;
        session.points_earned = self.points;
    }
}

/// What the user picked, normalized for the question's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Single(i64),
    /// Sorted, without duplicates.
    Multiple(Vec<i64>),
    Text(String),
}

impl Selection {
    /// Reads the part of `req` that applies to `question` and checks it.
    pub fn from_request(
        question: &CatalogQuestion,
        req: &SubmitAnswerRequest,
    ) -> Result<Self, AppError> {
        match question.question_type {
            QuestionType::SingleChoice | QuestionType::TrueFalse => {
                let picked = match (&req.selected_answer_id, &req.selected_answer_ids) {
                    (Some(id), _) => *id,
                    (None, Some(ids)) if ids.len() == 1 => ids[0],
                    _ => {
                        return Err(AppError::InvalidInput(
                            "Exactly one selected answer is required".to_string(),
                        ));
                    }
                };
                ensure_option(question, picked)?;
                Ok(Selection::Single(picked))
            }
            QuestionType::MultipleChoice => {
                let mut picked = match (&req.selected_answer_ids, &req.selected_answer_id) {
                    (Some(ids), _) if !ids.is_empty() => ids.clone(),
                    (_, Some(id)) => vec![*id],
                    _ => {
                        return Err(AppError::InvalidInput(
                            "At least one selected answer is required".to_string(),
                        ));
                    }
                };
                picked.sort_unstable();
                picked.dedup();
                for id in &picked {
                    ensure_option(question, *id)?;
                }
                Ok(Selection::Multiple(picked))
            }
            QuestionType::FreeText => clean_optional_text(req.text_response.as_deref())
                .map(Selection::Text)
                .ok_or_else(|| AppError::InvalidInput("A text response is required".to_string())),
        }
    }

    pub fn selected_ids(&self) -> Vec<i64> {
        match self {
            Selection::Single(id) => vec![*id],
            Selection::Multiple(ids) => ids.clone(),
            Selection::Text(_) => Vec::new(),
        }
    }

    /// Whether `answer` already stores exactly this selection.
    pub fn matches(&self, answer: &SessionAnswer) -> bool {
        match self {
            Selection::Single(id) => answer.selected_answer_id == Some(*id),
            Selection::Multiple(ids) => answer.selected_answer_ids.as_ref() == Some(ids),
            Selection::Text(text) => answer.text_response.as_deref() == Some(text.as_str()),
        }
    }

    /// Writes the selection into the answer's columns.
    pub fn store_into(&self, answer: &mut SessionAnswer) {
        answer.selected_answer_id = None;
        answer.selected_answer_ids = None;
        answer.text_response = None;
        match self {
            Selection::Single(id) => answer.selected_answer_id = Some(*id),
            Selection::Multiple(ids) => answer.selected_answer_ids = Some(ids.clone()),
            Selection::Text(text) => answer.text_response = Some(text.clone()),
        }
    }
}

fn ensure_option(question: &CatalogQuestion, option_id: i64) -> Result<(), AppError> {
    if question.option(option_id).is_none() {
        return Err(AppError::InvalidInput(format!(
            "Answer {} is not an option of question {}",
            option_id, question.id
        )));
    }
    Ok(())
}

/// Outcome of grading one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grade {
    /// `None` while a free-text answer waits for review.
    pub is_correct: Option<bool>,
    pub points: i32,
}

impl Grade {
    pub fn pending() -> Self {
        Self {
            is_correct: None,
            points: 0,
        }
    }

    pub fn decided(is_correct: bool) -> Self {
        Self {
            is_correct: Some(is_correct),
            points: if is_correct { POINTS_PER_QUESTION } else { 0 },
        }
    }
}

/// Grades a selection against the catalog's answer key.
pub fn grade(selection: &Selection, key: &CorrectAnswer) -> Grade {
    match selection {
        Selection::Single(id) => Grade::decided(key.correct_option_ids.contains(id)),
        Selection::Multiple(ids) => {
            let mut expected = key.correct_option_ids.clone();
            expected.sort_unstable();
            expected.dedup();
            Grade::decided(!expected.is_empty() && *ids == expected)
        }
        Selection::Text(_) => Grade::pending(),
    }
}

pub fn feedback_message(is_correct: Option<bool>) -> &'static str {
    match is_correct {
        Some(true) => "Correct!",
        Some(false) => "Incorrect",
        None => "Answer submitted for review",
    }
}
