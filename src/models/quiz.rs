// src/models/quiz.rs

use chrono::Duration;
use serde::Serialize;

use crate::models::question::{CatalogQuestion, QuestionType};

/// Quiz metadata consumed from the catalog. Read-only to the session engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub active: bool,
    pub duration_minutes: i32,
    /// Questions in catalog order.
    pub questions: Vec<CatalogQuestion>,
}

impl Quiz {
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn duration_seconds(&self) -> i64 {
        i64::from(self.duration_minutes) * 60
    }

    pub fn question_count(&self) -> i32 {
        self.questions.len() as i32
    }

    pub fn question(&self, question_id: i64) -> Option<&CatalogQuestion> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn question_at(&self, index: i32) -> Option<&CatalogQuestion> {
        usize::try_from(index).ok().and_then(|i| self.questions.get(i))
    }
}

/// The correctness facts for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectAnswer {
    pub question_id: i64,
    pub question_type: QuestionType,
    pub correct_option_ids: Vec<i64>,
}

impl From<&CatalogQuestion> for CorrectAnswer {
    fn from(question: &CatalogQuestion) -> Self {
        Self {
            question_id: question.id,
            question_type: question.question_type,
            correct_option_ids: question.correct_option_ids(),
        }
    }
}

/// Response for the "can I start this quiz?" check.
#[derive(Debug, Serialize)]
pub struct CanStartResponse {
    pub quiz_id: i64,
    pub can_start: bool,
    pub reason: Option<String>,
    pub active_session_id: Option<i64>,
}
