// src/models/question.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of question, as stored in the catalog's `question_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    FreeText,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FreeText => "free_text",
        }
    }

    /// Whether correctness can be decided immediately from the selected option(s).
    pub fn is_auto_gradable(&self) -> bool {
        !matches!(self, QuestionType::FreeText)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored enum column holds a value this build does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub column: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.column, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

impl TryFrom<String> for QuestionType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "single_choice" | "single" => Ok(QuestionType::SingleChoice),
            "multiple_choice" | "multiple" => Ok(QuestionType::MultipleChoice),
            "true_false" => Ok(QuestionType::TrueFalse),
            "free_text" | "text" => Ok(QuestionType::FreeText),
            _ => Err(UnknownVariant {
                column: "question_type",
                value,
            }),
        }
    }
}

/// One selectable option of a catalog question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub id: i64,
    pub content: String,
    pub is_correct: bool,
}

/// A question as the catalog knows it, including the answer key.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuestion {
    pub id: i64,
    pub question_type: QuestionType,
    pub content: String,
    pub explanation: Option<String>,
    pub options: Vec<AnswerOption>,
}

impl CatalogQuestion {
    pub fn option(&self, option_id: i64) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn correct_option_ids(&self) -> Vec<i64> {
        self.options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.id)
            .collect()
    }

    /// Maps the question to its public form (no correctness flags).
    pub fn to_public(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id,
            question_type: self.question_type,
            content: self.content.clone(),
            options: self
                .options
                .iter()
                .map(|o| PublicOption {
                    id: o.id,
                    content: o.content.clone(),
                })
                .collect(),
        }
    }
}

/// DTO for sending question to client (excludes correctness and explanation).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub content: String,
    pub options: Vec<PublicOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub content: String,
}

/// A question shown inside a running session, with what the user already answered.
#[derive(Debug, Clone, Serialize)]
pub struct SessionQuestionView {
    pub session_id: i64,
    pub question_index: i32,
    pub total_questions: i32,
    pub question: PublicQuestion,
    pub is_answered: bool,
    pub selected_answer_id: Option<i64>,
    pub selected_answer_ids: Option<Vec<i64>>,
    pub text_response: Option<String>,
    pub remaining_seconds: i64,
}
