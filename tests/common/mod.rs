// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use quiz_session_engine::{
    SessionPolicy, SessionService,
    models::{
        answer::SubmitAnswerRequest,
        question::{AnswerOption, CatalogQuestion, QuestionType},
        quiz::Quiz,
    },
    repository::{MemoryCatalog, MemoryStore},
    utils::clock::Clock,
};

pub const QUIZ: i64 = 1;
pub const INACTIVE_QUIZ: i64 = 2;
pub const EMPTY_QUIZ: i64 = 3;

pub const Q_SINGLE: i64 = 101;
pub const Q_TRUE_FALSE: i64 = 102;
pub const Q_MULTI: i64 = 103;
pub const Q_TEXT: i64 = 104;

pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;

fn option(id: i64, content: &str, is_correct: bool) -> AnswerOption {
    AnswerOption {
        id,
        content: content.to_string(),
        is_correct,
    }
}

fn question(id: i64, question_type: QuestionType, options: Vec<AnswerOption>) -> CatalogQuestion {
    CatalogQuestion {
        id,
        question_type,
        content: format!("Question {}", id),
        explanation: Some(format!("Explanation {}", id)),
        options,
    }
}

/// Four questions, ten minutes: one of each type, in catalog order.
pub fn four_question_quiz() -> Quiz {
    Quiz {
        id: QUIZ,
        title: "General knowledge".to_string(),
        active: true,
        duration_minutes: 10,
        questions: vec![
            question(
                Q_SINGLE,
                QuestionType::SingleChoice,
                vec![option(11, "Paris", true), option(12, "Lyon", false)],
            ),
            question(
                Q_TRUE_FALSE,
                QuestionType::TrueFalse,
                vec![option(21, "True", true), option(22, "False", false)],
            ),
            question(
                Q_MULTI,
                QuestionType::MultipleChoice,
                vec![
                    option(31, "2", true),
                    option(32, "3", true),
                    option(33, "4", false),
                ],
            ),
            question(Q_TEXT, QuestionType::FreeText, Vec::new()),
        ],
    }
}

pub fn catalog() -> MemoryCatalog {
    let mut inactive = four_question_quiz();
    inactive.id = INACTIVE_QUIZ;
    inactive.active = false;

    let empty = Quiz {
        id: EMPTY_QUIZ,
        title: "Empty".to_string(),
        active: true,
        duration_minutes: 5,
        questions: Vec::new(),
    };

    MemoryCatalog::new()
        .with_quiz(four_question_quiz())
        .with_quiz(inactive)
        .with_quiz(empty)
        .with_user(ALICE, "alice")
        .with_user(BOB, "bob")
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub service: SessionService,
    pub store: MemoryStore,
    pub clock: Clock,
}

pub fn harness() -> Harness {
    let store = MemoryStore::new();
    let clock = Clock::manual(t0());
    let service = SessionService::new(
        Arc::new(store.clone()),
        Arc::new(catalog()),
        clock.clone(),
        SessionPolicy::default(),
    );
    Harness {
        service,
        store,
        clock,
    }
}

pub fn pick(question_id: i64, option_id: i64) -> SubmitAnswerRequest {
    SubmitAnswerRequest {
        question_id,
        selected_answer_id: Some(option_id),
        ..Default::default()
    }
}

pub fn pick_many(question_id: i64, option_ids: &[i64]) -> SubmitAnswerRequest {
    SubmitAnswerRequest {
        question_id,
        selected_answer_ids: Some(option_ids.to_vec()),
        ..Default::default()
    }
}

pub fn write(question_id: i64, text: &str) -> SubmitAnswerRequest {
    SubmitAnswerRequest {
        question_id,
        text_response: Some(text.to_string()),
        ..Default::default()
    }
}
