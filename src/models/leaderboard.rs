// src/models/leaderboard.rs

use serde::{Deserialize, Serialize};

/// One ranked row of a quiz leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: i64,
    pub username: String,
    pub session_id: i64,
    pub score: f64,
    pub points_earned: i32,
    pub max_points: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub time_spent_seconds: i32,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A page of the leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardPage {
    pub quiz_id: i64,
    pub page: i64,
    pub size: i64,
    pub total_entries: i64,
    pub entries: Vec<LeaderboardEntry>,
}

/// Query string for the leaderboard: either `limit`, or `page` + `size`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// A user's standing on one quiz.
#[derive(Debug, Clone, Serialize)]
pub struct UserRank {
    pub quiz_id: i64,
    pub user_id: i64,
    /// `None` if the user has no completed session for the quiz.
    pub rank: Option<i64>,
    pub session_id: Option<i64>,
    pub score: Option<f64>,
    pub time_spent_seconds: Option<i32>,
    pub total_participants: i64,
}
