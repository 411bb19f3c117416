// src/models/mod.rs

pub mod answer;
pub mod leaderboard;
pub mod question;
pub mod quiz;
pub mod result;
pub mod session;
