// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

use crate::error::AppError;

/// Default percentage a finalized session needs to be marked as passed.
pub const DEFAULT_PASSING_SCORE: f64 = 60.0;

/// Default Expiry Sweeper tick.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub passing_score: f64,
    pub sweep_interval_secs: u64,
    pub leaderboard_default_limit: i64,
    pub leaderboard_max_limit: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let passing_score = parsed_or("PASSING_SCORE", DEFAULT_PASSING_SCORE)?;
        if !(0.0..=100.0).contains(&passing_score) {
            return Err(AppError::Config(format!(
                "PASSING_SCORE must be between 0 and 100, got {}",
                passing_score
            )));
        }

        let sweep_interval_secs = parsed_or("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        if sweep_interval_secs == 0 {
            return Err(AppError::Config("SWEEP_INTERVAL_SECS must be positive".to_string()));
        }

        let leaderboard_default_limit = parsed_or("LEADERBOARD_DEFAULT_LIMIT", 10)?;
        let leaderboard_max_limit = parsed_or("LEADERBOARD_MAX_LIMIT", 100)?;

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            passing_score,
            sweep_interval_secs,
            leaderboard_default_limit,
            leaderboard_max_limit,
        })
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::Config(format!("{} must be set", key)))
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}
