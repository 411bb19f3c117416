// src/state.rs

use axum::extract::FromRef;

use crate::{config::Config, services::session::SessionService};

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub config: Config,
}

impl FromRef<AppState> for SessionService {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
