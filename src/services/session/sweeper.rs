// src/services/session/sweeper.rs

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{
    error::AppError,
    models::session::SessionStatus,
    services::session::{SessionService, session_not_found},
};

/// Outcome of one expiry pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Sessions found past their deadline.
    pub examined: usize,
    pub timed_out: usize,
    pub failed: usize,
}

impl SessionService {
    /// Times out every `IN_PROGRESS` session whose deadline has passed.
    ///
    /// Each session is finalized in its own unit of work. A failure is logged
    /// and counted; the pass carries on with the remaining sessions and the
    /// failed one is picked up again on the next tick.
    pub async fn process_expired_sessions(&self) -> Result<SweepReport, AppError> {
        let now = self.clock.now();
        let expired = self.store.find_expired_sessions(now).await?;

        let mut report = SweepReport {
            examined: expired.len(),
            ..SweepReport::default()
        };
        for session in expired {
            match self.time_out(session.id, now).await {
                Ok(true) => report.timed_out += 1,
                // Submitted or resumed by its owner since the scan.
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        session_id = session.id,
                        user_id = session.user_id,
                        quiz_id = session.quiz_id,
                        "Failed to time out session: {}",
                        e
                    );
                }
            }
        }

        if report.timed_out > 0 || report.failed > 0 {
            tracing::info!(
                examined = report.examined,
                timed_out = report.timed_out,
                failed = report.failed,
                "Expiry sweep finished"
            );
        }
        Ok(report)
    }

    /// Finalizes one session as `TIMED_OUT` if it is still expired under lock.
    async fn time_out(&self, session_id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut unit = self.store.begin().await?;
        let mut session = unit
            .lock_session(session_id)
            .await?
            .ok_or_else(|| session_not_found(session_id))?;
        if !session.is_expired(now) {
            return Ok(false);
        }
        let quiz = self.load_quiz(session.quiz_id).await?;

        self.finalize_in(&mut *unit, &mut session, &quiz, SessionStatus::TimedOut, now)
            .await?;
        unit.commit().await?;

        tracing::info!(
            session_id,
            user_id = session.user_id,
            quiz_id = session.quiz_id,
            "Session timed out"
        );
        Ok(true)
    }
}

/// Runs [`SessionService::process_expired_sessions`] every `period` until
/// `shutdown` flips to `true` or its sender is dropped.
pub fn spawn_expiry_sweeper(
    service: SessionService,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!("Expiry sweeper started (interval: {}s)", period.as_secs());

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = service.process_expired_sessions().await {
                        tracing::error!("Expiry sweep failed: {}", e);
                    }
                }
            }
        }

        tracing::info!("Expiry sweeper stopped");
    })
}
