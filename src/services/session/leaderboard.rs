// src/services/session/leaderboard.rs

use crate::{
    error::AppError,
    models::{
        leaderboard::{LeaderboardEntry, LeaderboardPage, LeaderboardQuery, UserRank},
        session::Session,
    },
    services::session::SessionService,
};

/// Pairs a window of sessions, already in leaderboard order, with competition ranks.
///
/// `offset` is the window's position in the full leaderboard and `first_rank`
/// the rank of its first row. A row that ties with its predecessor shares its
/// rank; any other row is ranked by its 1-based position.
pub fn rank_window(sessions: Vec<Session>, offset: i64, first_rank: i64) -> Vec<(i64, Session)> {
    let mut rows: Vec<(i64, Session)> = Vec::with_capacity(sessions.len());
    for (i, session) in sessions.into_iter().enumerate() {
        let rank = match rows.last() {
            None => first_rank,
            Some((prev_rank, prev)) if !prev.outranks(&session) => *prev_rank,
            Some(_) => offset + i as i64 + 1,
        };
        rows.push((rank, session));
    }
    rows
}

impl SessionService {
    /// Completed sessions of a quiz in rank order, one page at a time.
    ///
    /// `page`/`size` take precedence over `limit`. Sizes are clamped to the
    /// configured maximum. Only the requested page is read from the store.
    pub async fn leaderboard(
        &self,
        quiz_id: i64,
        query: LeaderboardQuery,
    ) -> Result<LeaderboardPage, AppError> {
        self.load_quiz(quiz_id).await?;

        let max = self.policy.leaderboard_max_limit;
        let default = self.policy.leaderboard_default_limit.min(max);
        let (page, size) = if query.page.is_some() || query.size.is_some() {
            (
                query.page.unwrap_or(1).max(1),
                query.size.unwrap_or(default).clamp(1, max),
            )
        } else {
            (1, query.limit.unwrap_or(default).clamp(1, max))
        };

        let total_entries = self.store.count_completed(quiz_id).await?;
        let offset = (page - 1).saturating_mul(size);
        let window = if offset < total_entries {
            self.store.completed_page(quiz_id, offset, size).await?
        } else {
            Vec::new()
        };

        let first_rank = match window.first() {
            Some(first) => self.store.count_outranking(first).await? + 1,
            None => offset + 1,
        };
        let rows = rank_window(window, offset, first_rank);

        let user_ids: Vec<i64> = rows.iter().map(|(_, s)| s.user_id).collect();
        let names = self.catalog.display_names(&user_ids).await?;

        let entries = rows
            .into_iter()
            .map(|(rank, s)| LeaderboardEntry {
                rank,
                user_id: s.user_id,
                username: names
                    .get(&s.user_id)
                    .cloned()
                    .unwrap_or_else(|| format!("user-{}", s.user_id)),
                session_id: s.id,
                score: s.final_score(),
                points_earned: s.points_earned,
                max_points: s.max_points,
                correct_answers: s.correct_answers,
                total_questions: s.total_questions,
                time_spent_seconds: s.time_spent_seconds,
                completed_at: s.finished_at,
            })
            .collect();

        Ok(LeaderboardPage {
            quiz_id,
            page,
            size,
            total_entries,
            entries,
        })
    }

    /// Rank of the user's best completed session on a quiz.
    pub async fn user_rank(&self, quiz_id: i64, user_id: i64) -> Result<UserRank, AppError> {
        self.load_quiz(quiz_id).await?;

        let total_participants = self.store.count_completed(quiz_id).await?;
        let best = self.store.best_completed_for(quiz_id, user_id).await?;
        let rank = match &best {
            Some(session) => Some(self.store.count_outranking(session).await? + 1),
            None => None,
        };

        Ok(UserRank {
            quiz_id,
            user_id,
            rank,
            session_id: best.as_ref().map(|s| s.id),
            score: best.as_ref().map(Session::final_score),
            time_spent_seconds: best.as_ref().map(|s| s.time_spent_seconds),
            total_participants,
        })
    }

    /// Rank of one completed session and the size of the field it competes in.
    pub(super) async fn standing(&self, session: &Session) -> Result<(i64, i64), AppError> {
        let ahead = self.store.count_outranking(session).await?;
        let field = self.store.count_completed(session.quiz_id).await?;
        Ok((ahead + 1, field))
    }
}
