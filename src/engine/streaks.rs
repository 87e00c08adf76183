//! Streak recalculator.
//!
//! The one intentionally O(n) operation in the system: when a win/loss
//! settlement flips `needs_recalculation`, this module rebuilds the
//! signed current streak and the longest win/loss runs from the user's
//! settled bets in chronological order. It runs lazily — on read, or on
//! the scheduler's sweep — and never blocks settlement. Recomputation
//! from the same bet history always yields the same result, so it is
//! safe to call concurrently and safe to skip under load (a stale streak
//! display is acceptable; stale win-rate/ROI is not).

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::store::Store;
use crate::types::{BetStatus, LedgerError};

// ---------------------------------------------------------------------------
// Pure pass
// ---------------------------------------------------------------------------

/// Result of a streak pass over a win/loss sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakSummary {
    /// Signed: positive = current win streak, negative = loss streak.
    pub current: i32,
    pub longest_win: u32,
    pub longest_loss: u32,
}

/// One linear pass over settled outcomes in chronological order.
/// Anything that is not a win or a loss is ignored.
pub fn compute_streaks(outcomes: &[BetStatus]) -> StreakSummary {
    let mut current: i32 = 0;
    let mut longest_win: u32 = 0;
    let mut longest_loss: u32 = 0;

    for outcome in outcomes {
        match outcome {
            BetStatus::Win => {
                current = if current > 0 { current + 1 } else { 1 };
                longest_win = longest_win.max(current as u32);
            }
            BetStatus::Loss => {
                current = if current < 0 { current - 1 } else { -1 };
                longest_loss = longest_loss.max(current.unsigned_abs());
            }
            _ => {}
        }
    }

    StreakSummary {
        current,
        longest_win,
        longest_loss,
    }
}

// ---------------------------------------------------------------------------
// Lazy recalculation
// ---------------------------------------------------------------------------

/// Recalculate a user's streak fields if (and only if) the dirty flag is
/// set. Returns whether a recalculation ran.
///
/// Only the streak columns are written, so a settlement committing
/// between our read and our write cannot have its O(1) fields clobbered.
pub async fn recalculate_if_needed(store: &Store, user_id: &str) -> Result<bool, LedgerError> {
    let agg = store
        .get_aggregate(user_id)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(user_id.to_string()))?;

    if !agg.needs_recalculation {
        return Ok(false);
    }

    let bets = store.settled_win_loss_bets(user_id).await?;
    let outcomes: Vec<BetStatus> = bets.iter().map(|b| b.status).collect();
    let summary = compute_streaks(&outcomes);

    sqlx::query(
        "UPDATE performance_aggregates SET
            current_streak = ?, longest_win_streak = ?, longest_loss_streak = ?,
            needs_recalculation = 0, last_synced_at = ?
         WHERE user_id = ?",
    )
    .bind(summary.current)
    .bind(summary.longest_win)
    .bind(summary.longest_loss)
    .bind(Utc::now())
    .bind(user_id)
    .execute(store.pool())
    .await?;

    debug!(
        user_id,
        current = summary.current,
        longest_win = summary.longest_win,
        longest_loss = summary.longest_loss,
        resolved = outcomes.len(),
        "Streaks recalculated"
    );

    Ok(true)
}

/// Recalculate every flagged user. Failures are logged per user and do
/// not abort the sweep. Returns the number of users recalculated.
pub async fn sweep(store: &Store) -> Result<usize, LedgerError> {
    let users = store.users_needing_recalculation().await?;
    if users.is_empty() {
        return Ok(0);
    }

    let results = join_all(
        users
            .iter()
            .map(|user_id| recalculate_if_needed(store, user_id)),
    )
    .await;

    let mut recalculated = 0;
    for (user_id, result) in users.iter().zip(results) {
        match result {
            Ok(true) => recalculated += 1,
            Ok(false) => {}
            Err(e) => warn!(user_id, error = %e, "Streak recalculation failed"),
        }
    }

    info!(flagged = users.len(), recalculated, "Streak sweep complete");
    Ok(recalculated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
