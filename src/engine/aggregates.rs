//! Incremental aggregate maintainer.
//!
//! Reacts to every bet create/settle/delete and updates the user's
//! `PerformanceAggregate` in O(1) — it never scans the full bet history
//! on the hot path. The expensive streak fields are not touched here;
//! a win/loss settlement only flips `needs_recalculation` and the streak
//! recalculator picks it up lazily.
//!
//! The delta functions are pure and symmetric: replaying
//! create → settle → delete returns the aggregate to its pre-create
//! state exactly. The one concession is deleting a bet that holds a
//! running extremum (largest win/loss, latest timestamp) — that value
//! cannot be inverted from the aggregate alone, so the delete path
//! re-derives it from the user's remaining bets. Deletes are rare;
//! settlement stays O(1).

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

use crate::store::{self, Store};
use crate::types::{Bet, BetStatus, LedgerError, PerformanceAggregate};

use super::streaks;

// ---------------------------------------------------------------------------
// Pure delta functions
// ---------------------------------------------------------------------------

/// Apply the deltas for a newly created (pending) bet.
pub fn apply_created(agg: &mut PerformanceAggregate, bet: &Bet) {
    agg.total_bets += 1;
    agg.pending_count += 1;
    agg.pending_amount += bet.stake;
    agg.total_wagered += bet.stake;
    agg.last_bet_at = match agg.last_bet_at {
        Some(t) if t >= bet.placed_at => Some(t),
        _ => Some(bet.placed_at),
    };
    refresh_ratios(agg);
    agg.last_synced_at = Utc::now();
}

/// Apply the deltas for a pending → terminal transition. `bet` carries
/// its post-settlement state (terminal status, profit_loss, settled_at).
///
/// The stake was already counted in `total_wagered` at creation and is
/// not counted again here.
pub fn apply_settled(agg: &mut PerformanceAggregate, bet: &Bet) {
    let profit = bet.profit_loss.unwrap_or(Decimal::ZERO);

    agg.pending_count = agg.pending_count.saturating_sub(1);
    agg.pending_amount -= bet.stake;
    agg.total_profit += profit;

    match bet.status {
        BetStatus::Win => {
            agg.wins += 1;
            agg.total_won += profit;
            if profit > agg.largest_win {
                agg.largest_win = profit;
            }
            agg.last_win_at = max_ts(agg.last_win_at, bet.settled_at);
            agg.needs_recalculation = true;
        }
        BetStatus::Loss => {
            agg.losses += 1;
            agg.total_lost += profit.abs();
            if profit.abs() > agg.largest_loss {
                agg.largest_loss = profit.abs();
            }
            agg.last_loss_at = max_ts(agg.last_loss_at, bet.settled_at);
            agg.needs_recalculation = true;
        }
        BetStatus::Push => {
            // Pushes never affect streaks — no recalculation flag.
            agg.pushes += 1;
        }
        BetStatus::Pending => {}
    }

    refresh_ratios(agg);
    agg.last_synced_at = Utc::now();
}

/// Apply the exact inverse deltas for a deleted bet, undoing whichever
/// transitions it has undergone. Extremum re-derivation is the caller's
/// responsibility (see [`on_bet_deleted`]).
pub fn apply_deleted(agg: &mut PerformanceAggregate, bet: &Bet) {
    agg.total_bets = agg.total_bets.saturating_sub(1);
    agg.total_wagered -= bet.stake;

    if bet.is_settled() {
        let profit = bet.profit_loss.unwrap_or(Decimal::ZERO);
        agg.total_profit -= profit;
        match bet.status {
            BetStatus::Win => {
                agg.wins = agg.wins.saturating_sub(1);
                agg.total_won -= profit;
                agg.needs_recalculation = true;
            }
            BetStatus::Loss => {
                agg.losses = agg.losses.saturating_sub(1);
                agg.total_lost -= profit.abs();
                agg.needs_recalculation = true;
            }
            BetStatus::Push => {
                agg.pushes = agg.pushes.saturating_sub(1);
            }
            BetStatus::Pending => {}
        }
    } else {
        agg.pending_count = agg.pending_count.saturating_sub(1);
        agg.pending_amount -= bet.stake;
    }

    refresh_ratios(agg);
    agg.last_synced_at = Utc::now();
}

/// Recompute the ratio fields from the maintained counters and sums.
/// These are derived, so "incremental" maintenance is a ratio refresh.
pub fn refresh_ratios(agg: &mut PerformanceAggregate) {
    let resolved = agg.resolved();
    agg.win_rate = if resolved == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(agg.wins) / Decimal::from(resolved) * Decimal::from(100)).round_dp(2)
    };
    agg.roi = if agg.total_wagered.is_zero() {
        Decimal::ZERO
    } else {
        (agg.total_profit / agg.total_wagered * Decimal::from(100)).round_dp(2)
    };
    agg.average_bet_size = if agg.total_bets == 0 {
        Decimal::ZERO
    } else {
        (agg.total_wagered / Decimal::from(agg.total_bets)).round_dp(2)
    };
}

fn max_ts(
    current: Option<chrono::DateTime<Utc>>,
    candidate: Option<chrono::DateTime<Utc>>,
) -> Option<chrono::DateTime<Utc>> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

// ---------------------------------------------------------------------------
// Transactional appliers
// ---------------------------------------------------------------------------

pub(crate) async fn on_bet_created(
    conn: &mut SqliteConnection,
    bet: &Bet,
) -> Result<(), LedgerError> {
    let mut agg = store::fetch_aggregate(conn, &bet.user_id)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(bet.user_id.clone()))?;
    apply_created(&mut agg, bet);
    store::write_aggregate(conn, &agg).await
}

pub(crate) async fn on_bet_settled(
    conn: &mut SqliteConnection,
    bet: &Bet,
) -> Result<(), LedgerError> {
    let mut agg = store::fetch_aggregate(conn, &bet.user_id)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(bet.user_id.clone()))?;
    apply_settled(&mut agg, bet);
    store::write_aggregate(conn, &agg).await
}

/// Called after the bet row has been deleted, inside the same
/// transaction. Re-derives any extremum or latest-timestamp field the
/// deleted bet was holding, from the remaining rows.
pub(crate) async fn on_bet_deleted(
    conn: &mut SqliteConnection,
    bet: &Bet,
) -> Result<(), LedgerError> {
    let mut agg = store::fetch_aggregate(conn, &bet.user_id)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(bet.user_id.clone()))?;
    apply_deleted(&mut agg, bet);

    let profit = bet.profit_loss.unwrap_or(Decimal::ZERO);
    let held_largest_win = bet.status == BetStatus::Win && profit == agg.largest_win;
    let held_largest_loss = bet.status == BetStatus::Loss && profit.abs() == agg.largest_loss;
    let held_last_bet = agg.last_bet_at == Some(bet.placed_at);
    let held_last_win = bet.status == BetStatus::Win && agg.last_win_at == bet.settled_at;
    let held_last_loss = bet.status == BetStatus::Loss && agg.last_loss_at == bet.settled_at;

    if held_largest_win || held_largest_loss || held_last_bet || held_last_win || held_last_loss {
        let remaining = store::bets_for_user_conn(conn, &bet.user_id).await?;
        if held_largest_win {
            agg.largest_win = remaining
                .iter()
                .filter(|b| b.status == BetStatus::Win)
                .filter_map(|b| b.profit_loss)
                .max()
                .unwrap_or(Decimal::ZERO);
        }
        if held_largest_loss {
            agg.largest_loss = remaining
                .iter()
                .filter(|b| b.status == BetStatus::Loss)
                .filter_map(|b| b.profit_loss.map(|p| p.abs()))
                .max()
                .unwrap_or(Decimal::ZERO);
        }
        if held_last_bet {
            agg.last_bet_at = remaining.iter().map(|b| b.placed_at).max();
        }
        if held_last_win {
            agg.last_win_at = remaining
                .iter()
                .filter(|b| b.status == BetStatus::Win)
                .filter_map(|b| b.settled_at)
                .max();
        }
        if held_last_loss {
            agg.last_loss_at = remaining
                .iter()
                .filter(|b| b.status == BetStatus::Loss)
                .filter_map(|b| b.settled_at)
                .max();
        }
    }

    store::write_aggregate(conn, &agg).await
}

// ---------------------------------------------------------------------------
// From-scratch recomputation
// ---------------------------------------------------------------------------

/// Rebuild the aggregate from the user's bet rows. This is the reference
/// the incremental fields are tested against, and the recovery path for
/// manual reconciliation. Streak fields are computed exactly, so the
/// result carries `needs_recalculation = false`.
pub async fn recompute(store: &Store, user_id: &str) -> Result<PerformanceAggregate, LedgerError> {
    let bets = store.bets_for_user(user_id).await?;

    let mut agg = PerformanceAggregate::new(user_id);
    for bet in &bets {
        apply_created(&mut agg, bet);
        if bet.is_settled() {
            apply_settled(&mut agg, bet);
        }
    }

    let outcomes: Vec<BetStatus> = bets
        .iter()
        .filter(|b| matches!(b.status, BetStatus::Win | BetStatus::Loss))
        .map(|b| b.status)
        .collect();
    let summary = streaks::compute_streaks(&outcomes);
    agg.current_streak = summary.current;
    agg.longest_win_streak = summary.longest_win;
    agg.longest_loss_streak = summary.longest_loss;
    agg.needs_recalculation = false;
    agg.last_synced_at = Utc::now();

    Ok(agg)
}

/// Compare the stored aggregate's O(1) fields against a from-scratch
/// recomputation. Divergence is a `ConsistencyViolation` and is never
/// auto-corrected.
pub async fn audit(store: &Store, user_id: &str) -> Result<(), LedgerError> {
    let stored = store
        .get_aggregate(user_id)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(user_id.to_string()))?;
    let reference = recompute(store, user_id).await?;

    let mismatch = |field: &str| {
        Err(LedgerError::ConsistencyViolation {
            user_id: user_id.to_string(),
            detail: format!("aggregate field {field} diverges from bet history"),
        })
    };

    if stored.total_bets != reference.total_bets {
        return mismatch("total_bets");
    }
    if (stored.wins, stored.losses, stored.pushes)
        != (reference.wins, reference.losses, reference.pushes)
    {
        return mismatch("outcome counts");
    }
    if stored.total_wagered != reference.total_wagered {
        return mismatch("total_wagered");
    }
    if stored.total_profit != reference.total_profit {
        return mismatch("total_profit");
    }
    if stored.win_rate != reference.win_rate || stored.roi != reference.roi {
        return mismatch("win_rate/roi");
    }
    if stored.pending_count != reference.pending_count
        || stored.pending_amount != reference.pending_amount
    {
        return mismatch("pending counters");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn settled(bet: &Bet, status: BetStatus, profit: Decimal) -> Bet {
        let mut b = bet.clone();
        b.status = status;
        b.profit_loss = Some(profit);
        b.actual_return = Some(match status {
            BetStatus::Win => b.stake + profit,
            BetStatus::Push => b.stake,
            _ => Decimal::ZERO,
        });
        b.settled_at = Some(Utc::now());
        b
    }

    #[test]
    fn test_create_delta() {
        let mut agg = PerformanceAggregate::new("u1");
        let bet = Bet::sample("u1", dec!(50), -110);
        apply_created(&mut agg, &bet);

        assert_eq!(agg.total_bets, 1);
        assert_eq!(agg.pending_count, 1);
        assert_eq!(agg.pending_amount, dec!(50));
        assert_eq!(agg.total_wagered, dec!(50));
        assert_eq!(agg.average_bet_size, dec!(50.00));
        assert_eq!(agg.last_bet_at, Some(bet.placed_at));
        assert!(!agg.needs_recalculation);
    }

    #[test]
    fn test_settle_win_delta() {
        let mut agg = PerformanceAggregate::new("u1");
        let bet = Bet::sample("u1", dec!(100), -110);
        apply_created(&mut agg, &bet);
        let won = settled(&bet, BetStatus::Win, dec!(90.91));
        apply_settled(&mut agg, &won);

        assert_eq!(agg.wins, 1);
        assert_eq!(agg.pending_count, 0);
        assert_eq!(agg.pending_amount, Decimal::ZERO);
        // Wagered counted once, at creation.
        assert_eq!(agg.total_wagered, dec!(100));
        assert_eq!(agg.total_won, dec!(90.91));
        assert_eq!(agg.total_profit, dec!(90.91));
        assert_eq!(agg.largest_win, dec!(90.91));
        assert_eq!(agg.win_rate, dec!(100.00));
        assert_eq!(agg.roi, dec!(90.91));
        assert!(agg.needs_recalculation);
    }

    #[test]
    fn test_settle_loss_delta() {
        let mut agg = PerformanceAggregate::new("u1");
        let bet = Bet::sample("u1", dec!(100), -110);
        apply_created(&mut agg, &bet);
        let lost = settled(&bet, BetStatus::Loss, dec!(-100));
        apply_settled(&mut agg, &lost);

        assert_eq!(agg.losses, 1);
        assert_eq!(agg.total_lost, dec!(100));
        assert_eq!(agg.largest_loss, dec!(100));
        assert_eq!(agg.total_profit, dec!(-100));
        assert_eq!(agg.win_rate, dec!(0.00));
        assert_eq!(agg.roi, dec!(-100.00));
        assert!(agg.needs_recalculation);
    }

    #[test]
    fn test_settle_push_does_not_dirty_streaks() {
        let mut agg = PerformanceAggregate::new("u1");
        let bet = Bet::sample("u1", dec!(100), -110);
        apply_created(&mut agg, &bet);
        let pushed = settled(&bet, BetStatus::Push, Decimal::ZERO);
        apply_settled(&mut agg, &pushed);

        assert_eq!(agg.pushes, 1);
        assert_eq!(agg.total_profit, Decimal::ZERO);
        assert_eq!(agg.win_rate, Decimal::ZERO);
        assert!(!agg.needs_recalculation);
    }

    #[test]
    fn test_win_rate_excludes_pushes() {
        let mut agg = PerformanceAggregate::new("u1");
        for (status, profit) in [
            (BetStatus::Win, dec!(50)),
            (BetStatus::Loss, dec!(-50)),
            (BetStatus::Push, dec!(0)),
        ] {
            let bet = Bet::sample("u1", dec!(50), 100);
            apply_created(&mut agg, &bet);
            apply_settled(&mut agg, &settled(&bet, status, profit));
        }
        // 1 win of 2 resolved; the push is excluded.
        assert_eq!(agg.win_rate, dec!(50.00));
    }

    #[test]
    fn test_create_settle_delete_replays_to_initial() {
        let mut agg = PerformanceAggregate::new("u1");
        let baseline = agg.clone();

        let bet = Bet::sample("u1", dec!(75), 120);
        apply_created(&mut agg, &bet);
        let won = settled(&bet, BetStatus::Win, dec!(90));
        apply_settled(&mut agg, &won);
        apply_deleted(&mut agg, &won);

        assert_eq!(agg.total_bets, baseline.total_bets);
        assert_eq!(agg.wins, baseline.wins);
        assert_eq!(agg.total_wagered, baseline.total_wagered);
        assert_eq!(agg.total_won, baseline.total_won);
        assert_eq!(agg.total_profit, baseline.total_profit);
        assert_eq!(agg.pending_count, baseline.pending_count);
        assert_eq!(agg.pending_amount, baseline.pending_amount);
        assert_eq!(agg.win_rate, baseline.win_rate);
        assert_eq!(agg.roi, baseline.roi);
    }

    #[test]
    fn test_delete_pending_replays_to_initial() {
        let mut agg = PerformanceAggregate::new("u1");
        let baseline = agg.clone();

        let bet = Bet::sample("u1", dec!(30), -150);
        apply_created(&mut agg, &bet);
        apply_deleted(&mut agg, &bet);

        assert_eq!(agg.total_bets, baseline.total_bets);
        assert_eq!(agg.pending_count, baseline.pending_count);
        assert_eq!(agg.pending_amount, baseline.pending_amount);
        assert_eq!(agg.total_wagered, baseline.total_wagered);
    }

    #[test]
    fn test_largest_win_is_running_maximum() {
        let mut agg = PerformanceAggregate::new("u1");
        for profit in [dec!(40), dec!(120), dec!(75)] {
            let bet = Bet::sample("u1", dec!(50), 100);
            apply_created(&mut agg, &bet);
            apply_settled(&mut agg, &settled(&bet, BetStatus::Win, profit));
        }
        assert_eq!(agg.largest_win, dec!(120));
    }

    #[tokio::test]
    async fn test_recompute_matches_incremental() {
        use crate::types::{BankrollAccount, BetRequest};

        let store = Store::open_in_memory().await.unwrap();
        store
            .create_account(&BankrollAccount::new("u1", dec!(1000)))
            .await
            .unwrap();

        // Drive a few bets through the transactional appliers.
        let mut conn = store.pool().acquire().await.unwrap();
        for (status, profit) in [
            (BetStatus::Win, dec!(45.45)),
            (BetStatus::Loss, dec!(-50)),
            (BetStatus::Win, dec!(30)),
        ] {
            let mut bet = Bet::new(BetRequest {
                user_id: "u1".to_string(),
                event_id: "evt".to_string(),
                market: "moneyline".to_string(),
                side: "home".to_string(),
                stake: dec!(50),
                odds: -110,
                line: None,
            });
            crate::store::insert_bet(&mut conn, &bet).await.unwrap();
            on_bet_created(&mut conn, &bet).await.unwrap();

            bet.status = status;
            bet.profit_loss = Some(profit);
            bet.settled_at = Some(Utc::now());
            sqlx::query("UPDATE bets SET status = ?, profit_loss = ?, settled_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(profit.to_string())
                .bind(bet.settled_at)
                .bind(&bet.id)
                .execute(&mut *conn)
                .await
                .unwrap();
            on_bet_settled(&mut conn, &bet).await.unwrap();
        }
        drop(conn);

        let stored = store.get_aggregate("u1").await.unwrap().unwrap();
        let reference = recompute(&store, "u1").await.unwrap();

        assert_eq!(stored.total_bets, reference.total_bets);
        assert_eq!(stored.wins, reference.wins);
        assert_eq!(stored.losses, reference.losses);
        assert_eq!(stored.total_wagered, reference.total_wagered);
        assert_eq!(stored.total_profit, reference.total_profit);
        assert_eq!(stored.win_rate, reference.win_rate);
        assert_eq!(stored.roi, reference.roi);
        assert_eq!(stored.average_bet_size, reference.average_bet_size);

        audit(&store, "u1").await.unwrap();
    }
}
