//! Batch settlement scheduler.
//!
//! Periodically scans pending bets, asks the result feed for the final
//! results of their linked events, determines win/loss/push per bet, and
//! drives each one through the settlement engine. Each bet settles
//! independently — a failure on one never aborts the rest of the batch;
//! per-bet errors are collected into the report.
//!
//! Outcome determination compares the bet's stored side identifier with
//! the result's winning side identifier. `AlreadySettled` from the engine
//! is the expected idempotency guard when a batch run is retried, and is
//! counted rather than treated as a failure.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::odds;
use crate::results::ResultFeed;
use crate::types::{Bet, BetOutcome, EventResult, LedgerError};

use super::settlement::SettlementEngine;

// ---------------------------------------------------------------------------
// Batch report
// ---------------------------------------------------------------------------

/// A bet the batch could not settle, with the reason.
#[derive(Debug, Clone)]
pub struct FailedSettlement {
    pub bet_id: String,
    pub reason: String,
}

/// Summary of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Pending bets scanned.
    pub scanned: usize,
    /// Bets settled by this run.
    pub settled: usize,
    /// Bets another caller settled first (idempotent rejections).
    pub already_settled: usize,
    /// Bets whose event has no final result yet.
    pub skipped: usize,
    /// Per-bet errors; the batch continued past each of them.
    pub failed: Vec<FailedSettlement>,
    /// Net profit/loss applied across the settled bets.
    pub net_applied: Decimal,
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned={} settled={} already_settled={} skipped={} failed={} net=${}",
            self.scanned,
            self.settled,
            self.already_settled,
            self.skipped,
            self.failed.len(),
            self.net_applied,
        )
    }
}

// ---------------------------------------------------------------------------
// Batch settler
// ---------------------------------------------------------------------------

pub struct BatchSettler {
    engine: SettlementEngine,
    feed: Arc<dyn ResultFeed>,
}

impl BatchSettler {
    pub fn new(engine: SettlementEngine, feed: Arc<dyn ResultFeed>) -> Self {
        Self { engine, feed }
    }

    /// Run one settlement pass over all pending bets.
    pub async fn run_once(&self) -> Result<BatchReport, LedgerError> {
        let pending = self.engine.store().pending_bets().await?;
        let mut report = BatchReport {
            scanned: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            return Ok(report);
        }

        let mut event_ids: Vec<String> = pending.iter().map(|b| b.event_id.clone()).collect();
        event_ids.sort();
        event_ids.dedup();

        let results = self.feed.final_results(&event_ids).await?;
        let by_event: HashMap<&str, &EventResult> =
            results.iter().map(|r| (r.event_id.as_str(), r)).collect();

        for bet in &pending {
            let Some(result) = by_event.get(bet.event_id.as_str()) else {
                report.skipped += 1;
                continue;
            };

            let (outcome, actual_return) = match determine_outcome(bet, result) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(bet_id = %bet.id, error = %e, "Outcome determination failed");
                    report.failed.push(FailedSettlement {
                        bet_id: bet.id.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match self
                .engine
                .settle(&bet.id, outcome, actual_return, None)
                .await
            {
                Ok(result) => {
                    report.settled += 1;
                    report.net_applied += result.transaction.amount;
                }
                Err(LedgerError::AlreadySettled { .. }) => {
                    report.already_settled += 1;
                }
                Err(e) => {
                    warn!(bet_id = %bet.id, error = %e, "Settlement failed");
                    report.failed.push(FailedSettlement {
                        bet_id: bet.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            feed = self.feed.name(),
            settled = report.settled,
            already_settled = report.already_settled,
            skipped = report.skipped,
            failed = report.failed.len(),
            net = %report.net_applied,
            "Batch settlement complete"
        );
        Ok(report)
    }
}

/// Map a final event result onto a bet's outcome.
///
/// A final tie (no winning side) pushes; otherwise the bet wins exactly
/// when its side identifier equals the winning side. Winning returns are
/// derived from the stored odds.
fn determine_outcome(
    bet: &Bet,
    result: &EventResult,
) -> Result<(BetOutcome, Option<Decimal>), LedgerError> {
    match result.winning_side.as_deref() {
        None => Ok((BetOutcome::Push, None)),
        Some(winner) if winner == bet.side => {
            let gross = odds::gross_return(bet.stake, bet.odds)?;
            Ok((BetOutcome::Win, Some(gross)))
        }
        Some(_) => Ok((BetOutcome::Loss, None)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::MockResultFeed;
    use crate::store::Store;
    use crate::types::{BetRequest, BetStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    async fn engine_with_user(user: &str) -> SettlementEngine {
        let store = Store::open_in_memory().await.unwrap();
        let engine = SettlementEngine::new(store);
        engine.open_account(user, dec!(1000)).await.unwrap();
        engine
    }

    fn request(user: &str, event: &str, side: &str, stake: Decimal, odds: i32) -> BetRequest {
        BetRequest {
            user_id: user.to_string(),
            event_id: event.to_string(),
            market: "moneyline".to_string(),
            side: side.to_string(),
            stake,
            odds,
            line: None,
        }
    }

    fn final_result(event: &str, winner: Option<&str>) -> EventResult {
        EventResult {
            event_id: event.to_string(),
            winning_side: winner.map(String::from),
            home_score: 3,
            away_score: 1,
            is_final: true,
            completed_at: Some(Utc::now()),
        }
    }

    fn feed_returning(results: Vec<EventResult>) -> Arc<dyn ResultFeed> {
        let mut feed = MockResultFeed::new();
        feed.expect_final_results()
            .returning(move |_| Ok(results.clone()));
        feed.expect_name().return_const("mock".to_string());
        Arc::new(feed)
    }

    #[tokio::test]
    async fn test_batch_settles_win_loss_push() {
        let engine = engine_with_user("u1").await;
        let win = engine
            .place_bet(request("u1", "evt-1", "home", dec!(100), -110))
            .await
            .unwrap();
        let loss = engine
            .place_bet(request("u1", "evt-1", "away", dec!(50), 120))
            .await
            .unwrap();
        let push = engine
            .place_bet(request("u1", "evt-2", "home", dec!(25), -105))
            .await
            .unwrap();

        let feed = feed_returning(vec![
            final_result("evt-1", Some("home")),
            final_result("evt-2", None),
        ]);
        let settler = BatchSettler::new(engine.clone(), feed);

        let report = settler.run_once().await.unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.settled, 3);
        assert!(report.failed.is_empty());

        let store = engine.store();
        assert_eq!(store.get_bet(&win.id).await.unwrap().unwrap().status, BetStatus::Win);
        assert_eq!(store.get_bet(&loss.id).await.unwrap().unwrap().status, BetStatus::Loss);
        assert_eq!(store.get_bet(&push.id).await.unwrap().unwrap().status, BetStatus::Push);

        // Win: gross 190.91 → +90.91; loss: −50; push: 0.
        assert_eq!(report.net_applied, dec!(40.91));
        store.audit_account("u1").await.unwrap();
    }

    #[tokio::test]
    async fn test_batch_skips_events_without_final_result() {
        let engine = engine_with_user("u1").await;
        let bet = engine
            .place_bet(request("u1", "evt-9", "home", dec!(100), -110))
            .await
            .unwrap();

        let settler = BatchSettler::new(engine.clone(), feed_returning(vec![]));
        let report = settler.run_once().await.unwrap();

        assert_eq!(report.scanned, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.settled, 0);
        assert_eq!(
            engine.store().get_bet(&bet.id).await.unwrap().unwrap().status,
            BetStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_batch_rerun_counts_already_settled() {
        let engine = engine_with_user("u1").await;
        engine
            .place_bet(request("u1", "evt-1", "home", dec!(100), -110))
            .await
            .unwrap();

        let feed = feed_returning(vec![final_result("evt-1", Some("home"))]);
        let settler = BatchSettler::new(engine.clone(), feed);

        let first = settler.run_once().await.unwrap();
        assert_eq!(first.settled, 1);

        // A retried run finds nothing pending.
        let second = settler.run_once().await.unwrap();
        assert_eq!(second.scanned, 0);
        assert_eq!(second.settled, 0);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() {
        let engine = engine_with_user("u1").await;
        engine
            .place_bet(request("u1", "evt-1", "home", dec!(100), -110))
            .await
            .unwrap();

        // A bet whose user has no account: its settlement fails.
        let orphan = crate::types::Bet::new(request("ghost", "evt-1", "home", dec!(10), -110));
        let mut conn = engine.store().pool().acquire().await.unwrap();
        crate::store::insert_bet(&mut conn, &orphan).await.unwrap();
        drop(conn);

        let feed = feed_returning(vec![final_result("evt-1", Some("home"))]);
        let settler = BatchSettler::new(engine.clone(), feed);

        let report = settler.run_once().await.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.settled, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].bet_id, orphan.id);
        engine.store().audit_account("u1").await.unwrap();
    }

    #[test]
    fn test_determine_outcome_matrix() {
        let bet = {
            let mut b = crate::types::Bet::new(request("u1", "evt-1", "home", dec!(100), 150));
            b.side = "home".to_string();
            b
        };

        let (outcome, ret) =
            determine_outcome(&bet, &final_result("evt-1", Some("home"))).unwrap();
        assert_eq!(outcome, BetOutcome::Win);
        assert_eq!(ret, Some(dec!(250.00)));

        let (outcome, ret) =
            determine_outcome(&bet, &final_result("evt-1", Some("away"))).unwrap();
        assert_eq!(outcome, BetOutcome::Loss);
        assert!(ret.is_none());

        let (outcome, _) = determine_outcome(&bet, &final_result("evt-1", None)).unwrap();
        assert_eq!(outcome, BetOutcome::Push);
    }

    #[test]
    fn test_report_display() {
        let report = BatchReport {
            scanned: 5,
            settled: 3,
            already_settled: 1,
            skipped: 1,
            failed: vec![],
            net_applied: dec!(12.34),
        };
        let display = format!("{report}");
        assert!(display.contains("settled=3"));
        assert!(display.contains("$12.34"));
    }
}
