//! Shared types for the TALLY engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that store, engine, and dashboard
//! modules can depend on them without circular references.
//!
//! All monetary values are `rust_decimal::Decimal` — never floating
//! point — so repeated aggregate updates cannot accumulate rounding drift.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Bet lifecycle enums
// ---------------------------------------------------------------------------

/// Lifecycle state of a bet. Terminal once non-pending; settlement is a
/// one-way transition enforced by the settlement engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Pending,
    Win,
    Loss,
    Push,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Win => "win",
            BetStatus::Loss => "loss",
            BetStatus::Push => "push",
        }
    }

    /// Whether this is a terminal (settled) state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BetStatus::Pending)
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BetStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BetStatus::Pending),
            "win" | "won" => Ok(BetStatus::Win),
            "loss" | "lost" => Ok(BetStatus::Loss),
            "push" | "pushed" => Ok(BetStatus::Push),
            other => Err(LedgerError::InvalidOutcome(other.to_string())),
        }
    }
}

/// A settleable outcome — the terminal subset of [`BetStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetOutcome {
    Win,
    Loss,
    Push,
}

impl BetOutcome {
    /// The terminal bet status this outcome settles into.
    pub fn status(&self) -> BetStatus {
        match self {
            BetOutcome::Win => BetStatus::Win,
            BetOutcome::Loss => BetStatus::Loss,
            BetOutcome::Push => BetStatus::Push,
        }
    }

    /// The ledger transaction type recorded for this outcome.
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            BetOutcome::Win => TransactionType::BetWon,
            BetOutcome::Loss => TransactionType::BetLost,
            BetOutcome::Push => TransactionType::BetPushed,
        }
    }
}

impl fmt::Display for BetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status())
    }
}

impl std::str::FromStr for BetOutcome {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "win" | "won" => Ok(BetOutcome::Win),
            "loss" | "lost" => Ok(BetOutcome::Loss),
            "push" | "pushed" => Ok(BetOutcome::Push),
            other => Err(LedgerError::InvalidOutcome(other.to_string())),
        }
    }
}

/// Type of a bankroll ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    BetWon,
    BetLost,
    BetPushed,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::BetWon => "bet_won",
            TransactionType::BetLost => "bet_lost",
            TransactionType::BetPushed => "bet_pushed",
            TransactionType::Refund => "refund",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "bet_won" => Ok(TransactionType::BetWon),
            "bet_lost" => Ok(TransactionType::BetLost),
            "bet_pushed" => Ok(TransactionType::BetPushed),
            "refund" => Ok(TransactionType::Refund),
            other => Err(LedgerError::InvalidOutcome(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Bet
// ---------------------------------------------------------------------------

/// A wager a user placed on a sporting event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub user_id: String,
    /// External event this bet is linked to.
    pub event_id: String,
    /// Market / bet-type tag: "moneyline" | "spread" | "total" | ...
    pub market: String,
    /// Stable identifier of the side selected (e.g. "home", "away",
    /// a team id). Settlement compares this against the result feed's
    /// winning side — never free-text team names.
    pub side: String,
    /// Stake amount, must be > 0.
    pub stake: Decimal,
    /// Price in American odds: positive = underdog payout per 100,
    /// negative = favorite risk per 100 to win 100. Zero is invalid.
    pub odds: i32,
    /// Optional line value (spread / total markets).
    pub line: Option<Decimal>,
    pub status: BetStatus,
    /// Realized return, set at settlement (win: gross return,
    /// push: stake, loss: 0).
    pub actual_return: Option<Decimal>,
    /// win: return − stake; loss: −stake; push: 0.
    pub profit_loss: Option<Decimal>,
    /// Closing price, if known at settlement.
    pub closing_odds: Option<i32>,
    /// Closing-line value in implied-probability points × 100.
    pub closing_line_value: Option<Decimal>,
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Bet {
    /// Create a new pending bet with a fresh id.
    pub fn new(req: BetRequest) -> Self {
        Bet {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: req.user_id,
            event_id: req.event_id,
            market: req.market,
            side: req.side,
            stake: req.stake,
            odds: req.odds,
            line: req.line,
            status: BetStatus::Pending,
            actual_return: None,
            profit_loss: None,
            closing_odds: None,
            closing_line_value: None,
            placed_at: Utc::now(),
            settled_at: None,
        }
    }

    /// Whether this bet has reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }

    /// Helper to build a test bet with sensible defaults.
    #[cfg(test)]
    pub fn sample(user_id: &str, stake: Decimal, odds: i32) -> Self {
        Bet::new(BetRequest {
            user_id: user_id.to_string(),
            event_id: "evt-001".to_string(),
            market: "moneyline".to_string(),
            side: "home".to_string(),
            stake,
            odds,
            line: None,
        })
    }
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} ${} @ {:+} ({})",
            self.user_id, self.market, self.side, self.stake, self.odds, self.status,
        )
    }
}

/// Input for placing a new bet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRequest {
    pub user_id: String,
    pub event_id: String,
    pub market: String,
    pub side: String,
    pub stake: Decimal,
    pub odds: i32,
    #[serde(default)]
    pub line: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Bankroll account & ledger
// ---------------------------------------------------------------------------

/// One bankroll per user: the single authority for that user's balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankrollAccount {
    pub user_id: String,
    /// Fixed reference point for lifetime P/L%.
    pub starting_amount: Decimal,
    /// Live spendable balance. Invariant: equals
    /// `starting_amount + Σ(transaction.amount)` at all times.
    pub current_amount: Decimal,
    /// Fractional Kelly multiplier for stake recommendations.
    pub kelly_multiplier: f64,
    /// Maximum single bet as a fraction of bankroll.
    pub max_bet_pct: f64,
    /// Minimum edge required before a stake is recommended.
    pub min_edge: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BankrollAccount {
    pub fn new(user_id: &str, starting_amount: Decimal) -> Self {
        let now = Utc::now();
        BankrollAccount {
            user_id: user_id.to_string(),
            starting_amount,
            current_amount: starting_amount,
            kelly_multiplier: 0.25,
            max_bet_pct: 0.05,
            min_edge: 0.02,
            created_at: now,
            updated_at: now,
        }
    }

    /// Lifetime profit/loss relative to the starting baseline.
    pub fn profit_loss(&self) -> Decimal {
        self.current_amount - self.starting_amount
    }

    /// Lifetime P/L as a percentage of the starting amount.
    pub fn profit_loss_pct(&self) -> Decimal {
        if self.starting_amount.is_zero() {
            Decimal::ZERO
        } else {
            (self.profit_loss() / self.starting_amount * Decimal::from(100)).round_dp(2)
        }
    }
}

impl fmt::Display for BankrollAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] balance=${} (start=${} P/L={}%)",
            self.user_id,
            self.current_amount,
            self.starting_amount,
            self.profit_loss_pct(),
        )
    }
}

/// An immutable bankroll ledger entry. Append-only; never updated or
/// deleted under normal operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankrollTransaction {
    pub id: String,
    pub user_id: String,
    pub tx_type: TransactionType,
    /// Signed delta applied to the balance.
    pub amount: Decimal,
    /// Balance snapshot after this entry was applied.
    pub balance_after: Decimal,
    /// Originating bet, when the entry came from a settlement.
    pub bet_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BankrollTransaction {
    pub fn new(
        user_id: &str,
        tx_type: TransactionType,
        amount: Decimal,
        balance_after: Decimal,
        bet_id: Option<String>,
    ) -> Self {
        BankrollTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            tx_type,
            amount,
            balance_after,
            bet_id,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for BankrollTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}${} → ${}",
            self.user_id,
            self.tx_type,
            if self.amount.is_sign_negative() { "-" } else { "+" },
            self.amount.abs(),
            self.balance_after,
        )
    }
}

// ---------------------------------------------------------------------------
// Performance aggregate
// ---------------------------------------------------------------------------

/// Denormalized per-user performance view over bet history.
///
/// The O(1) fields are maintained transactionally alongside every bet
/// mutation and must equal a from-scratch recomputation at any instant.
/// The streak fields may be stale while `needs_recalculation` is set and
/// must be exact immediately after a recalculation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceAggregate {
    pub user_id: String,
    pub total_bets: u32,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub total_wagered: Decimal,
    pub total_won: Decimal,
    pub total_lost: Decimal,
    pub total_profit: Decimal,
    /// wins / (wins + losses) × 100; pushes excluded.
    pub win_rate: Decimal,
    /// total_profit / total_wagered × 100.
    pub roi: Decimal,
    pub average_bet_size: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub pending_count: u32,
    pub pending_amount: Decimal,
    pub last_bet_at: Option<DateTime<Utc>>,
    pub last_win_at: Option<DateTime<Utc>>,
    pub last_loss_at: Option<DateTime<Utc>>,
    /// Signed: positive = current win streak, negative = loss streak.
    pub current_streak: i32,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    /// Set when a win/loss settlement invalidates the streak fields;
    /// cleared by the streak recalculator.
    pub needs_recalculation: bool,
    pub last_synced_at: DateTime<Utc>,
}

impl PerformanceAggregate {
    pub fn new(user_id: &str) -> Self {
        PerformanceAggregate {
            user_id: user_id.to_string(),
            total_bets: 0,
            wins: 0,
            losses: 0,
            pushes: 0,
            total_wagered: Decimal::ZERO,
            total_won: Decimal::ZERO,
            total_lost: Decimal::ZERO,
            total_profit: Decimal::ZERO,
            win_rate: Decimal::ZERO,
            roi: Decimal::ZERO,
            average_bet_size: Decimal::ZERO,
            largest_win: Decimal::ZERO,
            largest_loss: Decimal::ZERO,
            pending_count: 0,
            pending_amount: Decimal::ZERO,
            last_bet_at: None,
            last_win_at: None,
            last_loss_at: None,
            current_streak: 0,
            longest_win_streak: 0,
            longest_loss_streak: 0,
            needs_recalculation: false,
            last_synced_at: Utc::now(),
        }
    }

    /// Number of settled win/loss bets (pushes excluded).
    pub fn resolved(&self) -> u32 {
        self.wins + self.losses
    }
}

impl fmt::Display for PerformanceAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] bets={} (W{}/L{}/P{}) win_rate={}% roi={}% profit=${} pending={} (${})",
            self.user_id,
            self.total_bets,
            self.wins,
            self.losses,
            self.pushes,
            self.win_rate,
            self.roi,
            self.total_profit,
            self.pending_count,
            self.pending_amount,
        )
    }
}

// ---------------------------------------------------------------------------
// Engine results
// ---------------------------------------------------------------------------

/// Returned by the settlement engine after a successful settlement.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementResult {
    pub bet: Bet,
    pub transaction: BankrollTransaction,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
}

impl fmt::Display for SettlementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} settled {} ${} → ${}",
            self.bet.id, self.bet.status, self.balance_before, self.balance_after,
        )
    }
}

/// Result of an external sporting event, as ingested by a results feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResult {
    pub event_id: String,
    /// Stable identifier of the winning side. `None` on a final tie —
    /// moneyline bets on either side push.
    pub winning_side: Option<String>,
    pub home_score: i32,
    pub away_score: i32,
    pub is_final: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl fmt::Display for EventResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}-{} {}",
            self.event_id,
            self.home_score,
            self.away_score,
            if self.is_final { "final" } else { "in progress" },
        )
    }
}

/// Read-side bankroll summary.
#[derive(Debug, Clone, Serialize)]
pub struct BankrollStatus {
    pub user_id: String,
    pub current_balance: Decimal,
    /// current_balance − pending exposure.
    pub available_balance: Decimal,
    pub starting_balance: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_pct: Decimal,
    pub pending_exposure: Decimal,
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error taxonomy for TALLY.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid outcome: {0}")]
    InvalidOutcome(String),

    #[error("Invalid American odds: {0}")]
    InvalidOdds(i32),

    #[error("Invalid win probability: {0} (must be within [0, 1])")]
    InvalidProbability(f64),

    #[error("Invalid stake: {0} (must be > 0)")]
    InvalidStake(Decimal),

    #[error("Bet not found: {0}")]
    NotFound(String),

    #[error("Bet {bet_id} already settled as {status}")]
    AlreadySettled { bet_id: String, status: BetStatus },

    #[error("No bankroll account for user {0}")]
    AccountNotFound(String),

    #[error("Lock contention exceeded retry budget")]
    ConcurrentModification,

    #[error("Insufficient balance: need ${needed}, have ${available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    #[error("Ledger consistency violation for {user_id}: {detail}")]
    ConsistencyViolation { user_id: String, detail: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Map a driver error to the domain taxonomy. SQLite busy/locked
    /// conditions surface as `ConcurrentModification` so callers can
    /// retry with backoff instead of blocking indefinitely.
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) => {
                let msg = db.message().to_lowercase();
                if msg.contains("database is locked") || msg.contains("database table is locked") {
                    LedgerError::ConcurrentModification
                } else {
                    LedgerError::Storage(e.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => LedgerError::ConcurrentModification,
            _ => LedgerError::Storage(e.to_string()),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::from_sqlx(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // -- Status / outcome enums --

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", BetStatus::Pending), "pending");
        assert_eq!(format!("{}", BetStatus::Win), "win");
        assert_eq!(format!("{}", BetStatus::Push), "push");
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("pending".parse::<BetStatus>().unwrap(), BetStatus::Pending);
        assert_eq!("WON".parse::<BetStatus>().unwrap(), BetStatus::Win);
        assert_eq!("lost".parse::<BetStatus>().unwrap(), BetStatus::Loss);
        assert!("void".parse::<BetStatus>().is_err());
    }

    #[test]
    fn test_status_terminal() {
        assert!(!BetStatus::Pending.is_terminal());
        assert!(BetStatus::Win.is_terminal());
        assert!(BetStatus::Loss.is_terminal());
        assert!(BetStatus::Push.is_terminal());
    }

    #[test]
    fn test_outcome_maps_to_status_and_tx_type() {
        assert_eq!(BetOutcome::Win.status(), BetStatus::Win);
        assert_eq!(BetOutcome::Loss.status(), BetStatus::Loss);
        assert_eq!(BetOutcome::Push.status(), BetStatus::Push);
        assert_eq!(BetOutcome::Win.transaction_type(), TransactionType::BetWon);
        assert_eq!(BetOutcome::Loss.transaction_type(), TransactionType::BetLost);
        assert_eq!(BetOutcome::Push.transaction_type(), TransactionType::BetPushed);
    }

    #[test]
    fn test_outcome_from_str_invalid() {
        let err = "cancelled".parse::<BetOutcome>().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOutcome(_)));
    }

    #[test]
    fn test_transaction_type_round_trip() {
        for tx in [
            TransactionType::Deposit,
            TransactionType::Withdrawal,
            TransactionType::BetWon,
            TransactionType::BetLost,
            TransactionType::BetPushed,
            TransactionType::Refund,
        ] {
            assert_eq!(tx.as_str().parse::<TransactionType>().unwrap(), tx);
        }
    }

    // -- Bet --

    #[test]
    fn test_bet_new_is_pending() {
        let bet = Bet::sample("u1", dec!(50), -110);
        assert_eq!(bet.status, BetStatus::Pending);
        assert!(!bet.is_settled());
        assert!(bet.actual_return.is_none());
        assert!(bet.profit_loss.is_none());
        assert!(bet.settled_at.is_none());
        assert!(!bet.id.is_empty());
    }

    #[test]
    fn test_bet_display() {
        let bet = Bet::sample("u1", dec!(50), -110);
        let display = format!("{bet}");
        assert!(display.contains("u1"));
        assert!(display.contains("-110"));
        assert!(display.contains("pending"));
    }

    #[test]
    fn test_bet_serialization_roundtrip() {
        let bet = Bet::sample("u1", dec!(25.50), 150);
        let json = serde_json::to_string(&bet).unwrap();
        let parsed: Bet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, bet.id);
        assert_eq!(parsed.stake, dec!(25.50));
        assert_eq!(parsed.odds, 150);
        assert_eq!(parsed.status, BetStatus::Pending);
    }

    // -- BankrollAccount --

    #[test]
    fn test_account_new_defaults() {
        let acct = BankrollAccount::new("u1", dec!(1000));
        assert_eq!(acct.current_amount, dec!(1000));
        assert_eq!(acct.starting_amount, dec!(1000));
        assert_eq!(acct.profit_loss(), Decimal::ZERO);
        assert_eq!(acct.profit_loss_pct(), Decimal::ZERO);
    }

    #[test]
    fn test_account_profit_loss_pct() {
        let mut acct = BankrollAccount::new("u1", dec!(1000));
        acct.current_amount = dec!(1150);
        assert_eq!(acct.profit_loss(), dec!(150));
        assert_eq!(acct.profit_loss_pct(), dec!(15.00));
    }

    #[test]
    fn test_account_zero_start_no_div_by_zero() {
        let mut acct = BankrollAccount::new("u1", Decimal::ZERO);
        acct.current_amount = dec!(10);
        assert_eq!(acct.profit_loss_pct(), Decimal::ZERO);
    }

    // -- BankrollTransaction --

    #[test]
    fn test_transaction_display_signs() {
        let won = BankrollTransaction::new("u1", TransactionType::BetWon, dec!(45.45), dec!(1045.45), None);
        assert!(format!("{won}").contains("+$45.45"));

        let lost = BankrollTransaction::new("u1", TransactionType::BetLost, dec!(-50), dec!(950), None);
        assert!(format!("{lost}").contains("-$50"));
    }

    // -- PerformanceAggregate --

    #[test]
    fn test_aggregate_new_is_zeroed() {
        let agg = PerformanceAggregate::new("u1");
        assert_eq!(agg.total_bets, 0);
        assert_eq!(agg.resolved(), 0);
        assert_eq!(agg.total_profit, Decimal::ZERO);
        assert_eq!(agg.current_streak, 0);
        assert!(!agg.needs_recalculation);
    }

    #[test]
    fn test_aggregate_serialization_roundtrip() {
        let mut agg = PerformanceAggregate::new("u1");
        agg.wins = 7;
        agg.losses = 3;
        agg.current_streak = -2;
        agg.needs_recalculation = true;
        let json = serde_json::to_string(&agg).unwrap();
        let parsed: PerformanceAggregate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.wins, 7);
        assert_eq!(parsed.current_streak, -2);
        assert!(parsed.needs_recalculation);
    }

    // -- LedgerError --

    #[test]
    fn test_error_display() {
        let e = LedgerError::AlreadySettled {
            bet_id: "b1".to_string(),
            status: BetStatus::Win,
        };
        assert_eq!(format!("{e}"), "Bet b1 already settled as win");

        let e = LedgerError::InsufficientBalance {
            needed: dec!(100),
            available: dec!(40.50),
        };
        assert!(format!("{e}").contains("$100"));
        assert!(format!("{e}").contains("$40.50"));

        let e = LedgerError::InvalidOdds(0);
        assert!(format!("{e}").contains('0'));
    }

    #[test]
    fn test_error_from_pool_timeout_is_concurrent() {
        let e = LedgerError::from_sqlx(sqlx::Error::PoolTimedOut);
        assert!(matches!(e, LedgerError::ConcurrentModification));
    }
}
