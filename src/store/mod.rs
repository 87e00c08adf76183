//! Persistence layer.
//!
//! SQLite via sqlx: bets, bankroll accounts, the append-only transaction
//! ledger, per-user performance aggregates, and ingested event results.
//!
//! Monetary columns are TEXT-encoded `Decimal` values; summing them
//! happens in Rust, never in SQL, so no value ever passes through a
//! float. Timestamps are `chrono` UTC values.

use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::types::{
    BankrollAccount, BankrollStatus, BankrollTransaction, Bet, BetStatus, EventResult,
    LedgerError, PerformanceAggregate, TransactionType,
};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS bets (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        event_id TEXT NOT NULL,
        market TEXT NOT NULL,
        side TEXT NOT NULL,
        stake TEXT NOT NULL,
        odds INTEGER NOT NULL,
        line TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        actual_return TEXT,
        profit_loss TEXT,
        closing_odds INTEGER,
        closing_line_value TEXT,
        placed_at TEXT NOT NULL,
        settled_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_bets_user ON bets(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_bets_status ON bets(status)",
    "CREATE INDEX IF NOT EXISTS idx_bets_event ON bets(event_id)",
    "CREATE TABLE IF NOT EXISTS bankroll_accounts (
        user_id TEXT PRIMARY KEY,
        starting_amount TEXT NOT NULL,
        current_amount TEXT NOT NULL,
        kelly_multiplier REAL NOT NULL,
        max_bet_pct REAL NOT NULL,
        min_edge REAL NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS bankroll_transactions (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        tx_type TEXT NOT NULL,
        amount TEXT NOT NULL,
        balance_after TEXT NOT NULL,
        bet_id TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_tx_user ON bankroll_transactions(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_tx_bet ON bankroll_transactions(bet_id)",
    "CREATE TABLE IF NOT EXISTS performance_aggregates (
        user_id TEXT PRIMARY KEY,
        total_bets INTEGER NOT NULL,
        wins INTEGER NOT NULL,
        losses INTEGER NOT NULL,
        pushes INTEGER NOT NULL,
        total_wagered TEXT NOT NULL,
        total_won TEXT NOT NULL,
        total_lost TEXT NOT NULL,
        total_profit TEXT NOT NULL,
        win_rate TEXT NOT NULL,
        roi TEXT NOT NULL,
        average_bet_size TEXT NOT NULL,
        largest_win TEXT NOT NULL,
        largest_loss TEXT NOT NULL,
        pending_count INTEGER NOT NULL,
        pending_amount TEXT NOT NULL,
        last_bet_at TEXT,
        last_win_at TEXT,
        last_loss_at TEXT,
        current_streak INTEGER NOT NULL,
        longest_win_streak INTEGER NOT NULL,
        longest_loss_streak INTEGER NOT NULL,
        needs_recalculation INTEGER NOT NULL,
        last_synced_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS event_results (
        event_id TEXT PRIMARY KEY,
        winning_side TEXT,
        home_score INTEGER NOT NULL,
        away_score INTEGER NOT NULL,
        is_final INTEGER NOT NULL,
        completed_at TEXT
    )",
];

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Handle to the SQLite-backed ledger store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) a file-backed store.
    ///
    /// `busy_timeout` bounds how long a writer waits for the database
    /// lock before the operation surfaces `ConcurrentModification`.
    pub async fn open(path: &str, busy_timeout: Duration) -> Result<Self, LedgerError> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(busy_timeout)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        let store = Store { pool };
        store.migrate().await?;
        info!(path, "Store opened");
        Ok(store)
    }

    /// Open an in-memory store (tests). Single connection so every
    /// caller sees the same database.
    pub async fn open_in_memory() -> Result<Self, LedgerError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(LedgerError::from_sqlx)?
            .busy_timeout(Duration::from_millis(500));
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        let store = Store { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), LedgerError> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // -- accounts ----------------------------------------------------------

    /// Insert a new account together with its zeroed aggregate row.
    pub async fn create_account(&self, account: &BankrollAccount) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO bankroll_accounts
             (user_id, starting_amount, current_amount, kelly_multiplier,
              max_bet_pct, min_edge, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.user_id)
        .bind(account.starting_amount.to_string())
        .bind(account.current_amount.to_string())
        .bind(account.kelly_multiplier)
        .bind(account.max_bet_pct)
        .bind(account.min_edge)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await?;

        write_aggregate_insert(&mut tx, &PerformanceAggregate::new(&account.user_id)).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_account(&self, user_id: &str) -> Result<Option<BankrollAccount>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        fetch_account(&mut conn, user_id).await
    }

    // -- bets --------------------------------------------------------------

    pub async fn get_bet(&self, id: &str) -> Result<Option<Bet>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        fetch_bet(&mut conn, id).await
    }

    /// All pending bets, oldest first (batch settlement scan order).
    pub async fn pending_bets(&self) -> Result<Vec<Bet>, LedgerError> {
        let rows = sqlx::query("SELECT * FROM bets WHERE status = 'pending' ORDER BY placed_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(bet_from_row).collect()
    }

    pub async fn bets_for_user(&self, user_id: &str) -> Result<Vec<Bet>, LedgerError> {
        let rows = sqlx::query("SELECT * FROM bets WHERE user_id = ? ORDER BY placed_at ASC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(bet_from_row).collect()
    }

    /// Settled win/loss bets for a user in chronological placement order —
    /// the streak recalculation input. Pushes are excluded.
    pub async fn settled_win_loss_bets(&self, user_id: &str) -> Result<Vec<Bet>, LedgerError> {
        let rows = sqlx::query(
            "SELECT * FROM bets
             WHERE user_id = ? AND status IN ('win', 'loss')
             ORDER BY placed_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(bet_from_row).collect()
    }

    // -- ledger ------------------------------------------------------------

    pub async fn transactions_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<BankrollTransaction>, LedgerError> {
        let rows = sqlx::query(
            "SELECT * FROM bankroll_transactions WHERE user_id = ? ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(transaction_from_row).collect()
    }

    // -- aggregates --------------------------------------------------------

    pub async fn get_aggregate(
        &self,
        user_id: &str,
    ) -> Result<Option<PerformanceAggregate>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        fetch_aggregate(&mut conn, user_id).await
    }

    /// Users whose streak fields are flagged for recalculation.
    pub async fn users_needing_recalculation(&self) -> Result<Vec<String>, LedgerError> {
        let rows =
            sqlx::query("SELECT user_id FROM performance_aggregates WHERE needs_recalculation = 1")
                .fetch_all(&self.pool)
                .await?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("user_id").map_err(LedgerError::from_sqlx))
            .collect()
    }

    // -- event results -----------------------------------------------------

    pub async fn upsert_event_result(&self, result: &EventResult) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO event_results
             (event_id, winning_side, home_score, away_score, is_final, completed_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(event_id) DO UPDATE SET
                winning_side = excluded.winning_side,
                home_score = excluded.home_score,
                away_score = excluded.away_score,
                is_final = excluded.is_final,
                completed_at = excluded.completed_at",
        )
        .bind(&result.event_id)
        .bind(&result.winning_side)
        .bind(result.home_score)
        .bind(result.away_score)
        .bind(result.is_final as i64)
        .bind(result.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_event_result(
        &self,
        event_id: &str,
    ) -> Result<Option<EventResult>, LedgerError> {
        let row = sqlx::query("SELECT * FROM event_results WHERE event_id = ?")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(event_result_from_row).transpose()
    }

    // -- read side & audit -------------------------------------------------

    /// Bankroll summary for a user: balances, pending exposure, and
    /// lifetime deposit/withdrawal totals (summed in decimal, in Rust).
    pub async fn bankroll_status(&self, user_id: &str) -> Result<BankrollStatus, LedgerError> {
        let account = self
            .get_account(user_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(user_id.to_string()))?;
        let aggregate = self
            .get_aggregate(user_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(user_id.to_string()))?;
        let transactions = self.transactions_for(user_id).await?;

        let mut total_deposits = Decimal::ZERO;
        let mut total_withdrawals = Decimal::ZERO;
        for tx in &transactions {
            match tx.tx_type {
                TransactionType::Deposit => total_deposits += tx.amount,
                TransactionType::Withdrawal => total_withdrawals += tx.amount.abs(),
                _ => {}
            }
        }

        Ok(BankrollStatus {
            user_id: user_id.to_string(),
            current_balance: account.current_amount,
            available_balance: account.current_amount - aggregate.pending_amount,
            starting_balance: account.starting_amount,
            profit_loss: account.profit_loss(),
            profit_loss_pct: account.profit_loss_pct(),
            pending_exposure: aggregate.pending_amount,
            total_deposits,
            total_withdrawals,
        })
    }

    /// Verify the ledger invariant for one user:
    /// `current_amount == starting_amount + Σ(transaction.amount)`.
    ///
    /// A divergence is surfaced as `ConsistencyViolation` for manual
    /// reconciliation — it is never auto-corrected here.
    pub async fn audit_account(&self, user_id: &str) -> Result<(), LedgerError> {
        let account = self
            .get_account(user_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(user_id.to_string()))?;
        let transactions = self.transactions_for(user_id).await?;

        let ledger_sum: Decimal = transactions.iter().map(|t| t.amount).sum();
        let expected = account.starting_amount + ledger_sum;

        if expected != account.current_amount {
            return Err(LedgerError::ConsistencyViolation {
                user_id: user_id.to_string(),
                detail: format!(
                    "balance ${} != starting ${} + ledger sum ${} (expected ${})",
                    account.current_amount, account.starting_amount, ledger_sum, expected,
                ),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Connection-level helpers (shared with the engine's transactions)
// ---------------------------------------------------------------------------

pub(crate) async fn fetch_bet(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Bet>, LedgerError> {
    let row = sqlx::query("SELECT * FROM bets WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(bet_from_row).transpose()
}

pub(crate) async fn fetch_account(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<BankrollAccount>, LedgerError> {
    let row = sqlx::query("SELECT * FROM bankroll_accounts WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(account_from_row).transpose()
}

pub(crate) async fn fetch_aggregate(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<PerformanceAggregate>, LedgerError> {
    let row = sqlx::query("SELECT * FROM performance_aggregates WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(aggregate_from_row).transpose()
}

pub(crate) async fn insert_bet(
    conn: &mut SqliteConnection,
    bet: &Bet,
) -> Result<(), LedgerError> {
    sqlx::query(
        "INSERT INTO bets
         (id, user_id, event_id, market, side, stake, odds, line, status,
          actual_return, profit_loss, closing_odds, closing_line_value,
          placed_at, settled_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&bet.id)
    .bind(&bet.user_id)
    .bind(&bet.event_id)
    .bind(&bet.market)
    .bind(&bet.side)
    .bind(bet.stake.to_string())
    .bind(bet.odds)
    .bind(bet.line.map(|d| d.to_string()))
    .bind(bet.status.as_str())
    .bind(bet.actual_return.map(|d| d.to_string()))
    .bind(bet.profit_loss.map(|d| d.to_string()))
    .bind(bet.closing_odds)
    .bind(bet.closing_line_value.map(|d| d.to_string()))
    .bind(bet.placed_at)
    .bind(bet.settled_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_transaction(
    conn: &mut SqliteConnection,
    tx: &BankrollTransaction,
) -> Result<(), LedgerError> {
    sqlx::query(
        "INSERT INTO bankroll_transactions
         (id, user_id, tx_type, amount, balance_after, bet_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&tx.id)
    .bind(&tx.user_id)
    .bind(tx.tx_type.as_str())
    .bind(tx.amount.to_string())
    .bind(tx.balance_after.to_string())
    .bind(&tx.bet_id)
    .bind(tx.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn update_account_balance(
    conn: &mut SqliteConnection,
    user_id: &str,
    new_balance: Decimal,
) -> Result<(), LedgerError> {
    sqlx::query(
        "UPDATE bankroll_accounts SET current_amount = ?, updated_at = ? WHERE user_id = ?",
    )
    .bind(new_balance.to_string())
    .bind(chrono::Utc::now())
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Write every field of an aggregate row (UPDATE).
pub(crate) async fn write_aggregate(
    conn: &mut SqliteConnection,
    agg: &PerformanceAggregate,
) -> Result<(), LedgerError> {
    sqlx::query(
        "UPDATE performance_aggregates SET
            total_bets = ?, wins = ?, losses = ?, pushes = ?,
            total_wagered = ?, total_won = ?, total_lost = ?, total_profit = ?,
            win_rate = ?, roi = ?, average_bet_size = ?,
            largest_win = ?, largest_loss = ?,
            pending_count = ?, pending_amount = ?,
            last_bet_at = ?, last_win_at = ?, last_loss_at = ?,
            current_streak = ?, longest_win_streak = ?, longest_loss_streak = ?,
            needs_recalculation = ?, last_synced_at = ?
         WHERE user_id = ?",
    )
    .bind(agg.total_bets)
    .bind(agg.wins)
    .bind(agg.losses)
    .bind(agg.pushes)
    .bind(agg.total_wagered.to_string())
    .bind(agg.total_won.to_string())
    .bind(agg.total_lost.to_string())
    .bind(agg.total_profit.to_string())
    .bind(agg.win_rate.to_string())
    .bind(agg.roi.to_string())
    .bind(agg.average_bet_size.to_string())
    .bind(agg.largest_win.to_string())
    .bind(agg.largest_loss.to_string())
    .bind(agg.pending_count)
    .bind(agg.pending_amount.to_string())
    .bind(agg.last_bet_at)
    .bind(agg.last_win_at)
    .bind(agg.last_loss_at)
    .bind(agg.current_streak)
    .bind(agg.longest_win_streak)
    .bind(agg.longest_loss_streak)
    .bind(agg.needs_recalculation as i64)
    .bind(agg.last_synced_at)
    .bind(&agg.user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_aggregate_insert(
    conn: &mut SqliteConnection,
    agg: &PerformanceAggregate,
) -> Result<(), LedgerError> {
    sqlx::query(
        "INSERT INTO performance_aggregates
         (user_id, total_bets, wins, losses, pushes,
          total_wagered, total_won, total_lost, total_profit,
          win_rate, roi, average_bet_size, largest_win, largest_loss,
          pending_count, pending_amount, last_bet_at, last_win_at, last_loss_at,
          current_streak, longest_win_streak, longest_loss_streak,
          needs_recalculation, last_synced_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&agg.user_id)
    .bind(agg.total_bets)
    .bind(agg.wins)
    .bind(agg.losses)
    .bind(agg.pushes)
    .bind(agg.total_wagered.to_string())
    .bind(agg.total_won.to_string())
    .bind(agg.total_lost.to_string())
    .bind(agg.total_profit.to_string())
    .bind(agg.win_rate.to_string())
    .bind(agg.roi.to_string())
    .bind(agg.average_bet_size.to_string())
    .bind(agg.largest_win.to_string())
    .bind(agg.largest_loss.to_string())
    .bind(agg.pending_count)
    .bind(agg.pending_amount.to_string())
    .bind(agg.last_bet_at)
    .bind(agg.last_win_at)
    .bind(agg.last_loss_at)
    .bind(agg.current_streak)
    .bind(agg.longest_win_streak)
    .bind(agg.longest_loss_streak)
    .bind(agg.needs_recalculation as i64)
    .bind(agg.last_synced_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn bets_for_user_conn(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<Bet>, LedgerError> {
    let rows = sqlx::query("SELECT * FROM bets WHERE user_id = ? ORDER BY placed_at ASC")
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(bet_from_row).collect()
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn dec_col(row: &SqliteRow, col: &str) -> Result<Decimal, LedgerError> {
    let s: String = row.try_get(col)?;
    Decimal::from_str(&s).map_err(|e| {
        LedgerError::Storage(format!("bad decimal in column {col}: {e}"))
    })
}

fn opt_dec_col(row: &SqliteRow, col: &str) -> Result<Option<Decimal>, LedgerError> {
    let s: Option<String> = row.try_get(col)?;
    s.map(|s| {
        Decimal::from_str(&s)
            .map_err(|e| LedgerError::Storage(format!("bad decimal in column {col}: {e}")))
    })
    .transpose()
}

pub(crate) fn bet_from_row(row: &SqliteRow) -> Result<Bet, LedgerError> {
    let status: String = row.try_get("status")?;
    Ok(Bet {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        event_id: row.try_get("event_id")?,
        market: row.try_get("market")?,
        side: row.try_get("side")?,
        stake: dec_col(row, "stake")?,
        odds: row.try_get("odds")?,
        line: opt_dec_col(row, "line")?,
        status: status.parse::<BetStatus>()?,
        actual_return: opt_dec_col(row, "actual_return")?,
        profit_loss: opt_dec_col(row, "profit_loss")?,
        closing_odds: row.try_get("closing_odds")?,
        closing_line_value: opt_dec_col(row, "closing_line_value")?,
        placed_at: row.try_get("placed_at")?,
        settled_at: row.try_get("settled_at")?,
    })
}

pub(crate) fn account_from_row(row: &SqliteRow) -> Result<BankrollAccount, LedgerError> {
    Ok(BankrollAccount {
        user_id: row.try_get("user_id")?,
        starting_amount: dec_col(row, "starting_amount")?,
        current_amount: dec_col(row, "current_amount")?,
        kelly_multiplier: row.try_get("kelly_multiplier")?,
        max_bet_pct: row.try_get("max_bet_pct")?,
        min_edge: row.try_get("min_edge")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn transaction_from_row(row: &SqliteRow) -> Result<BankrollTransaction, LedgerError> {
    let tx_type: String = row.try_get("tx_type")?;
    Ok(BankrollTransaction {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        tx_type: tx_type.parse::<TransactionType>()?,
        amount: dec_col(row, "amount")?,
        balance_after: dec_col(row, "balance_after")?,
        bet_id: row.try_get("bet_id")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn aggregate_from_row(row: &SqliteRow) -> Result<PerformanceAggregate, LedgerError> {
    Ok(PerformanceAggregate {
        user_id: row.try_get("user_id")?,
        total_bets: row.try_get("total_bets")?,
        wins: row.try_get("wins")?,
        losses: row.try_get("losses")?,
        pushes: row.try_get("pushes")?,
        total_wagered: dec_col(row, "total_wagered")?,
        total_won: dec_col(row, "total_won")?,
        total_lost: dec_col(row, "total_lost")?,
        total_profit: dec_col(row, "total_profit")?,
        win_rate: dec_col(row, "win_rate")?,
        roi: dec_col(row, "roi")?,
        average_bet_size: dec_col(row, "average_bet_size")?,
        largest_win: dec_col(row, "largest_win")?,
        largest_loss: dec_col(row, "largest_loss")?,
        pending_count: row.try_get("pending_count")?,
        pending_amount: dec_col(row, "pending_amount")?,
        last_bet_at: row.try_get("last_bet_at")?,
        last_win_at: row.try_get("last_win_at")?,
        last_loss_at: row.try_get("last_loss_at")?,
        current_streak: row.try_get("current_streak")?,
        longest_win_streak: row.try_get("longest_win_streak")?,
        longest_loss_streak: row.try_get("longest_loss_streak")?,
        needs_recalculation: row.try_get::<i64, _>("needs_recalculation")? != 0,
        last_synced_at: row.try_get("last_synced_at")?,
    })
}

fn event_result_from_row(row: &SqliteRow) -> Result<EventResult, LedgerError> {
    Ok(EventResult {
        event_id: row.try_get("event_id")?,
        winning_side: row.try_get("winning_side")?,
        home_score: row.try_get("home_score")?,
        away_score: row.try_get("away_score")?,
        is_final: row.try_get::<i64, _>("is_final")? != 0,
        completed_at: row.try_get("completed_at")?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
