//! Settlement engine.
//!
//! The state-machine core: transitions a bet exactly once from pending to
//! a terminal outcome and applies the resulting profit/loss to the user's
//! bankroll and transaction ledger as a single atomic unit. Every entry
//! point that changes money or bet state lives here so the ledger, the
//! account balance, and the performance aggregates can never drift apart.
//!
//! Ordering rule: inside a transaction the bet row is always read before
//! the account row, at every call site. The pending → terminal write is a
//! compare-and-swap on `status = 'pending'`, so a concurrent settlement
//! of the same bet observes `AlreadySettled` and performs no side effects.

use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use tracing::info;

use crate::odds;
use crate::store::{self, Store};
use crate::types::{
    BankrollAccount, BankrollTransaction, Bet, BetOutcome, BetRequest, BetStatus, LedgerError,
    SettlementResult, TransactionType,
};

use super::aggregates;

/// Engine facade over the ledger store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    store: Store,
}

impl SettlementEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // -- accounts ----------------------------------------------------------

    /// Open a bankroll account (and its aggregate row) for a new user.
    pub async fn open_account(
        &self,
        user_id: &str,
        starting_amount: Decimal,
    ) -> Result<BankrollAccount, LedgerError> {
        if starting_amount < Decimal::ZERO {
            return Err(LedgerError::InvalidStake(starting_amount));
        }
        let account = BankrollAccount::new(user_id, starting_amount);
        self.store.create_account(&account).await?;
        info!(user_id, starting = %starting_amount, "Account opened");
        Ok(account)
    }

    /// Recommend a stake for a prospective bet using the account's
    /// fractional-Kelly policy. Returns a zero stake when the edge at
    /// this price is below the account's minimum.
    pub async fn recommend_stake(
        &self,
        user_id: &str,
        win_probability: f64,
        price: i32,
    ) -> Result<odds::KellyStake, LedgerError> {
        let account = self
            .store
            .get_account(user_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(user_id.to_string()))?;

        let mut sized = odds::kelly_stake(
            win_probability,
            price,
            account.current_amount,
            account.kelly_multiplier,
        )?;

        if sized.edge < account.min_edge {
            sized.stake = Decimal::ZERO;
            sized.applied_fraction = 0.0;
            return Ok(sized);
        }

        // The account's own cap may be tighter than the global one.
        let bankroll = account.current_amount.to_f64().unwrap_or(0.0);
        let cap = Decimal::from_f64(bankroll * account.max_bet_pct)
            .unwrap_or(Decimal::ZERO)
            .round_dp(2);
        if sized.stake > cap {
            sized.stake = cap;
        }
        Ok(sized)
    }

    // -- bet placement -----------------------------------------------------

    /// Place a new pending bet. The aggregate deltas ride the same
    /// transaction as the insert.
    pub async fn place_bet(&self, req: BetRequest) -> Result<Bet, LedgerError> {
        if req.stake <= Decimal::ZERO {
            return Err(LedgerError::InvalidStake(req.stake));
        }
        if req.odds == 0 {
            return Err(LedgerError::InvalidOdds(req.odds));
        }

        let bet = Bet::new(req);
        let mut tx = self.store.pool().begin().await?;

        store::fetch_account(&mut tx, &bet.user_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(bet.user_id.clone()))?;

        store::insert_bet(&mut tx, &bet).await?;
        aggregates::on_bet_created(&mut tx, &bet).await?;
        tx.commit().await?;

        info!(
            bet_id = %bet.id,
            user_id = %bet.user_id,
            stake = %bet.stake,
            odds = bet.odds,
            "Bet placed"
        );
        Ok(bet)
    }

    // -- settlement --------------------------------------------------------

    /// Settle a pending bet to a terminal outcome.
    ///
    /// `actual_return` is required for wins (the realized gross return);
    /// losses store a zero return and pushes return the stake. The whole
    /// sequence — bet transition, balance write, ledger append, aggregate
    /// deltas — commits or rolls back as one unit: on any failure the bet
    /// remains pending and the account is untouched.
    pub async fn settle(
        &self,
        bet_id: &str,
        outcome: BetOutcome,
        actual_return: Option<Decimal>,
        closing_odds: Option<i32>,
    ) -> Result<SettlementResult, LedgerError> {
        let mut tx = self.store.pool().begin().await.map_err(LedgerError::from_sqlx)?;

        // 1. Bet first (fixed lock order).
        let bet = store::fetch_bet(&mut tx, bet_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(bet_id.to_string()))?;
        if bet.status != BetStatus::Pending {
            return Err(LedgerError::AlreadySettled {
                bet_id: bet_id.to_string(),
                status: bet.status,
            });
        }

        // 2. Then the owning account.
        let account = store::fetch_account(&mut tx, &bet.user_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(bet.user_id.clone()))?;

        // 3. Profit and the realized return to record.
        let actual = match outcome {
            BetOutcome::Win => {
                let r = actual_return.ok_or_else(|| {
                    LedgerError::InvalidOutcome("win settlement requires actual_return".into())
                })?;
                if r < Decimal::ZERO {
                    return Err(LedgerError::InvalidStake(r));
                }
                r
            }
            BetOutcome::Loss => Decimal::ZERO,
            BetOutcome::Push => bet.stake,
        };
        let profit = match outcome {
            BetOutcome::Win => actual - bet.stake,
            BetOutcome::Loss => -bet.stake,
            BetOutcome::Push => Decimal::ZERO,
        };

        // 4. New balance.
        let balance_before = account.current_amount;
        let balance_after = balance_before + profit;

        let settled_at = Utc::now();
        let clv = match closing_odds {
            Some(closing) => {
                let v = odds::closing_line_value(bet.odds, closing)?;
                Decimal::from_f64(v).map(|d| d.round_dp(4))
            }
            None => None,
        };

        // 5. Terminal transition, guarded on the pending state.
        let updated = sqlx::query(
            "UPDATE bets SET
                status = ?, actual_return = ?, profit_loss = ?, settled_at = ?,
                closing_odds = ?, closing_line_value = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(outcome.status().as_str())
        .bind(actual.to_string())
        .bind(profit.to_string())
        .bind(settled_at)
        .bind(closing_odds)
        .bind(clv.map(|d| d.to_string()))
        .bind(bet_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Lost the race: another settlement committed between our
            // read and this write.
            let status = store::fetch_bet(&mut tx, bet_id)
                .await?
                .map(|b| b.status)
                .unwrap_or(BetStatus::Pending);
            return Err(if status.is_terminal() {
                LedgerError::AlreadySettled {
                    bet_id: bet_id.to_string(),
                    status,
                }
            } else {
                LedgerError::ConcurrentModification
            });
        }

        // 6. Balance write.
        store::update_account_balance(&mut tx, &bet.user_id, balance_after).await?;

        // 7. Ledger append.
        let transaction = BankrollTransaction::new(
            &bet.user_id,
            outcome.transaction_type(),
            profit,
            balance_after,
            Some(bet_id.to_string()),
        );
        store::insert_transaction(&mut tx, &transaction).await?;

        // 8. Aggregate deltas, same unit.
        let mut settled_bet = bet;
        settled_bet.status = outcome.status();
        settled_bet.actual_return = Some(actual);
        settled_bet.profit_loss = Some(profit);
        settled_bet.settled_at = Some(settled_at);
        settled_bet.closing_odds = closing_odds;
        settled_bet.closing_line_value = clv;
        aggregates::on_bet_settled(&mut tx, &settled_bet).await?;

        tx.commit().await?;

        info!(
            bet_id,
            user_id = %settled_bet.user_id,
            outcome = %outcome,
            profit = %profit,
            balance = %balance_after,
            "Bet settled"
        );

        Ok(SettlementResult {
            bet: settled_bet,
            transaction,
            balance_before,
            balance_after,
        })
    }

    // -- deletion ----------------------------------------------------------

    /// Explicit user-data deletion of a bet: removes the row and its
    /// linked ledger entries, reverses any applied balance effect, and
    /// applies the inverse aggregate deltas — so the ledger invariant
    /// holds over the remaining rows.
    pub async fn delete_bet(&self, bet_id: &str) -> Result<(), LedgerError> {
        let mut tx = self.store.pool().begin().await?;

        let bet = store::fetch_bet(&mut tx, bet_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(bet_id.to_string()))?;

        if bet.is_settled() {
            let account = store::fetch_account(&mut tx, &bet.user_id)
                .await?
                .ok_or_else(|| LedgerError::AccountNotFound(bet.user_id.clone()))?;
            let profit = bet.profit_loss.unwrap_or(Decimal::ZERO);
            store::update_account_balance(&mut tx, &bet.user_id, account.current_amount - profit)
                .await?;
        }

        sqlx::query("DELETE FROM bankroll_transactions WHERE bet_id = ?")
            .bind(bet_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM bets WHERE id = ?")
            .bind(bet_id)
            .execute(&mut *tx)
            .await?;

        aggregates::on_bet_deleted(&mut tx, &bet).await?;
        tx.commit().await?;

        info!(bet_id, user_id = %bet.user_id, "Bet deleted");
        Ok(())
    }

    // -- deposits & withdrawals --------------------------------------------

    pub async fn deposit(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<BankrollTransaction, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidStake(amount));
        }
        let mut tx = self.store.pool().begin().await?;
        let account = store::fetch_account(&mut tx, user_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(user_id.to_string()))?;

        let balance_after = account.current_amount + amount;
        store::update_account_balance(&mut tx, user_id, balance_after).await?;
        let transaction = BankrollTransaction::new(
            user_id,
            TransactionType::Deposit,
            amount,
            balance_after,
            None,
        );
        store::insert_transaction(&mut tx, &transaction).await?;
        tx.commit().await?;

        info!(user_id, amount = %amount, balance = %balance_after, "Deposit");
        Ok(transaction)
    }

    /// Withdraw against the *available* balance — funds locked behind
    /// pending bets cannot leave the account.
    pub async fn withdraw(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<BankrollTransaction, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidStake(amount));
        }
        let mut tx = self.store.pool().begin().await?;
        let account = store::fetch_account(&mut tx, user_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(user_id.to_string()))?;
        let aggregate = store::fetch_aggregate(&mut tx, user_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(user_id.to_string()))?;

        let available = account.current_amount - aggregate.pending_amount;
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        let balance_after = account.current_amount - amount;
        store::update_account_balance(&mut tx, user_id, balance_after).await?;
        let transaction = BankrollTransaction::new(
            user_id,
            TransactionType::Withdrawal,
            -amount,
            balance_after,
            None,
        );
        store::insert_transaction(&mut tx, &transaction).await?;
        tx.commit().await?;

        info!(user_id, amount = %amount, balance = %balance_after, "Withdrawal");
        Ok(transaction)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
