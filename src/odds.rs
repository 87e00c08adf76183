//! Odds and probability utilities.
//!
//! Pure, deterministic conversions between American odds representations
//! plus expected value, fractional Kelly staking, and closing-line value.
//! No state and no database dependency — everything here is unit-testable
//! in isolation and consumed by the settlement engine and the stake
//! recommendation path.
//!
//! American convention: positive odds are the underdog payout per 100
//! staked; negative odds are the favorite risk per 100 won. Zero is not a
//! valid price.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::types::LedgerError;

/// Safety ceiling on the full Kelly fraction, before the fractional
/// multiplier is applied.
pub const MAX_KELLY_FRACTION: f64 = 0.20;

/// Hard cap on any recommended stake as a fraction of bankroll.
pub const MAX_STAKE_PCT: f64 = 0.05;

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Implied win probability of an American price.
///
/// Favorite (`odds < 0`): `|odds| / (|odds| + 100)`.
/// Underdog (`odds > 0`): `100 / (odds + 100)`.
pub fn implied_probability(odds: i32) -> Result<f64, LedgerError> {
    if odds == 0 {
        return Err(LedgerError::InvalidOdds(odds));
    }
    let o = odds.abs() as f64;
    if odds < 0 {
        Ok(o / (o + 100.0))
    } else {
        Ok(100.0 / (o + 100.0))
    }
}

/// Decimal (European) odds equivalent of an American price.
///
/// Favorite: `100/|odds| + 1`. Underdog: `odds/100 + 1`.
pub fn decimal_odds(odds: i32) -> Result<f64, LedgerError> {
    if odds == 0 {
        return Err(LedgerError::InvalidOdds(odds));
    }
    let o = odds.abs() as f64;
    if odds < 0 {
        Ok(100.0 / o + 1.0)
    } else {
        Ok(o / 100.0 + 1.0)
    }
}

// ---------------------------------------------------------------------------
// Expected value
// ---------------------------------------------------------------------------

/// Expected value of a bet at a given win probability and price.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedValue {
    /// Dollar EV for the given stake.
    pub ev: f64,
    /// EV as a percentage of the stake.
    pub ev_pct: f64,
    /// `win_probability − implied_probability(odds)`.
    pub edge: f64,
}

/// Compute the expected value of staking `stake` at `odds` with an
/// estimated win probability.
///
/// `EV = p · stake · (d − 1) − (1 − p) · stake` where `d` is the decimal
/// odds equivalent.
pub fn expected_value(
    win_probability: f64,
    odds: i32,
    stake: f64,
) -> Result<ExpectedValue, LedgerError> {
    if !(0.0..=1.0).contains(&win_probability) {
        return Err(LedgerError::InvalidProbability(win_probability));
    }
    if stake <= 0.0 {
        return Err(LedgerError::InvalidStake(
            Decimal::from_f64(stake).unwrap_or(Decimal::ZERO),
        ));
    }

    let d = decimal_odds(odds)?;
    let implied = implied_probability(odds)?;

    let ev = win_probability * stake * (d - 1.0) - (1.0 - win_probability) * stake;
    Ok(ExpectedValue {
        ev,
        ev_pct: ev / stake * 100.0,
        edge: win_probability - implied,
    })
}

// ---------------------------------------------------------------------------
// Kelly staking
// ---------------------------------------------------------------------------

/// Fractional Kelly stake recommendation.
#[derive(Debug, Clone)]
pub struct KellyStake {
    /// Raw Kelly fraction after the safety clamp.
    pub full_fraction: f64,
    /// Fraction actually applied (full × fractional multiplier, capped).
    pub applied_fraction: f64,
    /// Recommended dollar stake. Zero means no bet.
    pub stake: Decimal,
    /// Edge over the implied probability.
    pub edge: f64,
}

/// Size a bet with fractional Kelly.
///
/// Full Kelly `f = edge · d / (d − 1)` is clamped to
/// `[0, MAX_KELLY_FRACTION]`; the recommendation is
/// `bankroll · f · fraction`, additionally capped at `MAX_STAKE_PCT` of
/// bankroll. Returns a zero stake when `f ≤ 0` (no edge at this price).
pub fn kelly_stake(
    win_probability: f64,
    odds: i32,
    bankroll: Decimal,
    fraction: f64,
) -> Result<KellyStake, LedgerError> {
    if !(0.0..=1.0).contains(&win_probability) {
        return Err(LedgerError::InvalidProbability(win_probability));
    }
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(LedgerError::InvalidProbability(fraction));
    }
    if bankroll.is_sign_negative() {
        return Err(LedgerError::InvalidStake(bankroll));
    }

    let d = decimal_odds(odds)?;
    let implied = implied_probability(odds)?;
    let edge = win_probability - implied;

    let full = (edge * d / (d - 1.0)).clamp(0.0, MAX_KELLY_FRACTION);
    if full <= 0.0 {
        return Ok(KellyStake {
            full_fraction: 0.0,
            applied_fraction: 0.0,
            stake: Decimal::ZERO,
            edge,
        });
    }

    let applied = (full * fraction).min(MAX_STAKE_PCT);
    let bankroll_f = bankroll.to_f64().unwrap_or(0.0);
    let stake_f = bankroll_f * applied;
    let stake = Decimal::from_f64(stake_f)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2);

    Ok(KellyStake {
        full_fraction: full,
        applied_fraction: applied,
        stake,
        edge,
    })
}

// ---------------------------------------------------------------------------
// Closing-line value
// ---------------------------------------------------------------------------

/// Closing-line value in implied-probability percentage points.
///
/// `(implied(closing) − implied(placed)) × 100`; positive means the bettor
/// got a better number than the market's final price.
pub fn closing_line_value(placed_odds: i32, closing_odds: i32) -> Result<f64, LedgerError> {
    let placed = implied_probability(placed_odds)?;
    let closing = implied_probability(closing_odds)?;
    Ok((closing - placed) * 100.0)
}

// ---------------------------------------------------------------------------
// Settlement returns
// ---------------------------------------------------------------------------

/// Gross winning return (stake + profit) for a stake at American odds,
/// computed in exact decimal arithmetic and rounded to cents.
///
/// Used by the batch settler to derive `actual_return` for wins.
pub fn gross_return(stake: Decimal, odds: i32) -> Result<Decimal, LedgerError> {
    if odds == 0 {
        return Err(LedgerError::InvalidOdds(odds));
    }
    if stake <= Decimal::ZERO {
        return Err(LedgerError::InvalidStake(stake));
    }
    let hundred = Decimal::from(100);
    let profit = if odds > 0 {
        stake * Decimal::from(odds) / hundred
    } else {
        stake * hundred / Decimal::from(-odds)
    };
    Ok((stake + profit).round_dp(2))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
