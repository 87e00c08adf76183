//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ApiContext>`.
//! Domain errors map onto HTTP statuses: missing entities are 404, the
//! idempotent double-settlement rejection is 409, validation failures are
//! 422, and lock contention is 503 so callers know to retry.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::BankrollConfig;
use crate::engine::{streaks, SettlementEngine};
use crate::odds::KellyStake;
use crate::types::{
    BankrollAccount, BankrollStatus, BankrollTransaction, Bet, BetOutcome, BetRequest,
    LedgerError, PerformanceAggregate, SettlementResult,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiContext {
    pub engine: SettlementEngine,
    pub bankroll: BankrollConfig,
}

pub type AppState = Arc<ApiContext>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub user_id: String,
    /// Falls back to the configured default when omitted.
    #[serde(default)]
    pub starting_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct FundsRequest {
    pub user_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct RecommendParams {
    pub win_probability: f64,
    pub odds: i32,
}

/// `KellyStake` flattened for JSON consumers.
#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub stake: Decimal,
    pub full_fraction: f64,
    pub applied_fraction: f64,
    pub edge: f64,
}

impl From<KellyStake> for RecommendResponse {
    fn from(k: KellyStake) -> Self {
        RecommendResponse {
            stake: k.stake,
            full_fraction: k.full_fraction,
            applied_fraction: k.applied_fraction,
            edge: k.edge,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub bet_id: String,
    /// "win" | "loss" | "push"
    pub outcome: String,
    #[serde(default)]
    pub actual_return: Option<Decimal>,
    #[serde(default)]
    pub closing_odds: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(e: LedgerError) -> ApiError {
    let status = match &e {
        LedgerError::NotFound(_) | LedgerError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::AlreadySettled { .. } => StatusCode::CONFLICT,
        LedgerError::InvalidOutcome(_)
        | LedgerError::InvalidOdds(_)
        | LedgerError::InvalidProbability(_)
        | LedgerError::InvalidStake(_)
        | LedgerError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::ConcurrentModification => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::ConsistencyViolation { .. } | LedgerError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorBody {
            error: e.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /api/accounts — open a bankroll account (the signup hook).
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<BankrollAccount>, ApiError> {
    let store = state.engine.store();
    if store
        .get_account(&req.user_id)
        .await
        .map_err(api_error)?
        .is_some()
    {
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorBody {
                error: format!("account already exists for {}", req.user_id),
            }),
        ));
    }

    let starting = req
        .starting_amount
        .unwrap_or(state.bankroll.default_starting_amount);
    let mut account = BankrollAccount::new(&req.user_id, starting);
    account.kelly_multiplier = state.bankroll.default_kelly_multiplier;
    account.max_bet_pct = state.bankroll.default_max_bet_pct;
    account.min_edge = state.bankroll.default_min_edge;

    store.create_account(&account).await.map_err(api_error)?;
    Ok(Json(account))
}

/// POST /api/deposit
pub async fn deposit(
    State(state): State<AppState>,
    Json(req): Json<FundsRequest>,
) -> Result<Json<BankrollTransaction>, ApiError> {
    state
        .engine
        .deposit(&req.user_id, req.amount)
        .await
        .map(Json)
        .map_err(api_error)
}

/// POST /api/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    Json(req): Json<FundsRequest>,
) -> Result<Json<BankrollTransaction>, ApiError> {
    state
        .engine
        .withdraw(&req.user_id, req.amount)
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /api/recommend/:user_id?win_probability=0.58&odds=-110
pub async fn recommend(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<RecommendResponse>, ApiError> {
    state
        .engine
        .recommend_stake(&user_id, params.win_probability, params.odds)
        .await
        .map(|k| Json(k.into()))
        .map_err(api_error)
}

/// GET /api/bankroll/:user_id
pub async fn get_bankroll(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<BankrollStatus>, ApiError> {
    state
        .engine
        .store()
        .bankroll_status(&user_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /api/performance/:user_id
///
/// The "on read" trigger for the lazy streak recalculation: the stale
/// streak fields are rebuilt here (if flagged) before the aggregate is
/// returned.
pub async fn get_performance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PerformanceAggregate>, ApiError> {
    let store = state.engine.store();
    streaks::recalculate_if_needed(store, &user_id)
        .await
        .map_err(api_error)?;
    store
        .get_aggregate(&user_id)
        .await
        .map_err(api_error)?
        .ok_or_else(|| api_error(LedgerError::AccountNotFound(user_id)))
        .map(Json)
}

/// POST /api/bets
pub async fn place_bet(
    State(state): State<AppState>,
    Json(req): Json<BetRequest>,
) -> Result<Json<Bet>, ApiError> {
    state.engine.place_bet(req).await.map(Json).map_err(api_error)
}

/// GET /api/bets/:bet_id
pub async fn get_bet(
    State(state): State<AppState>,
    Path(bet_id): Path<String>,
) -> Result<Json<Bet>, ApiError> {
    state
        .engine
        .store()
        .get_bet(&bet_id)
        .await
        .map_err(api_error)?
        .ok_or_else(|| api_error(LedgerError::NotFound(bet_id)))
        .map(Json)
}

/// POST /api/settle — the manual settlement path.
pub async fn settle(
    State(state): State<AppState>,
    Json(req): Json<SettleRequest>,
) -> Result<Json<SettlementResult>, ApiError> {
    let outcome: BetOutcome = req.outcome.parse().map_err(api_error)?;
    state
        .engine
        .settle(&req.bet_id, outcome, req.actual_return, req.closing_odds)
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use rust_decimal_macros::dec;

    pub(crate) fn test_bankroll_config() -> BankrollConfig {
        BankrollConfig {
            default_starting_amount: dec!(1000),
            default_kelly_multiplier: 0.25,
            default_max_bet_pct: 0.05,
            default_min_edge: 0.02,
        }
    }

    #[test]
    fn test_error_status_mapping() {
        let (status, _) = api_error(LedgerError::NotFound("b1".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = api_error(LedgerError::AlreadySettled {
            bet_id: "b1".into(),
            status: crate::types::BetStatus::Win,
        });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = api_error(LedgerError::InvalidOdds(0));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = api_error(LedgerError::ConcurrentModification);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = api_error(LedgerError::Storage("boom".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.error.contains("boom"));
    }

    #[tokio::test]
    async fn test_get_bankroll_handler() {
        let store = Store::open_in_memory().await.unwrap();
        let engine = SettlementEngine::new(store);
        engine.open_account("u1", dec!(500)).await.unwrap();
        let state = Arc::new(ApiContext {
            engine,
            bankroll: test_bankroll_config(),
        });

        let Json(status) = get_bankroll(State(state), Path("u1".to_string()))
            .await
            .unwrap();
        assert_eq!(status.current_balance, dec!(500));
    }

    #[tokio::test]
    async fn test_create_account_applies_defaults_and_conflicts() {
        let store = Store::open_in_memory().await.unwrap();
        let engine = SettlementEngine::new(store);
        let state = Arc::new(ApiContext {
            engine,
            bankroll: test_bankroll_config(),
        });

        let Json(account) = create_account(
            State(state.clone()),
            Json(CreateAccountRequest {
                user_id: "u1".to_string(),
                starting_amount: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(account.starting_amount, dec!(1000));
        assert_eq!(account.kelly_multiplier, 0.25);

        let (status, _) = create_account(
            State(state),
            Json(CreateAccountRequest {
                user_id: "u1".to_string(),
                starting_amount: Some(dec!(50)),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_settle_handler_rejects_bad_outcome() {
        let store = Store::open_in_memory().await.unwrap();
        let engine = SettlementEngine::new(store);
        let state = Arc::new(ApiContext {
            engine,
            bankroll: test_bankroll_config(),
        });

        let result = settle(
            State(state),
            Json(SettleRequest {
                bet_id: "b1".to_string(),
                outcome: "cancelled".to_string(),
                actual_return: None,
                closing_odds: None,
            }),
        )
        .await;
        let (status, _) = result.err().unwrap();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
