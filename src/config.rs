//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Runtime overrides (e.g. log format) come from the environment; see
//! `main.rs` for the `.env` hookup.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub bankroll: BankrollConfig,
    pub database: DatabaseConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub name: String,
    /// How often the batch settler scans pending bets.
    pub settlement_interval_secs: u64,
    /// Upper bound on waiting for the SQLite write lock before a
    /// settlement fails with `ConcurrentModification`.
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BankrollConfig {
    /// Starting (and initial current) amount for new accounts.
    pub default_starting_amount: Decimal,
    /// Default fractional Kelly multiplier for stake recommendations.
    pub default_kelly_multiplier: f64,
    /// Default maximum single bet as a fraction of bankroll.
    pub default_max_bet_pct: f64,
    /// Default minimum edge before a stake is recommended.
    pub default_min_edge: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }
}
