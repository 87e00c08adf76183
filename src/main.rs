//! TALLY — Bet Settlement and Bankroll Ledger Engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the ledger store, and runs the batch settlement loop (with the
//! streak sweep riding the same interval) until shutdown.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use tally::config::AppConfig;
use tally::dashboard::{self, routes::ApiContext};
use tally::engine::{streaks, BatchSettler, SettlementEngine};
use tally::results::StoredResultFeed;
use tally::store::Store;

const BANNER: &str = r#"
 _____  _    _     _  __   __
|_   _|/ \  | |   | | \ \ / /
  | | / _ \ | |   | |  \ V /
  | |/ ___ \| |___| |___| |
  |_/_/   \_\_____|_____|_|

  Bet Settlement & Bankroll Ledger Engine
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        engine = %cfg.engine.name,
        interval_secs = cfg.engine.settlement_interval_secs,
        database = %cfg.database.path,
        "TALLY starting up"
    );

    // -- Open the store and wire the engine -------------------------------

    let store = Store::open(
        &cfg.database.path,
        Duration::from_millis(cfg.engine.lock_timeout_ms),
    )
    .await?;
    let engine = SettlementEngine::new(store.clone());
    let feed = Arc::new(StoredResultFeed::new(store.clone()));
    let settler = BatchSettler::new(engine.clone(), feed);

    if cfg.dashboard.enabled {
        let state = Arc::new(ApiContext {
            engine: engine.clone(),
            bankroll: cfg.bankroll.clone(),
        });
        dashboard::spawn_dashboard(state, cfg.dashboard.port);
    }

    // -- Main loop ---------------------------------------------------------

    let mut interval =
        tokio::time::interval(Duration::from_secs(cfg.engine.settlement_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.engine.settlement_interval_secs,
        "Entering settlement loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match settler.run_once().await {
                    Ok(report) => {
                        if report.scanned > 0 {
                            info!(report = %report, "Settlement pass complete");
                        }
                        for failure in &report.failed {
                            error!(
                                bet_id = %failure.bet_id,
                                reason = %failure.reason,
                                "Bet failed to settle"
                            );
                        }
                    }
                    Err(e) => error!(error = %e, "Settlement pass failed — continuing"),
                }

                if let Err(e) = streaks::sweep(&store).await {
                    error!(error = %e, "Streak sweep failed");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("TALLY shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tally=info"));

    let json_logging = std::env::var("TALLY_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
