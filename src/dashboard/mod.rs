//! Dashboard — Axum JSON API over the engine's inbound operations.
//!
//! Exposes bankroll status, performance aggregates (with the lazy streak
//! recalculation on read), bet placement, and the manual settlement path.
//! CORS enabled for local development. Read-side UIs consume this API but
//! are out of scope here.

pub mod routes;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use routes::AppState;

/// Start the dashboard web server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_dashboard(state: AppState, port: u16) {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "Dashboard API starting on http://localhost:{port}");

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app).await {
                    error!(error = %e, "Dashboard server error");
                }
            }
            Err(e) => error!(error = %e, port, "Failed to bind dashboard port"),
        }
    });
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().expect("static origin"))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/accounts", post(routes::create_account))
        .route("/api/bankroll/:user_id", get(routes::get_bankroll))
        .route("/api/performance/:user_id", get(routes::get_performance))
        .route("/api/recommend/:user_id", get(routes::recommend))
        .route("/api/deposit", post(routes::deposit))
        .route("/api/withdraw", post(routes::withdraw))
        .route("/api/bets", post(routes::place_bet))
        .route("/api/bets/:bet_id", get(routes::get_bet))
        .route("/api/settle", post(routes::settle))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
