//! HTTP adapter: JSON routes over the allocator, simulator and backtest driver.
//!
//! Paper-trading sessions live in a mutex-guarded map keyed by session id.
//! The lock is held for the whole of one `step`, so steps on a session are
//! serialised while different requests for other routes run freely.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::PortsimError;
use crate::domain::simulator::PaperSimulator;

pub const DEFAULT_SESSION: &str = "default";

pub struct AppState {
    /// Defaults for requests that leave risk or backtest parameters out.
    pub defaults: BacktestConfig,
    pub sessions: Mutex<HashMap<String, PaperSimulator>>,
}

impl AppState {
    pub fn new(defaults: BacktestConfig) -> Result<Self, PortsimError> {
        defaults.validate()?;
        PaperSimulator::new(defaults.cost_rate)?;
        Ok(Self {
            defaults,
            sessions: Mutex::new(HashMap::new()),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/propose", post(handlers::propose))
        .route("/sim/step", post(handlers::sim_step))
        .route("/sim/reset", post(handlers::sim_reset))
        .route("/sim/run", post(handlers::sim_run))
        .route("/backtest/run", post(handlers::backtest_run))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), PortsimError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
