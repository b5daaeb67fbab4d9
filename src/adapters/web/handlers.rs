//! HTTP request handlers for the web adapter.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::allocator::{self, Proposal};
use crate::domain::backtest::{self, BacktestResult, Period, RebalanceCadence};
use crate::domain::candidate::Candidate;
use crate::domain::execution::Order;
use crate::domain::metrics::{drawdown_series, Metrics};
use crate::domain::risk::{CountRange, RiskConfig};
use crate::domain::simulator::{PaperSimulator, StepOutcome};

use super::{AppState, WebError, DEFAULT_SESSION};

/// Risk overrides in the dotted form used by the request payloads.
#[derive(Debug, Default, Deserialize)]
pub struct RiskParams {
    #[serde(rename = "risk.max_stock")]
    pub max_stock: Option<f64>,
    #[serde(rename = "risk.max_sector")]
    pub max_sector: Option<f64>,
    #[serde(rename = "risk.count_range")]
    pub count_range: Option<(usize, usize)>,
}

impl RiskParams {
    fn apply(&self, base: RiskConfig) -> RiskConfig {
        RiskConfig {
            max_weight_per_symbol: self.max_stock.unwrap_or(base.max_weight_per_symbol),
            max_weight_per_sector: self.max_sector.unwrap_or(base.max_weight_per_sector),
            count_range: self
                .count_range
                .map(|(min, max)| CountRange::new(min, max))
                .unwrap_or(base.count_range),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProposeRequest {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub params: RiskParams,
}

/// An order as submitted over HTTP; the side is derived from the delta.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub weight_delta: f64,
}

impl From<OrderRequest> for Order {
    fn from(o: OrderRequest) -> Self {
        Order::new(o.symbol, o.weight_delta)
    }
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub session_id: Option<String>,
    #[serde(default)]
    pub orders: Vec<OrderRequest>,
    #[serde(default)]
    pub rel_returns: HashMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub existed: bool,
}

#[derive(Debug, Deserialize)]
pub struct RunStep {
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub orders: Vec<OrderRequest>,
    #[serde(default)]
    pub rel_returns: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
pub struct SimRunRequest {
    pub steps: Vec<RunStep>,
    pub cost_rate: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SimRunResponse {
    pub dates: Vec<NaiveDate>,
    pub nav: Vec<f64>,
    pub drawdown: Vec<f64>,
    pub turnover: Vec<f64>,
    pub benchmark_nav: Vec<f64>,
    pub positions: BTreeMap<String, f64>,
    pub cash: f64,
    pub metrics: Metrics,
}

#[derive(Debug, Deserialize)]
pub struct BacktestRequest {
    pub periods: Vec<Period>,
    #[serde(default)]
    pub params: RiskParams,
    pub rebalance: Option<RebalanceCadence>,
    pub benchmark: Option<String>,
    pub cost_rate: Option<f64>,
    pub periods_per_year: Option<f64>,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn propose(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProposeRequest>,
) -> Result<Json<Proposal>, WebError> {
    let risk = req.params.apply(state.defaults.risk);
    let proposal = allocator::propose(&req.candidates, &risk)?;
    debug!(kept = proposal.kept.len(), actions = proposal.actions.len(), "propose");
    Ok(Json(proposal))
}

pub async fn sim_step(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StepRequest>,
) -> Result<Json<StepResponse>, WebError> {
    let session_id = req.session_id.unwrap_or_else(|| DEFAULT_SESSION.to_string());
    let orders: Vec<Order> = req.orders.into_iter().map(Order::from).collect();

    let mut sessions = state
        .sessions
        .lock()
        .map_err(|_| WebError::internal("session store poisoned"))?;
    let sim = match sessions.entry(session_id.clone()) {
        Entry::Occupied(e) => e.into_mut(),
        Entry::Vacant(e) => {
            info!(session = %session_id, "new paper session");
            e.insert(PaperSimulator::new(state.defaults.cost_rate)?)
        }
    };
    let outcome = sim.step(&orders, &req.rel_returns);

    Ok(Json(StepResponse {
        session_id,
        outcome,
    }))
}

pub async fn sim_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, WebError> {
    let session_id = req.session_id.unwrap_or_else(|| DEFAULT_SESSION.to_string());
    let existed = state
        .sessions
        .lock()
        .map_err(|_| WebError::internal("session store poisoned"))?
        .remove(&session_id)
        .is_some();
    Ok(Json(ResetResponse {
        session_id,
        existed,
    }))
}

pub async fn sim_run(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimRunRequest>,
) -> Result<Json<SimRunResponse>, WebError> {
    let dated = req.steps.iter().filter(|s| s.date.is_some()).count();
    if dated != 0 && dated != req.steps.len() {
        return Err(WebError::bad_request(format!(
            "{dated} of {} steps carry a date; date every step or none",
            req.steps.len()
        )));
    }

    let mut sim = PaperSimulator::new(req.cost_rate.unwrap_or(state.defaults.cost_rate))?;
    let mut dates = Vec::with_capacity(dated);
    let mut nav = Vec::with_capacity(req.steps.len());
    let mut turnover = Vec::with_capacity(req.steps.len());

    for step in req.steps {
        let orders: Vec<Order> = step.orders.into_iter().map(Order::from).collect();
        let outcome = sim.step(&orders, &step.rel_returns);
        dates.extend(step.date);
        nav.push(outcome.nav);
        turnover.push(outcome.turnover);
    }

    let cash = sim.state().cash;
    let metrics = Metrics::compute(&nav, &turnover, &[], cash, state.defaults.periods_per_year);
    Ok(Json(SimRunResponse {
        dates,
        drawdown: drawdown_series(&nav),
        nav,
        turnover,
        benchmark_nav: Vec::new(),
        positions: sim.positions().clone(),
        cash,
        metrics,
    }))
}

pub async fn backtest_run(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BacktestRequest>,
) -> Result<Json<BacktestResult>, WebError> {
    let defaults = &state.defaults;
    let config = backtest::BacktestConfig {
        risk: req.params.apply(defaults.risk),
        cost_rate: req.cost_rate.unwrap_or(defaults.cost_rate),
        rebalance: req.rebalance.unwrap_or(defaults.rebalance),
        benchmark: req.benchmark.or_else(|| defaults.benchmark.clone()),
        periods_per_year: req.periods_per_year.unwrap_or(defaults.periods_per_year),
    };
    let result = backtest::run_backtest(&req.periods, &config)?;
    Ok(Json(result))
}

pub async fn not_found() -> WebError {
    WebError::not_found("no such route")
}
