//! Backtest driver.
//!
//! Walks a date-ordered sequence of periods. On rebalance periods it runs the
//! allocator on that period's candidates, diffs the result against the
//! simulator's current book and trades the difference. A rebalance that
//! yields an empty proposal holds the book, as do non-rebalance periods. An optional benchmark symbol is held at
//! full weight on a second simulator with the same cost rate.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::allocator::propose;
use super::candidate::Candidate;
use super::error::PortsimError;
use super::execution::{plan_orders, target_weights, Order};
use super::metrics::{drawdown_series, Metrics, DEFAULT_PERIODS_PER_YEAR};
use super::risk::RiskConfig;
use super::simulator::{PaperSimulator, DEFAULT_COST_RATE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RebalanceCadence {
    Daily,
    /// When the ISO week changes from the previous period.
    #[default]
    Weekly,
    /// When the calendar month changes from the previous period.
    Monthly,
    /// Every n-th period, counting from the first.
    EveryN(usize),
}

impl RebalanceCadence {
    /// Whether period `index` (dated `date`, following `prev`) rebalances.
    /// The first period always does.
    pub fn is_rebalance(&self, index: usize, prev: Option<NaiveDate>, date: NaiveDate) -> bool {
        let Some(prev) = prev else {
            return true;
        };
        match self {
            RebalanceCadence::Daily => true,
            RebalanceCadence::Weekly => prev.iso_week() != date.iso_week(),
            RebalanceCadence::Monthly => (prev.year(), prev.month()) != (date.year(), date.month()),
            RebalanceCadence::EveryN(n) => *n > 0 && index % n == 0,
        }
    }
}

impl FromStr for RebalanceCadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "daily" => Ok(RebalanceCadence::Daily),
            "weekly" => Ok(RebalanceCadence::Weekly),
            "monthly" => Ok(RebalanceCadence::Monthly),
            other => {
                let n = other
                    .strip_prefix("every:")
                    .ok_or_else(|| format!("unknown rebalance cadence '{other}'"))?;
                match n.trim().parse::<usize>() {
                    Ok(n) if n > 0 => Ok(RebalanceCadence::EveryN(n)),
                    _ => Err(format!("'every:' needs a positive period count, got '{n}'")),
                }
            }
        }
    }
}

impl fmt::Display for RebalanceCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebalanceCadence::Daily => write!(f, "daily"),
            RebalanceCadence::Weekly => write!(f, "weekly"),
            RebalanceCadence::Monthly => write!(f, "monthly"),
            RebalanceCadence::EveryN(n) => write!(f, "every:{n}"),
        }
    }
}

impl TryFrom<String> for RebalanceCadence {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RebalanceCadence> for String {
    fn from(c: RebalanceCadence) -> Self {
        c.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub risk: RiskConfig,
    pub cost_rate: f64,
    pub rebalance: RebalanceCadence,
    pub benchmark: Option<String>,
    pub periods_per_year: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            risk: RiskConfig::default(),
            cost_rate: DEFAULT_COST_RATE,
            rebalance: RebalanceCadence::default(),
            benchmark: None,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), PortsimError> {
        self.risk.validate()?;
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(PortsimError::configuration(format!(
                "periods_per_year must be positive, got {}",
                self.periods_per_year
            )));
        }
        if let RebalanceCadence::EveryN(0) = self.rebalance {
            return Err(PortsimError::configuration("rebalance every:0 is not allowed"));
        }
        if matches!(&self.benchmark, Some(b) if b.trim().is_empty()) {
            return Err(PortsimError::configuration("benchmark symbol is empty"));
        }
        Ok(())
    }
}

/// One period of input: the scores known at `date` and the returns realised over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub date: NaiveDate,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub rel_returns: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub dates: Vec<NaiveDate>,
    pub nav: Vec<f64>,
    pub drawdown: Vec<f64>,
    pub benchmark_nav: Vec<f64>,
    pub turnover: Vec<f64>,
    pub rebalance_dates: Vec<NaiveDate>,
    pub positions: BTreeMap<String, f64>,
    pub metrics: Metrics,
}

pub fn run_backtest(periods: &[Period], config: &BacktestConfig) -> Result<BacktestResult, PortsimError> {
    config.validate()?;

    let mut sim = PaperSimulator::new(config.cost_rate)?;
    let mut bench_sim = match &config.benchmark {
        Some(symbol) => Some((symbol.as_str(), PaperSimulator::new(config.cost_rate)?)),
        None => None,
    };

    let n = periods.len();
    let mut dates = Vec::with_capacity(n);
    let mut nav = Vec::with_capacity(n);
    let mut turnover = Vec::with_capacity(n);
    let mut benchmark_nav = Vec::new();
    let mut rebalance_dates = Vec::new();
    let mut prev_date: Option<NaiveDate> = None;

    for (index, period) in periods.iter().enumerate() {
        if let Some(prev) = prev_date {
            if period.date <= prev {
                return Err(PortsimError::data(format!(
                    "periods out of order: {} follows {}",
                    period.date, prev
                )));
            }
        }

        let mut orders = Vec::new();
        if config.rebalance.is_rebalance(index, prev_date, period.date) {
            let proposal = propose(&period.candidates, &config.risk)?;
            if proposal.is_empty() {
                debug!(
                    date = %period.date,
                    candidates = period.candidates.len(),
                    "no usable candidates on rebalance date, holding"
                );
            } else {
                let target = target_weights(&proposal.kept);
                orders = plan_orders(sim.positions(), &target);
                rebalance_dates.push(period.date);
                debug!(
                    date = %period.date,
                    holdings = proposal.kept.len(),
                    orders = orders.len(),
                    actions = proposal.actions.len(),
                    "rebalanced"
                );
            }
        }

        let outcome = sim.step(&orders, &period.rel_returns);
        dates.push(period.date);
        nav.push(outcome.nav);
        turnover.push(outcome.turnover);

        if let Some((symbol, bench)) = bench_sim.as_mut() {
            let bench_orders = if index == 0 {
                vec![Order::new(*symbol, 1.0)]
            } else {
                Vec::new()
            };
            benchmark_nav.push(bench.step(&bench_orders, &period.rel_returns).nav);
        }

        prev_date = Some(period.date);
    }

    let drawdown = drawdown_series(&nav);
    let metrics = Metrics::compute(
        &nav,
        &turnover,
        &benchmark_nav,
        sim.state().cash,
        config.periods_per_year,
    );

    info!(
        periods = metrics.periods,
        rebalances = rebalance_dates.len(),
        total_return = metrics.total_return,
        max_drawdown = metrics.max_drawdown,
        "backtest complete"
    );

    Ok(BacktestResult {
        dates,
        nav,
        drawdown,
        benchmark_nav,
        turnover,
        rebalance_dates,
        positions: sim.positions().clone(),
        metrics,
    })
}
