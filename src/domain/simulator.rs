//! Single-session paper simulator.
//!
//! Each `step` fills the period's orders at the start of the period, charges
//! linear transaction cost against the cash ledger, then compounds NAV by the
//! post-trade weights. There is no settlement lag; callers wanting T+1
//! behaviour shift `rel_returns` by one period themselves.
//!
//! A `PaperSimulator` owns its state and takes `&mut self` to step, so sharing
//! one across threads needs an external lock.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::PortsimError;
use super::execution::Order;
use super::portfolio::SimState;

pub const DEFAULT_COST_RATE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub nav: f64,
    pub turnover: f64,
    pub positions: BTreeMap<String, f64>,
    pub cash: f64,
    /// Held symbols with no usable return this period; they were treated as flat.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_gaps: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PaperSimulator {
    state: SimState,
    cost_rate: f64,
}

impl PaperSimulator {
    pub fn new(cost_rate: f64) -> Result<Self, PortsimError> {
        if !cost_rate.is_finite() || cost_rate < 0.0 {
            return Err(PortsimError::configuration(format!(
                "cost_rate must be a non-negative number, got {cost_rate}"
            )));
        }
        Ok(PaperSimulator {
            state: SimState::new(),
            cost_rate,
        })
    }

    pub fn cost_rate(&self) -> f64 {
        self.cost_rate
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn positions(&self) -> &BTreeMap<String, f64> {
        &self.state.positions
    }

    pub fn nav(&self) -> f64 {
        self.state.nav
    }

    pub fn reset(&mut self) {
        self.state = SimState::new();
    }

    /// Advance one period.
    pub fn step(&mut self, orders: &[Order], rel_returns: &HashMap<String, f64>) -> StepOutcome {
        let mut turnover = 0.0;
        for order in orders {
            if !order.weight_delta.is_finite() {
                warn!(symbol = %order.symbol, delta = order.weight_delta, "skipping non-finite order");
                continue;
            }
            turnover += order.weight_delta.abs();
        }

        self.state.charge(turnover * self.cost_rate);

        for order in orders.iter().filter(|o| o.weight_delta.is_finite()) {
            self.state.apply_order(order);
        }

        let mut data_gaps = Vec::new();
        let mut period_return = 0.0;
        for (symbol, weight) in &self.state.positions {
            match rel_returns.get(symbol) {
                Some(r) if r.is_finite() => period_return += weight * r,
                _ => {
                    warn!(symbol = %symbol, "no return for held position, treating as flat");
                    data_gaps.push(symbol.clone());
                }
            }
        }

        self.state.nav *= 1.0 + period_return;

        StepOutcome {
            nav: self.state.nav,
            turnover,
            positions: self.state.positions.clone(),
            cash: self.state.cash,
            data_gaps,
        }
    }
}
