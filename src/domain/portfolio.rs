//! Paper account state: cost ledger, weight positions and NAV.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::execution::Order;

/// Positions smaller than this are pruned after every fill.
pub const POSITION_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    /// Starts at 1.0 and only ever absorbs transaction cost.
    pub cash: f64,
    pub positions: BTreeMap<String, f64>,
    pub nav: f64,
}

impl Default for SimState {
    fn default() -> Self {
        SimState::new()
    }
}

impl SimState {
    pub fn new() -> Self {
        SimState {
            cash: 1.0,
            positions: BTreeMap::new(),
            nav: 1.0,
        }
    }

    pub fn position(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn apply_order(&mut self, order: &Order) {
        let weight = self.positions.entry(order.symbol.clone()).or_insert(0.0);
        *weight += order.weight_delta;
        if weight.abs() < POSITION_EPSILON {
            self.positions.remove(&order.symbol);
        }
    }

    pub fn charge(&mut self, cost: f64) {
        self.cash -= cost;
    }
}
