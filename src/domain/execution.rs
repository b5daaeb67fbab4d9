//! Order planning: the weight deltas that move a book onto its target.
//!
//! Orders are expressed in portfolio weight, not shares. Sizing into
//! quantities is the broker's concern and out of scope here.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::candidate::WeightedHolding;

/// Deltas at or below this magnitude are float residue, not trades.
pub const ORDER_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub symbol: String,
    pub side: Side,
    pub weight_delta: f64,
}

impl Order {
    /// Build an order whose side follows the sign of `weight_delta`.
    pub fn new(symbol: impl Into<String>, weight_delta: f64) -> Self {
        let side = if weight_delta > 0.0 { Side::Buy } else { Side::Sell };
        Order {
            symbol: symbol.into(),
            side,
            weight_delta,
        }
    }
}

/// Diff `current` against `target` into the minimal order list.
///
/// Symbols absent from a map are treated as weight 0. Orders come back
/// sorted by symbol.
pub fn plan_orders(current: &BTreeMap<String, f64>, target: &BTreeMap<String, f64>) -> Vec<Order> {
    let symbols: BTreeSet<&String> = current.keys().chain(target.keys()).collect();

    symbols
        .into_iter()
        .filter_map(|symbol| {
            let from = current.get(symbol).copied().unwrap_or(0.0);
            let to = target.get(symbol).copied().unwrap_or(0.0);
            let delta = to - from;
            (delta.abs() > ORDER_EPSILON).then(|| Order::new(symbol.clone(), delta))
        })
        .collect()
}

/// Collapse holdings into a symbol -> weight map.
pub fn target_weights(holdings: &[WeightedHolding]) -> BTreeMap<String, f64> {
    let mut weights = BTreeMap::new();
    for h in holdings {
        *weights.entry(h.symbol.clone()).or_insert(0.0) += h.weight;
    }
    weights
}

/// Sum of absolute weight changes.
pub fn turnover(orders: &[Order]) -> f64 {
    orders.iter().map(|o| o.weight_delta.abs()).sum()
}
