//! Score-to-weight allocation under concentration and count limits.
//!
//! `propose` turns a scored candidate list into a long-only target portfolio:
//!
//! 1. Drop unusable candidates (empty symbol, non-finite score, duplicates).
//! 2. Rank by score descending, symbol ascending on ties.
//! 3. Keep the top `count_range.max` as the pool. Every pooled candidate
//!    ends up held, so the pool size is also the holding count.
//! 4. Weight the pool linearly in score and normalise to 1.
//! 5. Resolve symbol caps, then sector caps, redistributing freed weight to
//!    holdings that are still allowed to grow.
//! 6. Re-normalise so the weights sum to exactly 1.
//!
//! Every clip is recorded in the proposal's action log. The log is advisory;
//! it never feeds back into the weights.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::candidate::{Candidate, WeightedHolding};
use super::error::PortsimError;
use super::risk::RiskConfig;

/// Slack before a weight counts as over its cap.
const CAP_TOLERANCE: f64 = 1e-12;

/// The lowest pooled score maps to this raw weight when scores are not all positive.
const SCORE_FLOOR: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRule {
    Filtered,
    InsufficientCandidates,
    MaxWeightPerSymbol,
    MaxWeightPerSector,
    CapInfeasible,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    pub rule: ActionRule,
    /// Symbol or sector the rule acted on; empty when it applies to the whole portfolio.
    pub symbol: String,
    pub detail: String,
}

impl ActionLog {
    fn new(rule: ActionRule, symbol: impl Into<String>, detail: impl Into<String>) -> Self {
        ActionLog {
            rule,
            symbol: symbol.into(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    pub sector_dist: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub kept: Vec<WeightedHolding>,
    pub concentration: Concentration,
    pub actions: Vec<ActionLog>,
}

impl Proposal {
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.kept.iter().map(|h| h.weight).sum()
    }

    pub fn max_weight(&self) -> f64 {
        self.kept.iter().map(|h| h.weight).fold(0.0, f64::max)
    }
}

/// Allocate a target portfolio from scored candidates.
///
/// Fails only when `risk` is invalid. An empty or fully filtered candidate
/// list yields an empty proposal.
pub fn propose(candidates: &[Candidate], risk: &RiskConfig) -> Result<Proposal, PortsimError> {
    risk.validate()?;

    let mut actions = Vec::new();
    let mut ranked = filter_candidates(candidates, &mut actions);
    if ranked.is_empty() {
        return Ok(Proposal {
            actions,
            ..Proposal::default()
        });
    }

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let range = risk.count_range;
    if ranked.len() < range.min {
        warn!(
            available = ranked.len(),
            min_count = range.min,
            "fewer candidates than count_range min"
        );
        actions.push(ActionLog::new(
            ActionRule::InsufficientCandidates,
            "",
            format!(
                "{} candidates available, count_range min is {}",
                ranked.len(),
                range.min
            ),
        ));
    }

    let pool: Vec<&Candidate> = ranked.into_iter().take(range.max).collect();
    let mut weights = score_weights(&pool);
    resolve_caps(&mut weights, &pool, risk, &mut actions);

    if !renormalize(&mut weights) {
        return Ok(Proposal {
            actions,
            ..Proposal::default()
        });
    }

    let kept: Vec<WeightedHolding> = pool
        .iter()
        .zip(&weights)
        .map(|(c, w)| WeightedHolding {
            symbol: c.symbol.clone(),
            weight: *w,
            sector: c.sector.clone(),
        })
        .collect();

    let concentration = Concentration {
        sector_dist: sector_distribution(&kept),
    };

    Ok(Proposal {
        kept,
        concentration,
        actions,
    })
}

/// Aggregate weight per sector, with unclassified holdings in their own bucket.
pub fn sector_distribution(holdings: &[WeightedHolding]) -> BTreeMap<String, f64> {
    let mut dist = BTreeMap::new();
    for h in holdings {
        *dist.entry(h.sector_key().to_string()).or_insert(0.0) += h.weight;
    }
    dist
}

fn filter_candidates<'a>(
    candidates: &'a [Candidate],
    actions: &mut Vec<ActionLog>,
) -> Vec<&'a Candidate> {
    let mut order: Vec<&str> = Vec::new();
    let mut best: HashMap<&str, &Candidate> = HashMap::new();

    for c in candidates {
        if c.symbol.trim().is_empty() {
            actions.push(ActionLog::new(ActionRule::Filtered, "", "empty symbol"));
            continue;
        }
        if !c.score.is_finite() {
            actions.push(ActionLog::new(
                ActionRule::Filtered,
                c.symbol.as_str(),
                format!("non-finite score {}", c.score),
            ));
            continue;
        }
        match best.get(c.symbol.as_str()).copied() {
            Some(prev) if c.score <= prev.score => {
                actions.push(ActionLog::new(
                    ActionRule::Filtered,
                    c.symbol.as_str(),
                    format!("duplicate with score {} dropped", c.score),
                ));
            }
            Some(prev) => {
                actions.push(ActionLog::new(
                    ActionRule::Filtered,
                    c.symbol.as_str(),
                    format!("duplicate with score {} dropped", prev.score),
                ));
                best.insert(c.symbol.as_str(), c);
            }
            None => {
                order.push(c.symbol.as_str());
                best.insert(c.symbol.as_str(), c);
            }
        }
    }

    order.into_iter().filter_map(|s| best.get(s).copied()).collect()
}

/// Linear, monotone score transform normalised to 1.
///
/// Scores are used as-is when all are positive; otherwise they are shifted
/// so the lowest maps to `SCORE_FLOOR`. Every returned weight is strictly
/// positive: if the scores overflow, or a tiny score underflows to zero
/// once normalised, the pool falls back to equal weights.
fn score_weights(pool: &[&Candidate]) -> Vec<f64> {
    let min = pool.iter().map(|c| c.score).fold(f64::INFINITY, f64::min);
    let shift = if min > 0.0 { 0.0 } else { SCORE_FLOOR - min };

    let raw: Vec<f64> = pool.iter().map(|c| c.score + shift).collect();
    let total: f64 = raw.iter().sum();

    let weights: Vec<f64> = raw.iter().map(|r| r / total).collect();
    if total.is_finite() && total > 0.0 && weights.iter().all(|w| *w > 0.0) {
        weights
    } else {
        let equal = 1.0 / pool.len() as f64;
        vec![equal; pool.len()]
    }
}

/// Clip to the symbol and sector caps until neither is violated.
///
/// A clipped symbol, and every member of a clipped sector, is frozen: it
/// never receives redistributed weight again. Each violating round freezes
/// at least one new symbol or sector, so `holdings + sectors + 1` rounds
/// always reach the fixed point.
fn resolve_caps(
    weights: &mut [f64],
    pool: &[&Candidate],
    risk: &RiskConfig,
    actions: &mut Vec<ActionLog>,
) {
    let symbol_cap = risk.max_weight_per_symbol;
    let sector_cap = risk.max_weight_per_sector;

    let mut members: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, c) in pool.iter().enumerate() {
        members.entry(c.sector_key()).or_default().push(i);
    }

    let mut frozen = vec![false; weights.len()];
    let mut capped_sectors: BTreeSet<&str> = BTreeSet::new();
    let max_rounds = weights.len() + members.len() + 1;

    for _ in 0..max_rounds {
        let mut excess = 0.0;

        for (i, c) in pool.iter().enumerate() {
            if weights[i] > symbol_cap + CAP_TOLERANCE {
                let clipped = weights[i] - symbol_cap;
                debug!(symbol = %c.symbol, weight = weights[i], cap = symbol_cap, "symbol cap");
                actions.push(ActionLog::new(
                    ActionRule::MaxWeightPerSymbol,
                    c.symbol.as_str(),
                    format!("clipped {:.6} to {:.6}", weights[i], symbol_cap),
                ));
                weights[i] = symbol_cap;
                frozen[i] = true;
                excess += clipped;
            }
        }

        for (sector, idx) in &members {
            if capped_sectors.contains(sector) {
                continue;
            }
            let total: f64 = idx.iter().map(|&i| weights[i]).sum();
            if total > sector_cap + CAP_TOLERANCE {
                debug!(sector = %sector, weight = total, cap = sector_cap, "sector cap");
                actions.push(ActionLog::new(
                    ActionRule::MaxWeightPerSector,
                    *sector,
                    format!("scaled {:.6} to {:.6}", total, sector_cap),
                ));
                let scale = sector_cap / total;
                for &i in idx {
                    weights[i] *= scale;
                    frozen[i] = true;
                }
                capped_sectors.insert(*sector);
                excess += total - sector_cap;
            }
        }

        if excess <= CAP_TOLERANCE {
            return;
        }

        let receivable: f64 = weights
            .iter()
            .zip(&frozen)
            .filter(|(_, f)| !**f)
            .map(|(w, _)| *w)
            .sum();

        if receivable <= 0.0 {
            warn!(unallocated = excess, "caps cannot be met by available candidates");
            actions.push(ActionLog::new(
                ActionRule::CapInfeasible,
                "",
                format!(
                    "{:.6} weight unallocated with every holding at a cap; re-normalising",
                    excess
                ),
            ));
            return;
        }

        for (w, f) in weights.iter_mut().zip(&frozen) {
            if !*f {
                *w += excess * *w / receivable;
            }
        }
    }
}

/// Scale weights to sum to 1 and push residual float error into the largest.
///
/// Returns false when there is no positive weight to normalise.
fn renormalize(weights: &mut [f64]) -> bool {
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return false;
    }
    for w in weights.iter_mut() {
        *w /= total;
    }

    let residual = 1.0 - weights.iter().sum::<f64>();
    let largest = weights
        .iter()
        .enumerate()
        .fold(0, |best, (i, w)| if *w > weights[best] { i } else { best });
    weights[largest] += residual;
    true
}
