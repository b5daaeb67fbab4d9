//! Scored candidates and weighted holdings.

use serde::{Deserialize, Serialize};

/// Sector bucket for candidates that arrive without one.
pub const UNCLASSIFIED_SECTOR: &str = "UNCLASSIFIED";

/// A security proposed for the portfolio, as scored by an upstream provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

impl Candidate {
    pub fn new(symbol: impl Into<String>, score: f64) -> Self {
        Candidate {
            symbol: symbol.into(),
            score,
            sector: None,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// The sector used for concentration limits.
    pub fn sector_key(&self) -> &str {
        sector_key(self.sector.as_deref())
    }
}

/// One line of a target portfolio. Weights are long-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedHolding {
    pub symbol: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

impl WeightedHolding {
    pub fn sector_key(&self) -> &str {
        sector_key(self.sector.as_deref())
    }
}

fn sector_key(sector: Option<&str>) -> &str {
    match sector {
        Some(s) if !s.trim().is_empty() => s,
        _ => UNCLASSIFIED_SECTOR,
    }
}
