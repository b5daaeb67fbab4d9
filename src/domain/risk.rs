//! Risk configuration for a single allocation call.

use serde::{Deserialize, Serialize};

use super::error::PortsimError;

/// Inclusive bounds on the number of holdings in a target portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub fn new(min: usize, max: usize) -> Self {
        CountRange { min, max }
    }

    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && count <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub max_weight_per_symbol: f64,
    pub max_weight_per_sector: f64,
    pub count_range: CountRange,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_weight_per_symbol: 0.2,
            max_weight_per_sector: 0.4,
            count_range: CountRange::new(5, 10),
        }
    }
}

impl RiskConfig {
    pub fn new(max_weight_per_symbol: f64, max_weight_per_sector: f64, min: usize, max: usize) -> Self {
        RiskConfig {
            max_weight_per_symbol,
            max_weight_per_sector,
            count_range: CountRange::new(min, max),
        }
    }

    /// Rejects configurations no allocation could honour.
    ///
    /// Caps must lie in (0, 1], the count range must be non-empty with a
    /// positive floor, and `max_count` holdings at the symbol cap must be
    /// able to reach a fully invested portfolio.
    ///
    /// Only the configuration is judged here. A valid config that meets too
    /// few candidates to stay under its caps is not an error: `propose`
    /// re-normalises and logs `cap_infeasible` instead.
    pub fn validate(&self) -> Result<(), PortsimError> {
        check_cap("max_weight_per_symbol", self.max_weight_per_symbol)?;
        check_cap("max_weight_per_sector", self.max_weight_per_sector)?;

        let CountRange { min, max } = self.count_range;
        if min == 0 {
            return Err(PortsimError::configuration(
                "count_range min must be at least 1",
            ));
        }
        if min > max {
            return Err(PortsimError::configuration(format!(
                "count_range min ({min}) exceeds max ({max})"
            )));
        }

        let reachable = max as f64 * self.max_weight_per_symbol;
        if reachable < 1.0 - 1e-9 {
            return Err(PortsimError::configuration(format!(
                "max_count ({max}) x max_weight_per_symbol ({}) cannot reach a fully invested portfolio",
                self.max_weight_per_symbol
            )));
        }
        Ok(())
    }
}

fn check_cap(name: &str, value: f64) -> Result<(), PortsimError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(PortsimError::configuration(format!(
            "{name} must be in (0, 1], got {value}"
        )));
    }
    Ok(())
}
