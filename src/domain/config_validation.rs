//! Configuration validation and construction.
//!
//! Every `validate_*` function returns the first violation it finds. The
//! `build_*` functions validate first, then turn the config into domain values.

use std::net::SocketAddr;

use crate::domain::backtest::{BacktestConfig, RebalanceCadence};
use crate::domain::error::PortsimError;
use crate::domain::metrics::DEFAULT_PERIODS_PER_YEAR;
use crate::domain::risk::RiskConfig;
use crate::domain::simulator::DEFAULT_COST_RATE;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
pub const DEFAULT_FIXED_SCORE: f64 = 50.0;

/// Score provider kinds recognised in `[scores] providers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Csv,
    Fixed,
}

impl ProviderKind {
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(ProviderKind::Csv),
            "fixed" => Some(ProviderKind::Fixed),
            _ => None,
        }
    }
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    let defaults = RiskConfig::default();
    let symbol_cap = read_double(config, "risk", "max_weight_per_symbol", defaults.max_weight_per_symbol)?;
    check_cap("max_weight_per_symbol", symbol_cap)?;
    let sector_cap = read_double(config, "risk", "max_weight_per_sector", defaults.max_weight_per_sector)?;
    check_cap("max_weight_per_sector", sector_cap)?;

    let min = read_int(config, "risk", "min_count", defaults.count_range.min as i64)?;
    if min < 1 {
        return Err(invalid("risk", "min_count", "min_count must be at least 1"));
    }
    let max = read_int(config, "risk", "max_count", defaults.count_range.max as i64)?;
    if max < min {
        return Err(invalid("risk", "max_count", "max_count must be >= min_count"));
    }
    if (max as f64) * symbol_cap < 1.0 - 1e-9 {
        return Err(invalid(
            "risk",
            "max_count",
            &format!("max_count x max_weight_per_symbol must reach 1.0, got {}", max as f64 * symbol_cap),
        ));
    }
    Ok(())
}

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    let cost_rate = read_double(config, "simulation", "cost_rate", DEFAULT_COST_RATE)?;
    if cost_rate < 0.0 {
        return Err(invalid("simulation", "cost_rate", "cost_rate must be non-negative"));
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    require_non_empty(config, "backtest", "returns_path")?;

    if let Some(value) = config.get_string("backtest", "rebalance") {
        value
            .parse::<RebalanceCadence>()
            .map_err(|reason| invalid("backtest", "rebalance", &reason))?;
    }

    if let Some(value) = config.get_string("backtest", "benchmark") {
        if value.trim().is_empty() {
            return Err(invalid("backtest", "benchmark", "benchmark must name a symbol when set"));
        }
    }

    let ppy = read_double(config, "backtest", "periods_per_year", DEFAULT_PERIODS_PER_YEAR)?;
    if ppy <= 0.0 {
        return Err(invalid("backtest", "periods_per_year", "periods_per_year must be positive"));
    }
    Ok(())
}

pub fn validate_score_config(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    let kinds = provider_kinds(config)?;

    if kinds.contains(&ProviderKind::Csv) {
        require_non_empty(config, "scores", "csv_path")?;
    }
    if kinds.contains(&ProviderKind::Fixed) {
        let raw = require_non_empty(config, "scores", "fixed_symbols")?;
        parse_fixed_symbols(&raw).map_err(|reason| invalid("scores", "fixed_symbols", &reason))?;
        read_double(config, "scores", "fixed_score", DEFAULT_FIXED_SCORE)?;
    }
    Ok(())
}

pub fn validate_web_config(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    listen_addr(config).map(|_| ())
}

/// Risk, simulation, backtest and score sections together.
pub fn validate_all(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    validate_risk_config(config)?;
    validate_simulation_config(config)?;
    validate_backtest_config(config)?;
    validate_score_config(config)?;
    validate_web_config(config)?;
    Ok(())
}

pub fn build_risk_config(config: &dyn ConfigPort) -> Result<RiskConfig, PortsimError> {
    validate_risk_config(config)?;
    let defaults = RiskConfig::default();
    Ok(RiskConfig::new(
        read_double(config, "risk", "max_weight_per_symbol", defaults.max_weight_per_symbol)?,
        read_double(config, "risk", "max_weight_per_sector", defaults.max_weight_per_sector)?,
        read_int(config, "risk", "min_count", defaults.count_range.min as i64)? as usize,
        read_int(config, "risk", "max_count", defaults.count_range.max as i64)? as usize,
    ))
}

pub fn build_cost_rate(config: &dyn ConfigPort) -> Result<f64, PortsimError> {
    validate_simulation_config(config)?;
    read_double(config, "simulation", "cost_rate", DEFAULT_COST_RATE)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, PortsimError> {
    validate_backtest_config(config)?;
    let rebalance = match config.get_string("backtest", "rebalance") {
        Some(value) => value
            .parse::<RebalanceCadence>()
            .map_err(|reason| invalid("backtest", "rebalance", &reason))?,
        None => RebalanceCadence::default(),
    };

    Ok(BacktestConfig {
        risk: build_risk_config(config)?,
        cost_rate: build_cost_rate(config)?,
        rebalance,
        benchmark: config
            .get_string("backtest", "benchmark")
            .map(|b| b.trim().to_string()),
        periods_per_year: read_double(config, "backtest", "periods_per_year", DEFAULT_PERIODS_PER_YEAR)?,
    })
}

/// The configured provider kinds, in order.
pub fn provider_kinds(config: &dyn ConfigPort) -> Result<Vec<ProviderKind>, PortsimError> {
    let raw = require_non_empty(config, "scores", "providers")?;
    raw.split(',')
        .map(|name| {
            ProviderKind::parse(name).ok_or_else(|| {
                invalid("scores", "providers", &format!("unknown provider '{}'", name.trim()))
            })
        })
        .collect()
}

/// Parse `SYM[:SECTOR],...` into (symbol, sector) pairs.
pub fn parse_fixed_symbols(raw: &str) -> Result<Vec<(String, Option<String>)>, String> {
    let mut out = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (symbol, sector) = match entry.split_once(':') {
            Some((s, sec)) => (s.trim(), Some(sec.trim()).filter(|sec| !sec.is_empty())),
            None => (entry, None),
        };
        if symbol.is_empty() {
            return Err(format!("entry '{entry}' has no symbol"));
        }
        out.push((symbol.to_string(), sector.map(str::to_string)));
    }
    if out.is_empty() {
        return Err("no symbols listed".to_string());
    }
    Ok(out)
}

pub fn listen_addr(config: &dyn ConfigPort) -> Result<SocketAddr, PortsimError> {
    let raw = config
        .get_string("web", "listen")
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    raw.trim()
        .parse()
        .map_err(|_| invalid("web", "listen", &format!("'{raw}' is not a socket address")))
}

/// Read a float, rejecting values that are present but unparseable or non-finite.
pub fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, PortsimError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(invalid(section, key, &format!("'{raw}' is not a finite number"))),
        },
    }
}

fn read_int(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, PortsimError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(section, key, &format!("'{raw}' is not an integer"))),
    }
}

fn require_non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, PortsimError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(PortsimError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn check_cap(key: &str, value: f64) -> Result<(), PortsimError> {
    if value <= 0.0 || value > 1.0 {
        return Err(invalid("risk", key, &format!("{key} must be in (0, 1]")));
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> PortsimError {
    PortsimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
