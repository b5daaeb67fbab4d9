//! Performance metrics over a NAV series.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    /// Most negative point of the drawdown series; 0.0 when NAV never fell.
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub win_rate: f64,
    /// Mean per-period turnover.
    pub turnover: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark_return: Option<f64>,
    /// Cumulative transaction cost as a fraction of starting capital.
    pub total_cost: f64,
    pub periods: usize,
}

impl Metrics {
    /// Summarise a run. `benchmark_nav` may be empty.
    pub fn compute(
        nav: &[f64],
        turnover: &[f64],
        benchmark_nav: &[f64],
        cash: f64,
        periods_per_year: f64,
    ) -> Self {
        let periods = nav.len();
        let final_nav = nav.last().copied().unwrap_or(1.0);
        let total_return = final_nav - 1.0;

        let annualized_return = if periods > 0 && final_nav > 0.0 && periods_per_year > 0.0 {
            final_nav.powf(periods_per_year / periods as f64) - 1.0
        } else {
            0.0
        };

        let max_drawdown = drawdown_series(nav).into_iter().fold(0.0_f64, f64::min);

        let returns = period_returns(nav);
        let sharpe = compute_sharpe(&returns, periods_per_year);

        let win_rate = if returns.is_empty() {
            0.0
        } else {
            returns.iter().filter(|&&r| r > 0.0).count() as f64 / returns.len() as f64
        };

        let mean_turnover = if turnover.is_empty() {
            0.0
        } else {
            turnover.iter().sum::<f64>() / turnover.len() as f64
        };

        let benchmark_return = benchmark_nav.last().map(|b| b - 1.0);

        Metrics {
            total_return: finite_or_zero(total_return),
            annualized_return: finite_or_zero(annualized_return),
            max_drawdown,
            sharpe,
            win_rate,
            turnover: finite_or_zero(mean_turnover),
            benchmark_return: benchmark_return.map(finite_or_zero),
            total_cost: finite_or_zero(1.0 - cash),
            periods,
        }
    }
}

/// `nav / running_max(nav) - 1` per point. Never positive; 0.0 at each new peak.
pub fn drawdown_series(nav: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    nav.iter()
        .map(|&value| {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 {
                (value / peak - 1.0).min(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Simple returns per period. The value before the first period is 1.0.
pub fn period_returns(nav: &[f64]) -> Vec<f64> {
    let mut prev = 1.0;
    nav.iter()
        .map(|&value| {
            let r = if prev > 0.0 { value / prev - 1.0 } else { 0.0 };
            prev = value;
            r
        })
        .collect()
}

fn compute_sharpe(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 && stddev.is_finite() {
        finite_or_zero(mean / stddev * periods_per_year.sqrt())
    } else {
        0.0
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn empty_run() {
        let m = Metrics::compute(&[], &[], &[], 1.0, 252.0);
        assert_eq!(m.periods, 0);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.annualized_return, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.sharpe, 0.0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.turnover, 0.0);
        assert_eq!(m.benchmark_return, None);
    }

    #[test]
    fn total_return_and_cost() {
        let m = Metrics::compute(&[1.05, 1.10], &[1.0, 0.0], &[], 0.999, 252.0);
        assert_abs_diff_eq!(m.total_return, 0.10, epsilon = 1e-12);
        assert_abs_diff_eq!(m.total_cost, 0.001, epsilon = 1e-12);
        assert_abs_diff_eq!(m.turnover, 0.5, epsilon = 1e-12);
        assert_eq!(m.periods, 2);
    }

    #[test]
    fn annualized_over_one_year_equals_total() {
        let mut nav = vec![1.0; 251];
        nav.push(1.2);
        let m = Metrics::compute(&nav, &[], &[], 1.0, 252.0);
        assert_abs_diff_eq!(m.annualized_return, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn annualized_over_half_year_compounds() {
        let nav = vec![1.1; 126];
        let m = Metrics::compute(&nav, &[], &[], 1.0, 252.0);
        assert_abs_diff_eq!(m.annualized_return, 1.1_f64.powi(2) - 1.0, epsilon = 1e-9);
    }

    #[test]
    fn drawdown_series_example() {
        let dd = drawdown_series(&[1.0, 1.1, 0.99, 1.045, 1.2]);
        assert_abs_diff_eq!(dd[0], 0.0);
        assert_abs_diff_eq!(dd[1], 0.0);
        assert_abs_diff_eq!(dd[2], -0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(dd[3], -0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(dd[4], 0.0);
    }

    #[test]
    fn max_drawdown_is_min_of_series() {
        let nav = [1.0, 1.1, 0.9, 0.95, 0.8, 1.0];
        let m = Metrics::compute(&nav, &[], &[], 1.0, 252.0);
        assert_abs_diff_eq!(m.max_drawdown, 0.8 / 1.1 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn period_returns_start_from_one() {
        let r = period_returns(&[1.01, 1.0302]);
        assert_abs_diff_eq!(r[0], 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(r[1], 0.02, epsilon = 1e-12);
    }

    #[test]
    fn win_rate_counts_positive_periods() {
        let m = Metrics::compute(&[1.01, 1.0, 1.02, 1.02], &[], &[], 1.0, 252.0);
        assert_abs_diff_eq!(m.win_rate, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn sharpe_zero_for_flat_series() {
        let m = Metrics::compute(&[1.0, 1.0, 1.0], &[], &[], 1.0, 252.0);
        assert_eq!(m.sharpe, 0.0);
    }

    #[test]
    fn sharpe_uses_population_stddev() {
        // returns 0.02 and 0.0: mean 0.01, population stddev 0.01.
        let m = Metrics::compute(&[1.02, 1.02], &[], &[], 1.0, 252.0);
        assert_abs_diff_eq!(m.sharpe, 252.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn benchmark_return_from_last_point() {
        let m = Metrics::compute(&[1.0], &[], &[0.97], 1.0, 252.0);
        assert_abs_diff_eq!(m.benchmark_return.unwrap(), -0.03, epsilon = 1e-12);
    }

    #[test]
    fn benchmark_omitted_from_json_when_absent() {
        let m = Metrics::compute(&[1.0], &[], &[], 1.0, 252.0);
        let json = serde_json::to_string(&m).unwrap();
        assert!(!json.contains("benchmark_return"));
    }
}
