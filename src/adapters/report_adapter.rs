//! Backtest report writers.
//!
//! `.csv` output paths get the per-date series; any other extension gets the
//! full result as pretty JSON, with a compounded monthly return table.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Datelike;
use serde::Serialize;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::PortsimError;
use crate::domain::metrics::period_returns;
use crate::ports::report_port::ReportPort;

/// Compounded return for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    pub value: f64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    result: &'a BacktestResult,
    monthly_returns: Vec<MonthlyReturn>,
}

pub fn compute_monthly_returns(result: &BacktestResult) -> Vec<MonthlyReturn> {
    let mut growth: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for (date, r) in result.dates.iter().zip(period_returns(&result.nav)) {
        *growth.entry((date.year(), date.month())).or_insert(1.0) *= 1.0 + r;
    }
    growth
        .into_iter()
        .map(|((year, month), g)| MonthlyReturn {
            year,
            month,
            value: g - 1.0,
        })
        .collect()
}

pub fn render_csv(result: &BacktestResult) -> Result<String, PortsimError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    let has_benchmark = !result.benchmark_nav.is_empty();

    let mut header = vec!["date", "nav", "drawdown", "turnover", "rebalance"];
    if has_benchmark {
        header.push("benchmark_nav");
    }
    wtr.write_record(&header).map_err(csv_error)?;

    for (i, date) in result.dates.iter().enumerate() {
        let rebalanced = result.rebalance_dates.binary_search(date).is_ok();
        let mut row = vec![
            date.to_string(),
            result.nav[i].to_string(),
            result.drawdown[i].to_string(),
            result.turnover[i].to_string(),
            u8::from(rebalanced).to_string(),
        ];
        if has_benchmark {
            row.push(result.benchmark_nav[i].to_string());
        }
        wtr.write_record(&row).map_err(csv_error)?;
    }

    let bytes = wtr.into_inner().map_err(|e| PortsimError::data(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PortsimError::data(e.to_string()))
}

pub fn render_json(result: &BacktestResult) -> Result<String, PortsimError> {
    let report = JsonReport {
        result,
        monthly_returns: compute_monthly_returns(result),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn csv_error(e: csv::Error) -> PortsimError {
    PortsimError::data(format!("CSV write error: {e}"))
}

/// Picks the format from the output path's extension.
pub struct FileReportAdapter;

impl ReportPort for FileReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), PortsimError> {
        let path = Path::new(output_path);
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        let body = if is_csv {
            render_csv(result)?
        } else {
            render_json(result)?
        };
        fs::write(path, body)?;
        info!(path = %path.display(), format = if is_csv { "csv" } else { "json" }, "report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::{drawdown_series, Metrics};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_result(with_benchmark: bool) -> BacktestResult {
        let dates = vec![
            NaiveDate::from_ymd_opt(2024, 1, 30).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        ];
        let nav = vec![1.01, 0.99, 1.02];
        let benchmark_nav = if with_benchmark { vec![1.0, 1.01, 1.02] } else { vec![] };
        BacktestResult {
            drawdown: drawdown_series(&nav),
            metrics: Metrics::compute(&nav, &[1.0, 0.0, 0.2], &benchmark_nav, 0.999, 252.0),
            rebalance_dates: vec![dates[0], dates[2]],
            dates,
            nav,
            benchmark_nav,
            turnover: vec![1.0, 0.0, 0.2],
            positions: [("AAPL".to_string(), 1.0)].into_iter().collect(),
        }
    }

    #[test]
    fn monthly_returns_compound_within_month() {
        let months = compute_monthly_returns(&sample_result(false));
        assert_eq!(months.len(), 2);
        assert_eq!((months[0].year, months[0].month), (2024, 1));
        assert!((months[0].value - (0.99 - 1.0)).abs() < 1e-12);
        assert!((months[1].value - (1.02 / 0.99 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn csv_has_one_row_per_date() {
        let csv = render_csv(&sample_result(false)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,nav,drawdown,turnover,rebalance");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("2024-01-30,1.01,"));
        assert!(lines[1].ends_with(",1"));
        assert!(lines[2].ends_with(",0"));
    }

    #[test]
    fn csv_includes_benchmark_column_when_present() {
        let csv = render_csv(&sample_result(true)).unwrap();
        assert!(csv.lines().next().unwrap().ends_with("benchmark_nav"));
    }

    #[test]
    fn json_carries_series_and_metrics() {
        let json = render_json(&sample_result(false)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nav"].as_array().unwrap().len(), 3);
        assert_eq!(value["metrics"]["periods"], 3);
        assert_eq!(value["monthly_returns"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn write_dispatches_on_extension() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("out.CSV");
        let json_path = dir.path().join("out.json");
        let result = sample_result(false);

        FileReportAdapter.write(&result, csv_path.to_str().unwrap()).unwrap();
        FileReportAdapter.write(&result, json_path.to_str().unwrap()).unwrap();

        assert!(fs::read_to_string(&csv_path).unwrap().starts_with("date,"));
        assert!(fs::read_to_string(&json_path).unwrap().trim_start().starts_with('{'));
    }

    #[test]
    fn write_to_missing_directory_is_io_error() {
        let err = FileReportAdapter
            .write(&sample_result(false), "/nonexistent/dir/report.json")
            .unwrap_err();
        assert!(matches!(err, PortsimError::Io(_)));
    }
}
