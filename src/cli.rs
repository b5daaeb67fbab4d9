//! CLI definition and dispatch.
//!
//! Machine-readable output (proposals, orders) goes to stdout as JSON;
//! progress and summaries go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::adapters::csv_adapter::{load_weights, CsvReturnsAdapter, CsvScoreProvider};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::fixed_score_adapter::FixedScoreProvider;
use crate::adapters::report_adapter::FileReportAdapter;
use crate::domain::allocator::propose;
use crate::domain::backtest::{run_backtest, BacktestResult};
use crate::domain::config_validation::{
    build_backtest_config, build_risk_config, parse_fixed_symbols, provider_kinds, read_double,
    validate_all, validate_score_config, ProviderKind, DEFAULT_FIXED_SCORE,
};
use crate::domain::error::PortsimError;
use crate::domain::execution::{plan_orders, turnover};
use crate::domain::scoring::{assemble_periods, collect_scores};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::score_port::ScoreProvider;

#[derive(Parser, Debug)]
#[command(name = "portsim", about = "Risk-constrained portfolio allocator and paper simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Propose target weights from a scores file
    Propose {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        scores: PathBuf,
        /// Score snapshot date; defaults to the latest in the file
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Diff two weight files into orders
    Plan {
        #[arg(long)]
        current: PathBuf,
        #[arg(long)]
        target: PathBuf,
    },
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Report path; `.csv` for the series, anything else for JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Start the HTTP server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Propose {
            config,
            scores,
            date,
        } => run_propose(&config, &scores, date),
        Command::Plan { current, target } => run_plan(&current, &target),
        Command::Backtest { config, output } => run_backtest_command(&config, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Serve { config } => run_serve(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, PortsimError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Instantiate the configured providers, in configured order.
pub fn build_score_providers(config: &dyn ConfigPort) -> Result<Vec<Box<dyn ScoreProvider>>, PortsimError> {
    validate_score_config(config)?;
    provider_kinds(config)?
        .into_iter()
        .map(|kind| -> Result<Box<dyn ScoreProvider>, PortsimError> {
            match kind {
                ProviderKind::Csv => {
                    let path = config.get_string("scores", "csv_path").unwrap_or_default();
                    Ok(Box::new(CsvScoreProvider::from_file(path.trim())?))
                }
                ProviderKind::Fixed => {
                    let raw = config.get_string("scores", "fixed_symbols").unwrap_or_default();
                    let universe = parse_fixed_symbols(&raw).map_err(|reason| PortsimError::ConfigInvalid {
                        section: "scores".to_string(),
                        key: "fixed_symbols".to_string(),
                        reason,
                    })?;
                    let score = read_double(config, "scores", "fixed_score", DEFAULT_FIXED_SCORE)?;
                    Ok(Box::new(FixedScoreProvider::new(universe, score)))
                }
            }
        })
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), PortsimError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_propose(config_path: &Path, scores_path: &Path, date: Option<NaiveDate>) -> Result<(), PortsimError> {
    let config = load_config(config_path)?;
    let risk = build_risk_config(&config)?;

    let provider = CsvScoreProvider::from_file(scores_path)?;
    let date = match date.or_else(|| provider.latest_date()) {
        Some(d) => d,
        None => return Err(PortsimError::data(format!("{} has no scores", scores_path.display()))),
    };

    let providers: Vec<Box<dyn ScoreProvider>> = vec![Box::new(provider)];
    let candidates = collect_scores(&providers, date)?;
    info!(%date, candidates = candidates.len(), "proposing");

    let proposal = propose(&candidates, &risk)?;
    for action in &proposal.actions {
        eprintln!("  [{:?}] {} {}", action.rule, action.symbol, action.detail);
    }
    print_json(&proposal)
}

fn run_plan(current_path: &Path, target_path: &Path) -> Result<(), PortsimError> {
    let current = load_weights(current_path)?;
    let target = load_weights(target_path)?;
    let orders = plan_orders(&current, &target);
    eprintln!("{} orders, turnover {:.4}", orders.len(), turnover(&orders));
    print_json(&orders)
}

fn run_backtest_command(config_path: &Path, output: Option<&Path>) -> Result<(), PortsimError> {
    let config = load_config(config_path)?;
    let bt_config = build_backtest_config(&config)?;
    let providers = build_score_providers(&config)?;

    let returns_path = config.get_string("backtest", "returns_path").unwrap_or_default();
    let returns = CsvReturnsAdapter::from_file(returns_path.trim())?;
    let periods = assemble_periods(&returns, &providers)?;
    info!(periods = periods.len(), rebalance = %bt_config.rebalance, "running backtest");

    let result = run_backtest(&periods, &bt_config)?;
    print_summary(&result);

    if let Some(path) = output {
        FileReportAdapter.write(&result, &path.to_string_lossy())?;
        eprintln!("Report written to {}", path.display());
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    eprintln!("\n=== Backtest Results ===");
    eprintln!("Periods:            {}", m.periods);
    eprintln!("Rebalances:         {}", result.rebalance_dates.len());
    eprintln!("Total Return:       {:.2}%", m.total_return * 100.0);
    eprintln!("Annualized Return:  {:.2}%", m.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:       {:.4}", m.sharpe);
    eprintln!("Max Drawdown:       {:.2}%", m.max_drawdown * 100.0);
    eprintln!("Win Rate:           {:.2}%", m.win_rate * 100.0);
    eprintln!("Mean Turnover:      {:.4}", m.turnover);
    eprintln!("Total Cost:         {:.4}%", m.total_cost * 100.0);
    if let Some(b) = m.benchmark_return {
        eprintln!("Benchmark Return:   {:.2}%", b * 100.0);
    }
}

fn run_validate(config_path: &Path) -> Result<(), PortsimError> {
    let config = load_config(config_path)?;
    validate_all(&config)?;
    eprintln!("{}: OK", config_path.display());
    Ok(())
}

fn run_serve(config_path: &Path) -> Result<(), PortsimError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{serve, AppState};
        use crate::domain::config_validation::listen_addr;

        let config = load_config(config_path)?;
        let addr = listen_addr(&config)?;
        let defaults = if config.has_key("backtest", "returns_path") {
            build_backtest_config(&config)?
        } else {
            crate::domain::backtest::BacktestConfig {
                risk: build_risk_config(&config)?,
                cost_rate: crate::domain::config_validation::build_cost_rate(&config)?,
                ..Default::default()
            }
        };
        let state = AppState::new(defaults)?;

        eprintln!("Starting web server on {addr}");
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(serve(state, addr))
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(PortsimError::configuration("the web feature is required for serve"))
    }
}
