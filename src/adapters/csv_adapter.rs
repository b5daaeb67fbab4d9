//! CSV file adapters: realised returns, scores and weight files.
//!
//! Returns are long format `date,symbol,rel_return`. Scores are
//! `date,symbol,score[,sector]`. Weight files are `symbol,weight`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::candidate::Candidate;
use crate::domain::error::PortsimError;
use crate::ports::data_port::ReturnsPort;
use crate::ports::score_port::ScoreProvider;

fn read_file(path: &Path) -> Result<String, PortsimError> {
    fs::read_to_string(path).map_err(|e| PortsimError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })
}

/// Deserialize every row of `content`, naming `source` and the line on failure.
fn parse_rows<T: DeserializeOwned>(content: &str, source: &str) -> Result<Vec<T>, PortsimError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    rdr.deserialize()
        .map(|row| {
            row.map_err(|e| {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                PortsimError::Data {
                    reason: format!("{source} line {line}: {e}"),
                }
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ReturnRow {
    date: NaiveDate,
    symbol: String,
    rel_return: f64,
}

#[derive(Debug, Deserialize)]
struct ScoreRow {
    date: NaiveDate,
    symbol: String,
    score: f64,
    #[serde(default)]
    sector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WeightRow {
    symbol: String,
    weight: f64,
}

/// Returns loaded once into memory.
pub struct CsvReturnsAdapter {
    by_date: BTreeMap<NaiveDate, HashMap<String, f64>>,
}

impl CsvReturnsAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PortsimError> {
        let path = path.as_ref();
        Self::from_csv_str(&read_file(path)?, &path.display().to_string())
    }

    pub fn from_csv_str(content: &str, source: &str) -> Result<Self, PortsimError> {
        let rows: Vec<ReturnRow> = parse_rows(content, source)?;
        let mut by_date: BTreeMap<NaiveDate, HashMap<String, f64>> = BTreeMap::new();
        for row in rows {
            by_date.entry(row.date).or_default().insert(row.symbol, row.rel_return);
        }
        debug!(source, dates = by_date.len(), "returns loaded");
        Ok(Self { by_date })
    }
}

impl ReturnsPort for CsvReturnsAdapter {
    fn dates(&self) -> Result<Vec<NaiveDate>, PortsimError> {
        Ok(self.by_date.keys().copied().collect())
    }

    fn returns_on(&self, date: NaiveDate) -> Result<HashMap<String, f64>, PortsimError> {
        Ok(self.by_date.get(&date).cloned().unwrap_or_default())
    }
}

/// Scores read from a file. A query returns the latest snapshot dated on or
/// before the requested date, so weekly score files drive daily backtests.
pub struct CsvScoreProvider {
    name: String,
    by_date: BTreeMap<NaiveDate, Vec<Candidate>>,
}

impl CsvScoreProvider {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PortsimError> {
        let path = path.as_ref();
        Self::from_csv_str(&read_file(path)?, &path.display().to_string())
    }

    pub fn from_csv_str(content: &str, source: &str) -> Result<Self, PortsimError> {
        let rows: Vec<ScoreRow> = parse_rows(content, source)?;
        let mut by_date: BTreeMap<NaiveDate, Vec<Candidate>> = BTreeMap::new();
        for row in rows {
            by_date.entry(row.date).or_default().push(Candidate {
                symbol: row.symbol,
                score: row.score,
                sector: row.sector.filter(|s| !s.is_empty()),
            });
        }
        Ok(Self {
            name: format!("csv:{source}"),
            by_date,
        })
    }

    /// The latest snapshot date in the file.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.by_date.keys().next_back().copied()
    }
}

impl ScoreProvider for CsvScoreProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn scores(&self, date: NaiveDate) -> Result<Vec<Candidate>, PortsimError> {
        Ok(self
            .by_date
            .range(..=date)
            .next_back()
            .map(|(_, scores)| scores.clone())
            .unwrap_or_default())
    }
}

/// Load a `symbol,weight` file. Repeated symbols are summed.
pub fn load_weights<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, f64>, PortsimError> {
    let path = path.as_ref();
    parse_weights(&read_file(path)?, &path.display().to_string())
}

pub fn parse_weights(content: &str, source: &str) -> Result<BTreeMap<String, f64>, PortsimError> {
    let rows: Vec<WeightRow> = parse_rows(content, source)?;
    let mut weights = BTreeMap::new();
    for row in rows {
        if !row.weight.is_finite() {
            return Err(PortsimError::data(format!(
                "{source}: weight for {} is not finite",
                row.symbol
            )));
        }
        *weights.entry(row.symbol).or_insert(0.0) += row.weight;
    }
    Ok(weights)
}
