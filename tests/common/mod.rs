#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use portsim::domain::backtest::Period;
pub use portsim::domain::candidate::Candidate;
use portsim::domain::error::PortsimError;
use portsim::ports::data_port::ReturnsPort;
use portsim::ports::score_port::ScoreProvider;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;

/// In-memory returns keyed by date.
pub struct MockReturnsPort {
    pub data: BTreeMap<NaiveDate, HashMap<String, f64>>,
    pub error: Option<String>,
}

impl MockReturnsPort {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            error: None,
        }
    }

    pub fn with_return(mut self, date: NaiveDate, symbol: &str, r: f64) -> Self {
        self.data.entry(date).or_default().insert(symbol.to_string(), r);
        self
    }

    /// One return per consecutive day for `symbol`, starting at `start`.
    pub fn with_series(mut self, symbol: &str, start: &str, returns: &[f64]) -> Self {
        let start = parse_date(start);
        for (i, r) in returns.iter().enumerate() {
            self = self.with_return(start + Duration::days(i as i64), symbol, *r);
        }
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl ReturnsPort for MockReturnsPort {
    fn dates(&self) -> Result<Vec<NaiveDate>, PortsimError> {
        if let Some(reason) = &self.error {
            return Err(PortsimError::data(reason.clone()));
        }
        Ok(self.data.keys().copied().collect())
    }

    fn returns_on(&self, date: NaiveDate) -> Result<HashMap<String, f64>, PortsimError> {
        Ok(self.data.get(&date).cloned().unwrap_or_default())
    }
}

/// Returns the same candidates for every date.
pub struct MockScoreProvider {
    pub name: String,
    pub candidates: Vec<Candidate>,
    pub fail: bool,
}

impl MockScoreProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            candidates: Vec::new(),
            fail: false,
        }
    }

    pub fn with_score(mut self, symbol: &str, score: f64, sector: Option<&str>) -> Self {
        let mut c = Candidate::new(symbol, score);
        c.sector = sector.map(str::to_string);
        self.candidates.push(c);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl ScoreProvider for MockScoreProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn scores(&self, _date: NaiveDate) -> Result<Vec<Candidate>, PortsimError> {
        if self.fail {
            return Err(PortsimError::data(format!("{} unavailable", self.name)));
        }
        Ok(self.candidates.clone())
    }
}

pub fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn candidate(symbol: &str, score: f64, sector: &str) -> Candidate {
    Candidate::new(symbol, score).with_sector(sector)
}

/// A ten-name universe across four sectors.
pub fn sample_universe() -> Vec<Candidate> {
    vec![
        candidate("AAPL", 92.0, "TECH"),
        candidate("MSFT", 88.0, "TECH"),
        candidate("NVDA", 85.0, "TECH"),
        candidate("GOOG", 80.0, "TECH"),
        candidate("JPM", 75.0, "FIN"),
        candidate("BAC", 60.0, "FIN"),
        candidate("XOM", 55.0, "ENERGY"),
        candidate("CVX", 50.0, "ENERGY"),
        candidate("JNJ", 45.0, "HEALTH"),
        candidate("PFE", 40.0, "HEALTH"),
    ]
}

/// Consecutive daily periods with the same candidates and per-day returns.
pub fn daily_periods(start: &str, candidates: &[Candidate], returns: &[HashMap<String, f64>]) -> Vec<Period> {
    let start = parse_date(start);
    returns
        .iter()
        .enumerate()
        .map(|(i, r)| Period {
            date: start + Duration::days(i as i64),
            candidates: candidates.to_vec(),
            rel_returns: r.clone(),
        })
        .collect()
}

pub fn flat_returns(symbols: &[&str], r: f64) -> HashMap<String, f64> {
    symbols.iter().map(|s| (s.to_string(), r)).collect()
}

pub fn write_temp_file(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    write_temp_file(content, ".ini")
}
