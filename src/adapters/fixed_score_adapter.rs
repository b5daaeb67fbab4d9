//! Fixed-score provider: the same score for a configured universe on every date.

use chrono::NaiveDate;

use crate::domain::candidate::Candidate;
use crate::domain::error::PortsimError;
use crate::ports::score_port::ScoreProvider;

pub struct FixedScoreProvider {
    universe: Vec<(String, Option<String>)>,
    score: f64,
}

impl FixedScoreProvider {
    pub fn new(universe: Vec<(String, Option<String>)>, score: f64) -> Self {
        Self { universe, score }
    }
}

impl ScoreProvider for FixedScoreProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    fn scores(&self, _date: NaiveDate) -> Result<Vec<Candidate>, PortsimError> {
        Ok(self
            .universe
            .iter()
            .map(|(symbol, sector)| Candidate {
                symbol: symbol.clone(),
                score: self.score,
                sector: sector.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_symbol_gets_the_fixed_score() {
        let provider = FixedScoreProvider::new(
            vec![
                ("AAPL".to_string(), Some("TECH".to_string())),
                ("XOM".to_string(), None),
            ],
            50.0,
        );
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let scores = provider.scores(date).unwrap();

        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|c| c.score == 50.0));
        assert_eq!(scores[0].sector.as_deref(), Some("TECH"));
        assert_eq!(scores[1].sector, None);
    }

    #[test]
    fn scores_do_not_depend_on_date() {
        let provider = FixedScoreProvider::new(vec![("AAPL".to_string(), None)], 10.0);
        let a = provider.scores(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()).unwrap();
        let b = provider.scores(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
