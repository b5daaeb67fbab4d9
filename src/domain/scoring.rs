//! Score blending across an ordered list of providers, and period assembly.

use std::collections::BTreeMap;

use tracing::debug;

use super::backtest::Period;
use super::candidate::Candidate;
use super::error::PortsimError;
use crate::ports::data_port::ReturnsPort;
use crate::ports::score_port::ScoreProvider;

/// Merge per-provider candidate lists into one.
///
/// A symbol's score is the mean over every entry that scored it. Its sector
/// is the first non-blank one seen, in list order. Output is sorted by symbol.
pub fn blend_scores(sets: &[Vec<Candidate>]) -> Vec<Candidate> {
    struct Acc {
        sum: f64,
        count: usize,
        sector: Option<String>,
    }

    let mut merged: BTreeMap<&str, Acc> = BTreeMap::new();
    for set in sets {
        for c in set {
            let acc = merged.entry(c.symbol.as_str()).or_insert(Acc {
                sum: 0.0,
                count: 0,
                sector: None,
            });
            acc.sum += c.score;
            acc.count += 1;
            if acc.sector.is_none() {
                acc.sector = c.sector.clone().filter(|s| !s.trim().is_empty());
            }
        }
    }

    merged
        .into_iter()
        .map(|(symbol, acc)| Candidate {
            symbol: symbol.to_string(),
            score: acc.sum / acc.count as f64,
            sector: acc.sector,
        })
        .collect()
}

/// Ask every provider for `date` and blend the answers.
pub fn collect_scores(
    providers: &[Box<dyn ScoreProvider>],
    date: chrono::NaiveDate,
) -> Result<Vec<Candidate>, PortsimError> {
    let mut sets = Vec::with_capacity(providers.len());
    for provider in providers {
        let scores = provider.scores(date)?;
        debug!(provider = provider.name(), %date, count = scores.len(), "scores loaded");
        sets.push(scores);
    }
    Ok(blend_scores(&sets))
}

/// One `Period` per date the returns source knows about.
pub fn assemble_periods(
    returns: &dyn ReturnsPort,
    providers: &[Box<dyn ScoreProvider>],
) -> Result<Vec<Period>, PortsimError> {
    returns
        .dates()?
        .into_iter()
        .map(|date| {
            Ok(Period {
                date,
                candidates: collect_scores(providers, date)?,
                rel_returns: returns.returns_on(date)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn single_set_passes_through_sorted() {
        let blended = blend_scores(&[vec![Candidate::new("MSFT", 2.0), Candidate::new("AAPL", 1.0)]]);
        assert_eq!(blended[0].symbol, "AAPL");
        assert_eq!(blended[1].symbol, "MSFT");
    }

    #[test]
    fn scores_are_averaged_over_providers_that_scored() {
        let a = vec![Candidate::new("AAPL", 80.0), Candidate::new("MSFT", 60.0)];
        let b = vec![Candidate::new("AAPL", 40.0)];
        let blended = blend_scores(&[a, b]);

        assert_abs_diff_eq!(blended[0].score, 60.0);
        assert_abs_diff_eq!(blended[1].score, 60.0);
    }

    #[test]
    fn first_sector_wins() {
        let a = vec![Candidate::new("AAPL", 1.0)];
        let b = vec![Candidate::new("AAPL", 1.0).with_sector("TECH")];
        let c = vec![Candidate::new("AAPL", 1.0).with_sector("HARDWARE")];
        let blended = blend_scores(&[a, b, c]);
        assert_eq!(blended[0].sector.as_deref(), Some("TECH"));
    }

    #[test]
    fn blank_sector_is_ignored() {
        let a = vec![Candidate::new("AAPL", 1.0).with_sector("  ")];
        let b = vec![Candidate::new("AAPL", 1.0).with_sector("TECH")];
        let blended = blend_scores(&[a, b]);
        assert_eq!(blended[0].sector.as_deref(), Some("TECH"));
    }

    #[test]
    fn no_sets_is_empty() {
        assert!(blend_scores(&[]).is_empty());
    }
}
