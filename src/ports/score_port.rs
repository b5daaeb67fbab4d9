//! Score provider port trait.

use chrono::NaiveDate;

use crate::domain::candidate::Candidate;
use crate::domain::error::PortsimError;

/// Produces scored candidates as of a date.
///
/// Providers are passed around as an ordered list; the order decides which
/// provider's sector wins when several supply one.
pub trait ScoreProvider {
    fn name(&self) -> &str;

    fn scores(&self, date: NaiveDate) -> Result<Vec<Candidate>, PortsimError>;
}
