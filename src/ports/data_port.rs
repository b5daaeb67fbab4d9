//! Realised-returns port trait.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::error::PortsimError;

/// Source of per-period relative returns, keyed by date then symbol.
pub trait ReturnsPort {
    /// Every date with at least one return, ascending.
    fn dates(&self) -> Result<Vec<NaiveDate>, PortsimError>;

    /// Symbol -> relative return over the period ending `date`. Empty for unknown dates.
    fn returns_on(&self, date: NaiveDate) -> Result<HashMap<String, f64>, PortsimError>;
}
