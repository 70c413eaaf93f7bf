//! Universe and fundamentals data access port.

use crate::domain::error::FundexError;
use crate::domain::instrument::{FundamentalBundle, InstrumentSummary};
use chrono::NaiveDate;
use std::collections::HashMap;

pub trait DataPort {
    /// Dates with a universe snapshot, ascending.
    fn snapshot_dates(&self) -> Result<Vec<NaiveDate>, FundexError>;

    fn fetch_universe_snapshot(&self, date: NaiveDate)
    -> Result<Vec<InstrumentSummary>, FundexError>;

    /// Bundles for the requested symbols as known on `date`. Symbols without any
    /// fundamentals are simply absent from the map.
    fn fetch_fundamentals(
        &self,
        date: NaiveDate,
        symbols: &[String],
    ) -> Result<HashMap<String, FundamentalBundle>, FundexError>;
}
