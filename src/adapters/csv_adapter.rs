//! CSV snapshot data adapter.
//!
//! A data directory holds two files:
//!
//! - `universe.csv`: `date,symbol,price,dollar_volume,has_fundamental_data`
//! - `fundamentals.csv`: `date,symbol,primary_exchange,tangible_book_value,total_revenue,operating_income,dividends_paid`
//!
//! An empty fundamentals cell means the figure is absent. Fundamentals are served as of
//! the requested date: the latest row dated on or before it.

use crate::domain::error::FundexError;
use crate::domain::instrument::{FundamentalBundle, InstrumentSummary};
use crate::domain::portfolio::EquityPoint;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

pub const UNIVERSE_FILE: &str = "universe.csv";
pub const FUNDAMENTALS_FILE: &str = "fundamentals.csv";

pub struct CsvAdapter {
    universe: BTreeMap<NaiveDate, Vec<InstrumentSummary>>,
    fundamentals: HashMap<String, Vec<(NaiveDate, FundamentalBundle)>>,
}

impl CsvAdapter {
    pub fn open(base_path: &Path) -> Result<Self, FundexError> {
        let universe = open_file(&base_path.join(UNIVERSE_FILE))?;
        let fundamentals = open_file(&base_path.join(FUNDAMENTALS_FILE))?;
        Self::from_readers(universe, fundamentals)
    }

    pub fn from_readers<U: Read, F: Read>(
        universe: U,
        fundamentals: F,
    ) -> Result<Self, FundexError> {
        let mut by_date: BTreeMap<NaiveDate, Vec<InstrumentSummary>> = BTreeMap::new();
        for (line, result) in csv::Reader::from_reader(universe).records().enumerate() {
            let record = result.map_err(|e| FundexError::data(format!("{UNIVERSE_FILE}: {e}")))?;
            let (date, summary) =
                parse_universe_row(&record).map_err(|e| at_row(UNIVERSE_FILE, line, e))?;
            by_date.entry(date).or_default().push(summary);
        }

        let mut by_symbol: HashMap<String, Vec<(NaiveDate, FundamentalBundle)>> = HashMap::new();
        for (line, result) in csv::Reader::from_reader(fundamentals).records().enumerate() {
            let record =
                result.map_err(|e| FundexError::data(format!("{FUNDAMENTALS_FILE}: {e}")))?;
            let (date, symbol, bundle) =
                parse_fundamentals_row(&record).map_err(|e| at_row(FUNDAMENTALS_FILE, line, e))?;
            by_symbol.entry(symbol).or_default().push((date, bundle));
        }
        for rows in by_symbol.values_mut() {
            rows.sort_by_key(|(date, _)| *date);
        }

        Ok(Self {
            universe: by_date,
            fundamentals: by_symbol,
        })
    }

    fn fundamentals_as_of(&self, symbol: &str, date: NaiveDate) -> Option<&FundamentalBundle> {
        let rows = self.fundamentals.get(symbol)?;
        let idx = rows.partition_point(|(d, _)| *d <= date);
        idx.checked_sub(1).map(|i| &rows[i].1)
    }
}

impl DataPort for CsvAdapter {
    fn snapshot_dates(&self) -> Result<Vec<NaiveDate>, FundexError> {
        Ok(self.universe.keys().copied().collect())
    }

    fn fetch_universe_snapshot(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<InstrumentSummary>, FundexError> {
        self.universe
            .get(&date)
            .cloned()
            .ok_or(FundexError::NoSnapshot { date })
    }

    fn fetch_fundamentals(
        &self,
        date: NaiveDate,
        symbols: &[String],
    ) -> Result<HashMap<String, FundamentalBundle>, FundexError> {
        Ok(symbols
            .iter()
            .filter_map(|s| {
                self.fundamentals_as_of(s, date)
                    .map(|b| (s.clone(), b.clone()))
            })
            .collect())
    }
}

/// Writes `date,equity` rows for an equity curve.
pub fn write_equity_curve(path: &Path, curve: &[EquityPoint]) -> Result<(), FundexError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| FundexError::data(format!("failed to create {}: {}", path.display(), e)))?;
    let to_err =
        |e: csv::Error| FundexError::data(format!("failed to write {}: {}", path.display(), e));

    writer.write_record(["date", "equity"]).map_err(to_err)?;
    for point in curve {
        writer
            .write_record([point.date.to_string(), format!("{:.2}", point.equity)])
            .map_err(to_err)?;
    }
    writer.flush()?;
    Ok(())
}

fn open_file(path: &Path) -> Result<std::fs::File, FundexError> {
    std::fs::File::open(path)
        .map_err(|e| FundexError::data(format!("failed to read {}: {}", path.display(), e)))
}

fn at_row(file: &str, line: usize, reason: String) -> FundexError {
    // +2: one for the header, one for 1-based numbering
    FundexError::data(format!("{file} line {}: {reason}", line + 2))
}

fn column<'r>(record: &'r StringRecord, idx: usize, name: &str) -> Result<&'r str, String> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| format!("missing {name} column"))
}

fn parse_date(record: &StringRecord) -> Result<NaiveDate, String> {
    let raw = column(record, 0, "date")?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("invalid date '{raw}': {e}"))
}

fn parse_number(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = column(record, idx, name)?;
    raw.parse()
        .map_err(|e| format!("invalid {name} value '{raw}': {e}"))
}

fn parse_optional(record: &StringRecord, idx: usize, name: &str) -> Result<Option<f64>, String> {
    match record.get(idx).map(str::trim) {
        None | Some("") => Ok(None),
        Some(_) => parse_number(record, idx, name).map(Some),
    }
}

fn parse_flag(record: &StringRecord, idx: usize, name: &str) -> Result<bool, String> {
    let raw = column(record, idx, name)?;
    match raw.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(format!("invalid {name} value '{raw}'")),
    }
}

fn parse_universe_row(record: &StringRecord) -> Result<(NaiveDate, InstrumentSummary), String> {
    let date = parse_date(record)?;
    let summary = InstrumentSummary {
        symbol: column(record, 1, "symbol")?.to_uppercase(),
        price: parse_number(record, 2, "price")?,
        dollar_volume: parse_number(record, 3, "dollar_volume")?,
        has_fundamental_data: parse_flag(record, 4, "has_fundamental_data")?,
    };
    Ok((date, summary))
}

fn parse_fundamentals_row(
    record: &StringRecord,
) -> Result<(NaiveDate, String, FundamentalBundle), String> {
    let date = parse_date(record)?;
    let symbol = column(record, 1, "symbol")?.to_uppercase();
    let bundle = FundamentalBundle {
        primary_exchange: column(record, 2, "primary_exchange")?.to_uppercase(),
        tangible_book_value: parse_optional(record, 3, "tangible_book_value")?,
        total_revenue: parse_optional(record, 4, "total_revenue")?,
        operating_income: parse_optional(record, 5, "operating_income")?,
        dividends_paid: parse_optional(record, 6, "dividends_paid")?,
    };
    Ok((date, symbol, bundle))
}
