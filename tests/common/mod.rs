#![allow(dead_code)]

use chrono::NaiveDate;
use fundex::domain::backtest::BacktestConfig;
use fundex::domain::error::FundexError;
use fundex::domain::instrument::{FineCandidate, FundamentalBundle, Holding, InstrumentSummary};
use fundex::ports::broker_port::BrokerPort;
use fundex::ports::data_port::DataPort;
use std::collections::{BTreeMap, HashMap, HashSet};

pub struct MockDataPort {
    pub snapshots: BTreeMap<NaiveDate, Vec<InstrumentSummary>>,
    pub fundamentals: HashMap<String, FundamentalBundle>,
    pub snapshot_errors: HashSet<NaiveDate>,
    pub fundamentals_errors: HashSet<NaiveDate>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            snapshots: BTreeMap::new(),
            fundamentals: HashMap::new(),
            snapshot_errors: HashSet::new(),
            fundamentals_errors: HashSet::new(),
        }
    }

    pub fn with_snapshot(mut self, date: NaiveDate, rows: Vec<InstrumentSummary>) -> Self {
        self.snapshots.insert(date, rows);
        self
    }

    pub fn with_fundamentals(mut self, symbol: &str, bundle: FundamentalBundle) -> Self {
        self.fundamentals.insert(symbol.to_string(), bundle);
        self
    }

    pub fn with_snapshot_error(mut self, date: NaiveDate) -> Self {
        self.snapshots.entry(date).or_default();
        self.snapshot_errors.insert(date);
        self
    }

    pub fn with_fundamentals_error(mut self, date: NaiveDate) -> Self {
        self.fundamentals_errors.insert(date);
        self
    }
}

impl DataPort for MockDataPort {
    fn snapshot_dates(&self) -> Result<Vec<NaiveDate>, FundexError> {
        Ok(self.snapshots.keys().copied().collect())
    }

    fn fetch_universe_snapshot(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<InstrumentSummary>, FundexError> {
        if self.snapshot_errors.contains(&date) {
            return Err(FundexError::Data {
                reason: format!("snapshot {date} unreadable"),
            });
        }
        self.snapshots
            .get(&date)
            .cloned()
            .ok_or(FundexError::NoSnapshot { date })
    }

    fn fetch_fundamentals(
        &self,
        date: NaiveDate,
        symbols: &[String],
    ) -> Result<HashMap<String, FundamentalBundle>, FundexError> {
        if self.fundamentals_errors.contains(&date) {
            return Err(FundexError::Data {
                reason: format!("fundamentals {date} unreadable"),
            });
        }
        Ok(symbols
            .iter()
            .filter_map(|s| self.fundamentals.get(s).map(|b| (s.clone(), b.clone())))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrokerCall {
    Liquidate(Option<String>),
    SetHoldings(String, f64),
}

/// Broker with a caller-controlled portfolio value that records every order. Holdings
/// added by `holding` are valued at one unit of currency per share.
pub struct RecordingBroker {
    pub value: f64,
    pub holdings: Vec<Holding>,
    pub calls: Vec<BrokerCall>,
    pub rejected: HashSet<String>,
}

impl RecordingBroker {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            holdings: Vec::new(),
            calls: Vec::new(),
            rejected: HashSet::new(),
        }
    }

    pub fn holding(mut self, symbol: &str, quantity: i64) -> Self {
        self.holdings.push(Holding {
            symbol: symbol.to_string(),
            quantity,
            market_value: quantity as f64,
        });
        self
    }

    pub fn set_holdings_calls(&self) -> Vec<(String, f64)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BrokerCall::SetHoldings(s, w) => Some((s.clone(), *w)),
                BrokerCall::Liquidate(_) => None,
            })
            .collect()
    }
}

impl BrokerPort for RecordingBroker {
    fn holdings(&self) -> Vec<Holding> {
        self.holdings.clone()
    }

    fn total_portfolio_value(&self) -> f64 {
        self.value
    }

    fn liquidate(&mut self, symbol: Option<&str>) -> Result<(), FundexError> {
        self.calls.push(BrokerCall::Liquidate(symbol.map(str::to_string)));
        match symbol {
            Some(s) => self.holdings.retain(|h| h.symbol != s),
            None => self.holdings.clear(),
        }
        Ok(())
    }

    fn set_holdings(&mut self, symbol: &str, target_weight: f64) -> Result<(), FundexError> {
        self.calls
            .push(BrokerCall::SetHoldings(symbol.to_string(), target_weight));
        if self.rejected.contains(symbol) {
            return Err(FundexError::NoPrice {
                symbol: symbol.to_string(),
            });
        }
        self.holdings.retain(|h| h.symbol != symbol);
        self.holdings.push(Holding {
            symbol: symbol.to_string(),
            quantity: 1,
            market_value: target_weight * self.value,
        });
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn summary(symbol: &str, price: f64, dollar_volume: f64) -> InstrumentSummary {
    InstrumentSummary {
        symbol: symbol.to_string(),
        price,
        dollar_volume,
        has_fundamental_data: true,
    }
}

pub fn bundle(tv: f64, tr: f64, oi: f64, dp: f64) -> FundamentalBundle {
    FundamentalBundle {
        tangible_book_value: Some(tv),
        total_revenue: Some(tr),
        operating_income: Some(oi),
        dividends_paid: Some(dp),
        primary_exchange: "NYS".to_string(),
    }
}

pub fn candidate(symbol: &str, tv: f64, tr: f64, oi: f64, dp: f64) -> FineCandidate {
    FineCandidate {
        symbol: symbol.to_string(),
        fundamentals: bundle(tv, tr, oi, dp),
    }
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        start_date: date(2020, 1, 1),
        end_date: date(2022, 12, 31),
        initial_capital: 100_000.0,
        risk_free_rate: 0.0,
    }
}
