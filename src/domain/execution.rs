//! Order execution and fill simulation.
//!
//! [`PaperBroker`] fills every order at the current snapshot price: whole shares only,
//! no commission or slippage. `set_holdings` trades to `floor(weight * total_value / price)`
//! shares and buys are capped by available cash.

use chrono::NaiveDate;
use log::debug;
use std::collections::HashMap;

use crate::domain::error::FundexError;
use crate::domain::instrument::{Holding, InstrumentSummary};
use crate::domain::portfolio::Portfolio;
use crate::ports::broker_port::BrokerPort;

pub struct PaperBroker {
    portfolio: Portfolio,
    prices: HashMap<String, f64>,
    date: NaiveDate,
}

impl PaperBroker {
    pub fn new(initial_capital: f64, start: NaiveDate) -> Self {
        Self {
            portfolio: Portfolio::new(initial_capital),
            prices: HashMap::new(),
            date: start,
        }
    }

    /// Moves the clock to `date` and refreshes prices from the snapshot. Symbols missing
    /// from the snapshot keep their last known price.
    pub fn mark(&mut self, date: NaiveDate, universe: &[InstrumentSummary]) {
        self.date = date;
        for inst in universe {
            if inst.price.is_finite() && inst.price > 0.0 {
                self.prices.insert(inst.symbol.clone(), inst.price);
            }
        }
    }

    pub fn set_price(&mut self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_string(), price);
    }

    pub fn record_equity(&mut self) -> f64 {
        let equity = self.total_portfolio_value();
        self.portfolio.record_equity(self.date, equity);
        equity
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn into_portfolio(self) -> Portfolio {
        self.portfolio
    }

    fn price(&self, symbol: &str) -> Result<f64, FundexError> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| FundexError::NoPrice {
                symbol: symbol.to_string(),
            })
    }

    fn close(&mut self, symbol: &str) -> Result<(), FundexError> {
        let quantity = self.portfolio.quantity(symbol);
        if quantity == 0 {
            return Ok(());
        }
        let price = self.price(symbol)?;
        self.portfolio.sell(symbol, quantity, price);
        debug!("{}: sold {} {} @ {:.2}", self.date, quantity, symbol, price);
        Ok(())
    }
}

impl BrokerPort for PaperBroker {
    fn holdings(&self) -> Vec<Holding> {
        self.portfolio.holdings(&self.prices)
    }

    fn total_portfolio_value(&self) -> f64 {
        self.portfolio.total_equity(&self.prices)
    }

    fn liquidate(&mut self, symbol: Option<&str>) -> Result<(), FundexError> {
        match symbol {
            Some(symbol) => self.close(symbol),
            None => {
                let symbols: Vec<String> = self.portfolio.positions.keys().cloned().collect();
                let mut first_err = None;
                for symbol in symbols {
                    if let Err(e) = self.close(&symbol) {
                        first_err.get_or_insert(e);
                    }
                }
                first_err.map_or(Ok(()), Err)
            }
        }
    }

    fn set_holdings(&mut self, symbol: &str, target_weight: f64) -> Result<(), FundexError> {
        let price = self.price(symbol)?;
        let total = self.total_portfolio_value();
        let target = (target_weight * total / price).floor() as i64;
        let current = self.portfolio.quantity(symbol);
        let delta = target - current;

        if delta > 0 {
            let affordable = (self.portfolio.cash / price).floor().max(0.0) as i64;
            let quantity = delta.min(affordable);
            self.portfolio.buy(symbol, quantity, price);
            debug!("{}: bought {} {} @ {:.2}", self.date, quantity, symbol, price);
        } else if delta < 0 {
            self.portfolio.sell(symbol, -delta, price);
            debug!("{}: sold {} {} @ {:.2}", self.date, -delta, symbol, price);
        }
        Ok(())
    }
}
