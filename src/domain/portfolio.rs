//! Simulated portfolio state and equity tracking.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::instrument::Holding;
use super::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, Position>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn quantity(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).map_or(0, |p| p.quantity)
    }

    /// Buys `quantity` shares at `price`, paying from cash.
    pub fn buy(&mut self, symbol: &str, quantity: i64, price: f64) {
        if quantity <= 0 {
            return;
        }
        self.cash -= quantity as f64 * price;
        self.positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position {
                symbol: symbol.to_string(),
                quantity: 0,
            })
            .quantity += quantity;
    }

    /// Sells up to `quantity` shares at `price`. Flat positions are dropped.
    pub fn sell(&mut self, symbol: &str, quantity: i64, price: f64) -> i64 {
        let Some(position) = self.positions.get_mut(symbol) else {
            return 0;
        };
        let sold = position.reduce(quantity);
        self.cash += sold as f64 * price;
        if position.quantity == 0 {
            self.positions.remove(symbol);
        }
        sold
    }

    /// Open positions in symbol order, marked at `price_map` (zero when unpriced).
    pub fn holdings(&self, price_map: &HashMap<String, f64>) -> Vec<Holding> {
        self.positions
            .values()
            .map(|p| Holding {
                symbol: p.symbol.clone(),
                quantity: p.quantity,
                market_value: price_map
                    .get(&p.symbol)
                    .map_or(0.0, |&price| p.market_value(price)),
            })
            .collect()
    }

    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        self.equity_curve.push(EquityPoint { date, equity });
    }

    /// Cash plus positions marked at `price_map`. Unpriced positions count as zero.
    pub fn total_equity(&self, price_map: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .filter_map(|pos| {
                price_map
                    .get(&pos.symbol)
                    .map(|&price| pos.market_value(price))
            })
            .sum();
        self.cash + position_value
    }
}
