//! Portfolio reader and order submission port.

use crate::domain::error::FundexError;
use crate::domain::instrument::Holding;

pub trait BrokerPort {
    fn holdings(&self) -> Vec<Holding>;

    fn total_portfolio_value(&self) -> f64;

    /// Closes one position, or every position when `symbol` is `None`.
    fn liquidate(&mut self, symbol: Option<&str>) -> Result<(), FundexError>;

    /// Trades `symbol` towards `target_weight` of total portfolio value.
    fn set_holdings(&mut self, symbol: &str, target_weight: f64) -> Result<(), FundexError>;
}
