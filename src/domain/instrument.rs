//! Instrument snapshot types supplied fresh by the data port every cycle.

use std::fmt;

/// One row of the coarse universe snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSummary {
    pub symbol: String,
    pub price: f64,
    pub dollar_volume: f64,
    pub has_fundamental_data: bool,
}

/// Current-period fundamental statement figures for one instrument.
///
/// Every figure is optional. A figure counts as present only when it is `Some` and finite.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FundamentalBundle {
    pub tangible_book_value: Option<f64>,
    pub total_revenue: Option<f64>,
    pub operating_income: Option<f64>,
    pub dividends_paid: Option<f64>,
    pub primary_exchange: String,
}

impl FundamentalBundle {
    /// The value of `factor`, or `None` when absent or not finite.
    pub fn value(&self, factor: Factor) -> Option<f64> {
        let raw = match factor {
            Factor::TangibleBook => self.tangible_book_value,
            Factor::Revenue => self.total_revenue,
            Factor::OperatingIncome => self.operating_income,
            Factor::Dividends => self.dividends_paid,
        };
        raw.filter(|v| v.is_finite())
    }

    pub fn has_all_factors(&self) -> bool {
        Factor::ALL.iter().all(|&f| self.value(f).is_some())
    }
}

/// The four ranked fundamental factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Factor {
    TangibleBook,
    Revenue,
    OperatingIncome,
    Dividends,
}

impl Factor {
    pub const ALL: [Factor; 4] = [
        Factor::TangibleBook,
        Factor::Revenue,
        Factor::OperatingIncome,
        Factor::Dividends,
    ];
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factor::TangibleBook => write!(f, "TV"),
            Factor::Revenue => write!(f, "TR"),
            Factor::OperatingIncome => write!(f, "OI"),
            Factor::Dividends => write!(f, "DP"),
        }
    }
}

/// A coarse survivor joined with its fundamentals, in coarse order.
#[derive(Debug, Clone, PartialEq)]
pub struct FineCandidate {
    pub symbol: String,
    pub fundamentals: FundamentalBundle,
}

/// A position as reported by the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub quantity: i64,
    /// Quantity marked at the broker's current price.
    pub market_value: f64,
}

impl Holding {
    pub fn is_invested(&self) -> bool {
        self.quantity != 0
    }
}
