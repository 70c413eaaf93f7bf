//! Coarse filter: liquidity-ranked first pass over the full universe.

use chrono::NaiveDate;

use super::instrument::InstrumentSummary;

pub const DEFAULT_NUM_COARSE: usize = 3000;
pub const DEFAULT_MIN_PRICE: f64 = 5.0;

/// Result of a coarse pass.
#[derive(Debug, Clone, PartialEq)]
pub enum CoarseSelection {
    /// Not yet time to rebalance; the current universe is left untouched.
    Unchanged,
    /// Symbols ordered by descending dollar volume, at most `num_coarse` long.
    Selected(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoarseFilter {
    pub num_coarse: usize,
    pub min_price: f64,
}

impl Default for CoarseFilter {
    fn default() -> Self {
        CoarseFilter {
            num_coarse: DEFAULT_NUM_COARSE,
            min_price: DEFAULT_MIN_PRICE,
        }
    }
}

impl CoarseFilter {
    pub fn select(
        &self,
        now: NaiveDate,
        next_rebalance: NaiveDate,
        universe: &[InstrumentSummary],
    ) -> CoarseSelection {
        if now < next_rebalance {
            return CoarseSelection::Unchanged;
        }
        CoarseSelection::Selected(self.filter(universe))
    }

    /// Price/fundamental eligibility, then a stable sort by descending dollar volume.
    pub fn filter(&self, universe: &[InstrumentSummary]) -> Vec<String> {
        let mut eligible: Vec<&InstrumentSummary> = universe
            .iter()
            .filter(|i| i.has_fundamental_data && i.price.is_finite() && i.price > self.min_price)
            .filter(|i| i.dollar_volume.is_finite())
            .collect();

        eligible.sort_by(|a, b| b.dollar_volume.total_cmp(&a.dollar_volume));

        eligible
            .into_iter()
            .take(self.num_coarse)
            .map(|i| i.symbol.clone())
            .collect()
    }
}
