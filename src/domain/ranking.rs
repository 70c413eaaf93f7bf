//! Fine selection: cross-sectional factor ranks and composite scoring.
//!
//! Each surviving instrument is ranked independently on every factor (rank 0 is the
//! highest value). The composite score is the weighted sum of those rank positions, so a
//! lower composite means stronger fundamentals. The basket is drawn from the
//! *descending* composite order by default, which favours the weakest instruments;
//! [`ScoreOrder::Ascending`] flips that.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::instrument::{Factor, FineCandidate};

pub const DEFAULT_NUM_LONG: usize = 120;

/// Primary exchange identifiers accepted by default (NASDAQ, NYSE).
pub const DEFAULT_EXCHANGES: [&str; 2] = ["NAS", "NYS"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeights {
    pub tangible_book: f64,
    pub revenue: f64,
    pub operating_income: f64,
    pub dividends: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        FactorWeights {
            tangible_book: 1.0,
            revenue: 1.0,
            operating_income: 1.0,
            dividends: 1.0,
        }
    }
}

impl FactorWeights {
    pub fn weight(&self, factor: Factor) -> f64 {
        match factor {
            Factor::TangibleBook => self.tangible_book,
            Factor::Revenue => self.revenue,
            Factor::OperatingIncome => self.operating_income,
            Factor::Dividends => self.dividends,
        }
    }
}

/// Which end of the composite-score ordering the basket is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreOrder {
    /// Highest composite (weakest summed ranks) first.
    #[default]
    Descending,
    /// Lowest composite (strongest summed ranks) first.
    Ascending,
}

impl FromStr for ScoreOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "descending" | "desc" => Ok(ScoreOrder::Descending),
            "ascending" | "asc" => Ok(ScoreOrder::Ascending),
            other => Err(format!(
                "unknown score order '{other}' (expected descending or ascending)"
            )),
        }
    }
}

impl fmt::Display for ScoreOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreOrder::Descending => write!(f, "descending"),
            ScoreOrder::Ascending => write!(f, "ascending"),
        }
    }
}

/// Zero-based rank positions of one instrument on each factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FactorRanks {
    pub tangible_book: usize,
    pub revenue: usize,
    pub operating_income: usize,
    pub dividends: usize,
}

impl FactorRanks {
    pub fn get(&self, factor: Factor) -> usize {
        match factor {
            Factor::TangibleBook => self.tangible_book,
            Factor::Revenue => self.revenue,
            Factor::OperatingIncome => self.operating_income,
            Factor::Dividends => self.dividends,
        }
    }

    fn set(&mut self, factor: Factor, rank: usize) {
        match factor {
            Factor::TangibleBook => self.tangible_book = rank,
            Factor::Revenue => self.revenue = rank,
            Factor::OperatingIncome => self.operating_income = rank,
            Factor::Dividends => self.dividends = rank,
        }
    }

    pub fn composite(&self, weights: &FactorWeights) -> f64 {
        Factor::ALL
            .iter()
            .map(|&f| weights.weight(f) * self.get(f) as f64)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredInstrument {
    pub symbol: String,
    pub ranks: FactorRanks,
    pub composite: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FineSelector {
    pub num_long: usize,
    pub weights: FactorWeights,
    pub exchanges: Vec<String>,
    pub score_order: ScoreOrder,
}

impl Default for FineSelector {
    fn default() -> Self {
        FineSelector {
            num_long: DEFAULT_NUM_LONG,
            weights: FactorWeights::default(),
            exchanges: DEFAULT_EXCHANGES.iter().map(|e| e.to_string()).collect(),
            score_order: ScoreOrder::default(),
        }
    }
}

impl FineSelector {
    /// Candidates with all four factors present, listed on an accepted exchange.
    /// The first occurrence of a repeated symbol wins.
    pub fn eligible<'a>(&self, candidates: &'a [FineCandidate]) -> Vec<&'a FineCandidate> {
        let mut seen = HashSet::new();
        candidates
            .iter()
            .filter(|c| c.fundamentals.has_all_factors())
            .filter(|c| {
                self.exchanges
                    .iter()
                    .any(|e| *e == c.fundamentals.primary_exchange)
            })
            .filter(|c| seen.insert(c.symbol.as_str()))
            .collect()
    }

    /// Rank table for the eligible candidates, listed in tangible-book rank order.
    pub fn score(&self, candidates: &[FineCandidate]) -> Vec<ScoredInstrument> {
        let eligible = self.eligible(candidates);
        let mut ranks = vec![FactorRanks::default(); eligible.len()];
        let mut tv_order = Vec::new();

        for factor in Factor::ALL {
            let order = descending_order(&eligible, factor);
            for (rank, &idx) in order.iter().enumerate() {
                ranks[idx].set(factor, rank);
            }
            if factor == Factor::TangibleBook {
                tv_order = order;
            }
        }

        tv_order
            .into_iter()
            .map(|idx| ScoredInstrument {
                symbol: eligible[idx].symbol.clone(),
                ranks: ranks[idx],
                composite: ranks[idx].composite(&self.weights),
            })
            .collect()
    }

    /// Full scored list in basket-selection order.
    pub fn rank(&self, candidates: &[FineCandidate]) -> Vec<ScoredInstrument> {
        let mut scored = self.score(candidates);
        match self.score_order {
            ScoreOrder::Descending => scored.sort_by(|a, b| b.composite.total_cmp(&a.composite)),
            ScoreOrder::Ascending => scored.sort_by(|a, b| a.composite.total_cmp(&b.composite)),
        }
        scored
    }

    /// The next long basket: the first `num_long` symbols of [`FineSelector::rank`].
    pub fn select(&self, candidates: &[FineCandidate]) -> Vec<String> {
        self.rank(candidates)
            .into_iter()
            .take(self.num_long)
            .map(|s| s.symbol)
            .collect()
    }
}

/// Indices into `eligible`, stably sorted by descending `factor` value.
fn descending_order(eligible: &[&FineCandidate], factor: Factor) -> Vec<usize> {
    let value = |i: usize| eligible[i].fundamentals.value(factor).unwrap_or(f64::NEG_INFINITY);
    let mut order: Vec<usize> = (0..eligible.len()).collect();
    order.sort_by(|&a, &b| value(b).total_cmp(&value(a)));
    order
}
