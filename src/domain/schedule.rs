//! Calendar rebalance scheduler.

use chrono::{Duration, NaiveDate};

use super::basket::LongBasket;
use super::instrument::Holding;

pub const DEFAULT_REBALANCE_DAYS: i64 = 360;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePhase {
    Waiting,
    Due,
}

/// What the scheduler wants to do on a tick once the guard has passed.
#[derive(Debug, Clone, PartialEq)]
pub enum RebalancePlan {
    /// Before the next rebalance date.
    Wait,
    /// Due, but nothing is staged. The deadline stays where it is.
    Defer,
    /// Due with a staged basket.
    Allocate(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceScheduler {
    next_rebalance: NaiveDate,
    cadence_days: i64,
}

impl RebalanceScheduler {
    /// The first rebalance is due on `start`. `cadence_days` below one is clamped to one.
    pub fn new(start: NaiveDate, cadence_days: i64) -> Self {
        RebalanceScheduler {
            next_rebalance: start,
            cadence_days: cadence_days.max(1),
        }
    }

    pub fn next_rebalance(&self) -> NaiveDate {
        self.next_rebalance
    }

    pub fn cadence_days(&self) -> i64 {
        self.cadence_days
    }

    pub fn phase(&self, now: NaiveDate) -> SchedulePhase {
        if now >= self.next_rebalance {
            SchedulePhase::Due
        } else {
            SchedulePhase::Waiting
        }
    }

    /// Invested holdings whose symbol is not in the basket. Empty while waiting.
    pub fn stale_holdings(
        &self,
        now: NaiveDate,
        holdings: &[Holding],
        basket: &LongBasket,
    ) -> Vec<String> {
        if self.phase(now) == SchedulePhase::Waiting {
            return Vec::new();
        }
        holdings
            .iter()
            .filter(|h| h.is_invested() && !basket.contains(&h.symbol))
            .map(|h| h.symbol.clone())
            .collect()
    }

    pub fn plan(&self, now: NaiveDate, basket: &LongBasket) -> RebalancePlan {
        match self.phase(now) {
            SchedulePhase::Waiting => RebalancePlan::Wait,
            SchedulePhase::Due if basket.is_empty() => RebalancePlan::Defer,
            SchedulePhase::Due => RebalancePlan::Allocate(basket.symbols().to_vec()),
        }
    }

    /// `Due -> Waiting`: moves the deadline to `now + cadence` and consumes the basket.
    pub fn complete(&mut self, now: NaiveDate, basket: &mut LongBasket) {
        self.next_rebalance = now + Duration::days(self.cadence_days);
        basket.consume();
    }
}
