//! Daily event loop driving the strategy over historical snapshots.

use chrono::NaiveDate;
use log::{info, warn};

use super::error::FundexError;
use super::execution::PaperBroker;
use super::portfolio::Portfolio;
use super::strategy::{FactorStrategy, StrategyConfig, StrategyState, TickAction, TickReport};
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub risk_free_rate: f64,
}

/// A tick on which something happened.
#[derive(Debug, Clone, PartialEq)]
pub struct TickEvent {
    pub date: NaiveDate,
    pub equity: f64,
    pub report: TickReport,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub portfolio: Portfolio,
    pub events: Vec<TickEvent>,
    pub final_state: StrategyState,
    pub skipped_ticks: usize,
}

impl BacktestResult {
    pub fn rebalance_count(&self) -> usize {
        self.count(|a| matches!(a, TickAction::Rebalanced { .. }))
    }

    pub fn defensive_count(&self) -> usize {
        self.count(|a| matches!(a, TickAction::Defensive { .. }))
    }

    fn count(&self, pred: impl Fn(&TickAction) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.report.action)).count()
    }
}

pub fn run_backtest(
    data: &dyn DataPort,
    strategy_config: &StrategyConfig,
    config: &BacktestConfig,
) -> Result<BacktestResult, FundexError> {
    let timeline: Vec<NaiveDate> = data
        .snapshot_dates()?
        .into_iter()
        .filter(|d| *d >= config.start_date && *d <= config.end_date)
        .collect();
    if timeline.is_empty() {
        return Err(FundexError::NoData {
            start: config.start_date,
            end: config.end_date,
        });
    }

    let mut strategy = FactorStrategy::new(strategy_config.clone(), config.start_date);
    let mut broker = PaperBroker::new(config.initial_capital, config.start_date);
    let mut events = Vec::new();
    let mut skipped_ticks = 0;

    for &date in &timeline {
        let universe = match data.fetch_universe_snapshot(date) {
            Ok(u) => u,
            Err(e) => {
                warn!("skipping {}: {}", date, e);
                skipped_ticks += 1;
                continue;
            }
        };
        broker.mark(date, &universe);

        if let Err(e) = strategy.select_universe(date, &universe, data) {
            warn!("skipping {}: {}", date, e);
            skipped_ticks += 1;
            continue;
        }

        let report = strategy.on_tick(date, &mut broker);
        let equity = broker.record_equity();
        if !report.is_quiet() {
            events.push(TickEvent {
                date,
                equity,
                report,
            });
        }
    }

    info!(
        "backtest finished: {} ticks, {} events, {} skipped",
        timeline.len(),
        events.len(),
        skipped_ticks
    );

    Ok(BacktestResult {
        portfolio: broker.into_portfolio(),
        events,
        final_state: strategy.state().clone(),
        skipped_ticks,
    })
}
