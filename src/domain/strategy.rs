//! Strategy configuration, owned state and the per-tick controller.
//!
//! Each tick runs two independent state machines in a fixed priority order:
//! the scheduler's liquidation pass, then the drawdown guard, then the scheduler's
//! allocation. A guard breach ends the tick before allocation.

use chrono::NaiveDate;
use log::{debug, info, warn};

use super::allocator::{self, DefensiveSleeve, TargetWeight};
use super::basket::LongBasket;
use super::coarse::{CoarseFilter, CoarseSelection};
use super::drawdown::{DEFAULT_MAX_DRAWDOWN, DrawdownGuard, GuardSignal};
use super::error::FundexError;
use super::instrument::{FineCandidate, InstrumentSummary};
use super::ranking::FineSelector;
use super::schedule::{DEFAULT_REBALANCE_DAYS, RebalancePlan, RebalanceScheduler};
use crate::ports::broker_port::BrokerPort;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub name: String,
    pub coarse: CoarseFilter,
    pub fine: FineSelector,
    pub rebalance_days: i64,
    pub max_drawdown: f64,
    pub defensive: DefensiveSleeve,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            name: "Fundamental Indexation".to_string(),
            coarse: CoarseFilter::default(),
            fine: FineSelector::default(),
            rebalance_days: DEFAULT_REBALANCE_DAYS,
            max_drawdown: DEFAULT_MAX_DRAWDOWN,
            defensive: DefensiveSleeve::default(),
        }
    }
}

/// Mutable state shared by the selection and tick stages.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyState {
    pub basket: LongBasket,
    pub scheduler: RebalanceScheduler,
    pub guard: DrawdownGuard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    Unchanged,
    Selected { coarse: usize, basket: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickAction {
    Idle,
    /// Rebalance due but no basket staged.
    Deferred,
    Rebalanced { targets: Vec<TargetWeight> },
    Defensive { drawdown: f64, targets: Vec<TargetWeight> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub liquidated: Vec<String>,
    pub action: TickAction,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.liquidated.is_empty() && self.action == TickAction::Idle
    }
}

pub struct FactorStrategy {
    config: StrategyConfig,
    state: StrategyState,
}

impl FactorStrategy {
    /// The first rebalance is due on `start`.
    pub fn new(config: StrategyConfig, start: NaiveDate) -> Self {
        let state = StrategyState {
            basket: LongBasket::default(),
            scheduler: RebalanceScheduler::new(start, config.rebalance_days),
            guard: DrawdownGuard::new(config.max_drawdown),
        };
        FactorStrategy { config, state }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    /// Coarse filter, fundamentals lookup and fine ranking. Stages the resulting basket
    /// when a rebalance is due; leaves everything untouched otherwise.
    pub fn select_universe(
        &mut self,
        now: NaiveDate,
        universe: &[InstrumentSummary],
        data: &dyn DataPort,
    ) -> Result<SelectionOutcome, FundexError> {
        let next = self.state.scheduler.next_rebalance();
        let symbols = match self.config.coarse.select(now, next, universe) {
            CoarseSelection::Unchanged => return Ok(SelectionOutcome::Unchanged),
            CoarseSelection::Selected(symbols) => symbols,
        };

        let candidates = fine_candidates(now, &symbols, data)?;
        let basket = self.config.fine.select(&candidates);
        info!(
            "{}: coarse {} of {}, fine {} candidates, staged {} symbols",
            now,
            symbols.len(),
            universe.len(),
            candidates.len(),
            basket.len()
        );
        self.state.basket.stage(basket.clone());

        Ok(SelectionOutcome::Selected {
            coarse: symbols.len(),
            basket,
        })
    }

    pub fn on_tick(&mut self, now: NaiveDate, broker: &mut dyn BrokerPort) -> TickReport {
        let mut liquidated = self.liquidate_stale(now, broker);

        let value = broker.total_portfolio_value();
        if let GuardSignal::Breach { drawdown, .. } = self.state.guard.observe(value) {
            liquidated.extend(self.liquidate_all(broker));
            let targets = allocator::apply(&self.config.defensive.targets(), broker);
            info!("{}: defensive allocation {:?}", now, targets);
            return TickReport {
                liquidated,
                action: TickAction::Defensive { drawdown, targets },
            };
        }

        let action = match self.state.scheduler.plan(now, &self.state.basket) {
            RebalancePlan::Wait => TickAction::Idle,
            RebalancePlan::Defer => {
                debug!("{}: rebalance due but basket is empty", now);
                TickAction::Deferred
            }
            RebalancePlan::Allocate(symbols) => {
                let targets = allocator::apply(&allocator::equal_weight(&symbols), broker);
                self.state.scheduler.complete(now, &mut self.state.basket);
                info!(
                    "{}: rebalanced into {} symbols, next rebalance {}",
                    now,
                    targets.len(),
                    self.state.scheduler.next_rebalance()
                );
                TickAction::Rebalanced { targets }
            }
        };

        TickReport { liquidated, action }
    }

    fn liquidate_stale(&self, now: NaiveDate, broker: &mut dyn BrokerPort) -> Vec<String> {
        let stale =
            self.state
                .scheduler
                .stale_holdings(now, &broker.holdings(), &self.state.basket);
        stale
            .into_iter()
            .filter(|symbol| match broker.liquidate(Some(symbol.as_str())) {
                Ok(()) => true,
                Err(e) => {
                    warn!("liquidate {} failed: {}", symbol, e);
                    false
                }
            })
            .collect()
    }

    fn liquidate_all(&self, broker: &mut dyn BrokerPort) -> Vec<String> {
        let invested: Vec<String> = broker
            .holdings()
            .into_iter()
            .filter(|h| h.is_invested())
            .map(|h| h.symbol)
            .collect();
        if let Err(e) = broker.liquidate(None) {
            warn!("full liquidation incomplete: {}", e);
        }
        invested
    }
}

/// Joins coarse symbols with their fundamentals, keeping coarse order. Symbols the
/// data port knows nothing about are dropped.
pub(crate) fn fine_candidates(
    now: NaiveDate,
    symbols: &[String],
    data: &dyn DataPort,
) -> Result<Vec<FineCandidate>, FundexError> {
    let mut bundles = data.fetch_fundamentals(now, symbols)?;
    Ok(symbols
        .iter()
        .filter_map(|symbol| {
            bundles.remove(symbol).map(|fundamentals| FineCandidate {
                symbol: symbol.clone(),
                fundamentals,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::{FundamentalBundle, Holding};
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct StaticData {
        bundles: HashMap<String, FundamentalBundle>,
    }

    impl DataPort for StaticData {
        fn snapshot_dates(&self) -> Result<Vec<NaiveDate>, FundexError> {
            Ok(Vec::new())
        }

        fn fetch_universe_snapshot(
            &self,
            date: NaiveDate,
        ) -> Result<Vec<InstrumentSummary>, FundexError> {
            Err(FundexError::NoSnapshot { date })
        }

        fn fetch_fundamentals(
            &self,
            _date: NaiveDate,
            symbols: &[String],
        ) -> Result<HashMap<String, FundamentalBundle>, FundexError> {
            Ok(symbols
                .iter()
                .filter_map(|s| self.bundles.get(s).map(|b| (s.clone(), b.clone())))
                .collect())
        }
    }

    /// Broker with a settable value that records every call.
    #[derive(Default)]
    struct ScriptedBroker {
        value: f64,
        holdings: Vec<Holding>,
        calls: Vec<String>,
    }

    impl BrokerPort for ScriptedBroker {
        fn holdings(&self) -> Vec<Holding> {
            self.holdings.clone()
        }

        fn total_portfolio_value(&self) -> f64 {
            self.value
        }

        fn liquidate(&mut self, symbol: Option<&str>) -> Result<(), FundexError> {
            match symbol {
                Some(s) => {
                    self.holdings.retain(|h| h.symbol != s);
                    self.calls.push(format!("liquidate {s}"));
                }
                None => {
                    self.holdings.clear();
                    self.calls.push("liquidate all".to_string());
                }
            }
            Ok(())
        }

        fn set_holdings(&mut self, symbol: &str, target_weight: f64) -> Result<(), FundexError> {
            self.calls.push(format!("set {symbol} {target_weight}"));
            Ok(())
        }
    }

    fn bundle(v: f64) -> FundamentalBundle {
        FundamentalBundle {
            tangible_book_value: Some(v),
            total_revenue: Some(v),
            operating_income: Some(v),
            dividends_paid: Some(v),
            primary_exchange: "NAS".into(),
        }
    }

    fn summary(symbol: &str, dollar_volume: f64) -> InstrumentSummary {
        InstrumentSummary {
            symbol: symbol.into(),
            price: 20.0,
            dollar_volume,
            has_fundamental_data: true,
        }
    }

    fn strategy(num_long: usize) -> FactorStrategy {
        let mut config = StrategyConfig::default();
        config.fine.num_long = num_long;
        config.rebalance_days = 30;
        FactorStrategy::new(config, date(2020, 1, 1))
    }

    #[test]
    fn selection_stages_basket_when_due() {
        let data = StaticData {
            bundles: [("AAA", 3.0), ("BBB", 2.0), ("CCC", 1.0)]
                .iter()
                .map(|(s, v)| (s.to_string(), bundle(*v)))
                .collect(),
        };
        let universe = vec![summary("AAA", 3.0), summary("BBB", 2.0), summary("CCC", 1.0)];
        let mut s = strategy(2);
        let outcome = s.select_universe(date(2020, 1, 1), &universe, &data).unwrap();
        assert_eq!(
            outcome,
            SelectionOutcome::Selected {
                coarse: 3,
                basket: vec!["CCC".into(), "BBB".into()],
            }
        );
        assert_eq!(s.state().basket.len(), 2);
    }

    #[test]
    fn selection_unchanged_while_waiting() {
        let data = StaticData {
            bundles: HashMap::new(),
        };
        let mut s = strategy(2);
        let outcome = s
            .select_universe(date(2019, 12, 31), &[summary("AAA", 1.0)], &data)
            .unwrap();
        assert_eq!(outcome, SelectionOutcome::Unchanged);
    }

    #[test]
    fn symbols_without_fundamentals_are_dropped() {
        let data = StaticData {
            bundles: [("AAA".to_string(), bundle(1.0))].into_iter().collect(),
        };
        let mut s = strategy(5);
        let universe = vec![summary("AAA", 2.0), summary("ZZZ", 1.0)];
        s.select_universe(date(2020, 1, 1), &universe, &data).unwrap();
        assert_eq!(s.state().basket.symbols(), &["AAA".to_string()]);
    }

    #[test]
    fn due_tick_rebalances_and_advances() {
        let mut s = strategy(2);
        s.state.basket.stage(vec!["AAA".into(), "BBB".into()]);
        let mut broker = ScriptedBroker {
            value: 1000.0,
            holdings: vec![Holding {
                symbol: "OLD".into(),
                quantity: 3,
                market_value: 30.0,
            }],
            ..ScriptedBroker::default()
        };
        let report = s.on_tick(date(2020, 1, 1), &mut broker);
        assert_eq!(report.liquidated, vec!["OLD"]);
        assert!(
            matches!(report.action, TickAction::Rebalanced { ref targets } if targets.len() == 2)
        );
        assert_eq!(
            broker.calls,
            vec!["liquidate OLD", "set AAA 0.5", "set BBB 0.5"]
        );
        assert_eq!(s.state().scheduler.next_rebalance(), date(2020, 1, 31));
        assert!(s.state().basket.is_empty());
    }

    #[test]
    fn repeated_due_tick_defers_after_consumption() {
        let mut s = strategy(2);
        s.state.basket.stage(vec!["AAA".into()]);
        let mut broker = ScriptedBroker {
            value: 1000.0,
            ..ScriptedBroker::default()
        };
        s.on_tick(date(2020, 1, 1), &mut broker);
        let report = s.on_tick(date(2020, 1, 2), &mut broker);
        assert_eq!(report.action, TickAction::Idle);
    }

    #[test]
    fn breach_preempts_rebalance() {
        let mut s = strategy(2);
        let mut broker = ScriptedBroker {
            value: 100.0,
            ..ScriptedBroker::default()
        };
        s.on_tick(date(2019, 12, 1), &mut broker);
        s.state.basket.stage(vec!["AAA".into()]);
        broker.value = 80.0;
        broker.holdings = vec![Holding {
            symbol: "AAA".into(),
            quantity: 10,
            market_value: 80.0,
        }];

        let report = s.on_tick(date(2020, 1, 1), &mut broker);
        assert!(matches!(report.action, TickAction::Defensive { .. }));
        assert_eq!(report.liquidated, vec!["AAA"]);
        assert_eq!(
            broker.calls,
            vec!["liquidate all", "set TLT 0.5", "set SHY 0.5"]
        );
        assert_eq!(s.state().scheduler.next_rebalance(), date(2020, 1, 1));
        assert_eq!(s.state().basket.len(), 1);
        assert_eq!(s.state().guard.high_water_mark(), 0.0);
    }

    #[test]
    fn quiet_report() {
        let mut s = strategy(2);
        let mut broker = ScriptedBroker {
            value: 100.0,
            ..ScriptedBroker::default()
        };
        let report = s.on_tick(date(2019, 6, 1), &mut broker);
        assert!(report.is_quiet());
    }
}
