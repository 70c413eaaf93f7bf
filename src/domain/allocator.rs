//! Target-weight allocation for the risky basket and the defensive bond sleeve.

use log::warn;
use std::collections::HashMap;

use crate::ports::broker_port::BrokerPort;

#[derive(Debug, Clone, PartialEq)]
pub struct TargetWeight {
    pub symbol: String,
    pub weight: f64,
}

impl TargetWeight {
    pub fn new(symbol: impl Into<String>, weight: f64) -> Self {
        TargetWeight {
            symbol: symbol.into(),
            weight,
        }
    }
}

/// Fixed bond allocation used while the drawdown guard has fired.
#[derive(Debug, Clone, PartialEq)]
pub struct DefensiveSleeve {
    pub legs: Vec<TargetWeight>,
}

impl Default for DefensiveSleeve {
    /// Half long-duration treasuries (TLT), half short-duration treasuries (SHY).
    fn default() -> Self {
        DefensiveSleeve {
            legs: vec![TargetWeight::new("TLT", 0.5), TargetWeight::new("SHY", 0.5)],
        }
    }
}

impl DefensiveSleeve {
    pub fn targets(&self) -> Vec<TargetWeight> {
        self.legs.clone()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.legs.iter().map(|l| l.symbol.as_str())
    }
}

/// `1 / n` for each of `n` symbols.
pub fn equal_weight(symbols: &[String]) -> Vec<TargetWeight> {
    if symbols.is_empty() {
        return Vec::new();
    }
    let weight = 1.0 / symbols.len() as f64;
    symbols
        .iter()
        .map(|s| TargetWeight::new(s.clone(), weight))
        .collect()
}

/// Issues `set_holdings` for each target. Legs that shrink an existing position go
/// first so their sale proceeds can fund the legs that grow; order is otherwise kept.
/// A rejected leg is logged and skipped; the returned list holds the targets the broker
/// accepted, in the order they were issued.
pub fn apply(targets: &[TargetWeight], broker: &mut dyn BrokerPort) -> Vec<TargetWeight> {
    let total = broker.total_portfolio_value();
    let current: HashMap<String, f64> = broker
        .holdings()
        .into_iter()
        .map(|h| (h.symbol, h.market_value))
        .collect();
    let shrinks = |t: &TargetWeight| {
        total > 0.0
            && current
                .get(&t.symbol)
                .is_some_and(|value| value / total > t.weight)
    };
    let (sells, buys): (Vec<&TargetWeight>, Vec<&TargetWeight>) =
        targets.iter().partition(|t| shrinks(t));

    let mut applied = Vec::with_capacity(targets.len());
    for target in sells.into_iter().chain(buys) {
        match broker.set_holdings(&target.symbol, target.weight) {
            Ok(()) => applied.push(target.clone()),
            Err(e) => warn!(
                "set_holdings {} {:.4} rejected: {}",
                target.symbol, target.weight, e
            ),
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::FundexError;
    use crate::domain::execution::PaperBroker;
    use crate::domain::instrument::Holding;

    #[derive(Default)]
    struct Recorder {
        holdings: Vec<Holding>,
        value: f64,
        calls: Vec<(String, f64)>,
    }

    impl BrokerPort for Recorder {
        fn holdings(&self) -> Vec<Holding> {
            self.holdings.clone()
        }

        fn total_portfolio_value(&self) -> f64 {
            self.value
        }

        fn liquidate(&mut self, _symbol: Option<&str>) -> Result<(), FundexError> {
            Ok(())
        }

        fn set_holdings(&mut self, symbol: &str, target_weight: f64) -> Result<(), FundexError> {
            if symbol == "BAD" {
                return Err(FundexError::NoPrice {
                    symbol: symbol.into(),
                });
            }
            self.calls.push((symbol.to_string(), target_weight));
            Ok(())
        }
    }

    #[test]
    fn equal_weight_splits_evenly() {
        let symbols: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let targets = equal_weight(&symbols);
        assert_eq!(targets.len(), 4);
        assert!(targets.iter().all(|t| (t.weight - 0.25).abs() < f64::EPSILON));
    }

    #[test]
    fn equal_weight_empty() {
        assert!(equal_weight(&[]).is_empty());
    }

    #[test]
    fn default_sleeve_is_half_and_half() {
        let sleeve = DefensiveSleeve::default();
        assert_eq!(sleeve.symbols().collect::<Vec<_>>(), vec!["TLT", "SHY"]);
        assert_eq!(sleeve.targets().iter().map(|t| t.weight).sum::<f64>(), 1.0);
    }

    #[test]
    fn apply_continues_past_rejected_leg() {
        let mut broker = Recorder::default();
        let targets = vec![
            TargetWeight::new("A", 0.5),
            TargetWeight::new("BAD", 0.25),
            TargetWeight::new("C", 0.25),
        ];
        let applied = apply(&targets, &mut broker);
        assert_eq!(applied.len(), 2);
        assert_eq!(
            broker.calls,
            vec![("A".to_string(), 0.5), ("C".to_string(), 0.25)]
        );
    }

    #[test]
    fn shrinking_legs_are_issued_first() {
        let mut broker = Recorder {
            holdings: vec![
                Holding {
                    symbol: "KEEP".into(),
                    quantity: 80,
                    market_value: 800.0,
                },
                Holding {
                    symbol: "TRIM".into(),
                    quantity: 20,
                    market_value: 200.0,
                },
            ],
            value: 1000.0,
            ..Recorder::default()
        };
        let targets = vec![
            TargetWeight::new("NEW", 1.0 / 3.0),
            TargetWeight::new("TRIM", 1.0 / 3.0),
            TargetWeight::new("KEEP", 1.0 / 3.0),
        ];
        let applied = apply(&targets, &mut broker);
        let order: Vec<&str> = broker.calls.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["KEEP", "NEW", "TRIM"]);
        assert_eq!(applied.len(), 3);
    }

    #[test]
    fn rotation_into_new_name_is_fully_funded() {
        let date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let mut broker = PaperBroker::new(10_000.0, date);
        broker.set_price("AAA", 10.0);
        broker.set_price("BBB", 10.0);
        apply(&[TargetWeight::new("AAA", 1.0)], &mut broker);
        assert_eq!(broker.portfolio().quantity("AAA"), 1000);

        apply(&equal_weight(&["BBB".into(), "AAA".into()]), &mut broker);

        assert_eq!(broker.portfolio().quantity("AAA"), 500);
        assert_eq!(broker.portfolio().quantity("BBB"), 500);
        assert!(broker.portfolio().cash.abs() < 1e-9);
    }
}
