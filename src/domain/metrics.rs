//! Performance metrics for a finished backtest.

use super::backtest::BacktestResult;
use super::portfolio::EquityPoint;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    pub rebalances: usize,
    pub defensive_triggers: usize,
    pub final_equity: f64,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, risk_free_rate: f64) -> Self {
        let equity_curve = &result.portfolio.equity_curve;
        let initial_capital = result.portfolio.initial_capital;

        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = equity_curve.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(equity_curve, daily_rf);

        Metrics {
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            rebalances: result.rebalance_count(),
            defensive_triggers: result.defensive_count(),
            final_equity,
        }
    }
}

/// Largest peak-to-trough decline as a positive fraction, and the longest run of
/// observations spent below a previous peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, i64) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut underwater = 0i64;
    let mut max_underwater = 0i64;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            underwater = 0;
            continue;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
        underwater += 1;
        max_underwater = max_underwater.max(underwater);
    }

    (max_dd, max_underwater)
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint], daily_rf: f64) -> (f64, f64) {
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    if returns.is_empty() {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let stddev = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
    let excess = mean - daily_rf;
    let annualize = TRADING_DAYS_PER_YEAR.sqrt();

    let sharpe = if stddev > 0.0 {
        excess / stddev * annualize
    } else {
        0.0
    };

    let downside = (returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    let sortino = if downside > 0.0 {
        excess / downside * annualize
    } else {
        0.0
    };

    (sharpe, sortino)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::basket::LongBasket;
    use crate::domain::drawdown::DrawdownGuard;
    use crate::domain::portfolio::Portfolio;
    use crate::domain::schedule::RebalanceScheduler;
    use crate::domain::strategy::StrategyState;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_result(values: &[f64]) -> BacktestResult {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut portfolio = Portfolio::new(values.first().copied().unwrap_or(100_000.0));
        for (i, &v) in values.iter().enumerate() {
            portfolio.record_equity(start + chrono::Duration::days(i as i64), v);
        }
        BacktestResult {
            portfolio,
            events: Vec::new(),
            final_state: StrategyState {
                basket: LongBasket::Empty,
                scheduler: RebalanceScheduler::new(start, 360),
                guard: DrawdownGuard::default(),
            },
            skipped_ticks: 0,
        }
    }

    #[test]
    fn empty_curve() {
        let m = Metrics::compute(&make_result(&[]), 0.0);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.rebalances, 0);
    }

    #[test]
    fn total_return() {
        let m = Metrics::compute(&make_result(&[100.0, 105.0, 110.0]), 0.0);
        assert_relative_eq!(m.total_return, 0.1, epsilon = 1e-12);
        assert_relative_eq!(m.final_equity, 110.0);
    }

    #[test]
    fn max_drawdown_and_duration() {
        let m = Metrics::compute(&make_result(&[100.0, 120.0, 90.0, 96.0, 130.0, 125.0]), 0.0);
        assert_relative_eq!(m.max_drawdown, 0.25, epsilon = 1e-12);
        assert_eq!(m.max_drawdown_duration, 2);
    }

    #[test]
    fn sharpe_positive_for_rising_curve() {
        let m = Metrics::compute(&make_result(&[100.0, 101.0, 103.0, 104.0, 107.0]), 0.0);
        assert!(m.sharpe_ratio > 0.0);
        assert_eq!(m.sortino_ratio, 0.0);
    }

    #[test]
    fn sortino_negative_for_falling_curve() {
        let m = Metrics::compute(&make_result(&[100.0, 99.0, 97.0, 98.0, 95.0]), 0.0);
        assert!(m.sortino_ratio < 0.0);
    }
}
