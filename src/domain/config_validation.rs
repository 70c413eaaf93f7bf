//! Configuration validation.
//!
//! Validates every recognised key before a backtest runs. Absent optional keys take
//! their defaults and always pass.

use crate::domain::error::FundexError;
use crate::domain::ranking::ScoreOrder;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), FundexError> {
    validate_initial_capital(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), FundexError> {
    validate_at_least_one(config, "universe", "num_coarse")?;
    validate_min_price(config)?;
    validate_exchanges(config)?;
    validate_at_least_one(config, "selection", "num_long")?;
    validate_factor_weights(config)?;
    validate_score_order(config)?;
    validate_at_least_one(config, "schedule", "rebalance_days")?;
    validate_max_drawdown(config)?;
    validate_defensive_sleeve(config)?;
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), FundexError> {
    let value = parse_double(config, "backtest", "initial_capital", 100_000.0)?;
    if !(value > 0.0) {
        return Err(FundexError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), FundexError> {
    let value = parse_double(config, "backtest", "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&value) {
        return Err(FundexError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), FundexError> {
    let start_date = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(FundexError::invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, FundexError> {
    match value {
        None => Err(FundexError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            FundexError::invalid(
                "backtest",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

/// The value of an optional float key. Present but unparseable is an error rather than
/// a silent fallback to `default`.
fn parse_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, FundexError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            FundexError::invalid(section, key, format!("{key} must be a number, got '{raw}'"))
        }),
    }
}

fn validate_at_least_one(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), FundexError> {
    if config.get_string(section, key).is_none() {
        return Ok(());
    }
    let value = config.get_int(section, key, 0);
    if value < 1 {
        return Err(FundexError::invalid(
            section,
            key,
            format!("{key} must be an integer of at least 1"),
        ));
    }
    Ok(())
}

fn validate_min_price(config: &dyn ConfigPort) -> Result<(), FundexError> {
    let value = parse_double(config, "universe", "min_price", 0.0)?;
    if !(value >= 0.0) {
        return Err(FundexError::invalid(
            "universe",
            "min_price",
            "min_price must be non-negative",
        ));
    }
    Ok(())
}

fn validate_exchanges(config: &dyn ConfigPort) -> Result<(), FundexError> {
    match config.get_list("universe", "exchanges") {
        Some(list) if list.is_empty() => Err(FundexError::invalid(
            "universe",
            "exchanges",
            "at least one exchange is required",
        )),
        _ => Ok(()),
    }
}

pub const WEIGHT_KEYS: [&str; 4] = [
    "beta_tangible_book",
    "beta_revenue",
    "beta_operating_income",
    "beta_dividends",
];

fn validate_factor_weights(config: &dyn ConfigPort) -> Result<(), FundexError> {
    for key in WEIGHT_KEYS {
        let value = parse_double(config, "selection", key, 1.0)?;
        if !(value >= 0.0) || !value.is_finite() {
            return Err(FundexError::invalid(
                "selection",
                key,
                format!("{key} must be a non-negative number"),
            ));
        }
    }
    Ok(())
}

fn validate_score_order(config: &dyn ConfigPort) -> Result<(), FundexError> {
    if let Some(raw) = config.get_string("selection", "score_order") {
        raw.parse::<ScoreOrder>()
            .map_err(|reason| FundexError::invalid("selection", "score_order", reason))?;
    }
    Ok(())
}

fn validate_max_drawdown(config: &dyn ConfigPort) -> Result<(), FundexError> {
    let value = parse_double(config, "risk", "max_drawdown", -0.15)?;
    if !(value > -1.0 && value < 0.0) {
        return Err(FundexError::invalid(
            "risk",
            "max_drawdown",
            "max_drawdown must be between -1 and 0 (exclusive)",
        ));
    }
    Ok(())
}

fn validate_defensive_sleeve(config: &dyn ConfigPort) -> Result<(), FundexError> {
    let symbols = config.get_list("risk", "defensive_symbols");
    let weights = config.get_list("risk", "defensive_weights");

    if let Some(ref symbols) = symbols {
        if symbols.is_empty() {
            return Err(FundexError::invalid(
                "risk",
                "defensive_symbols",
                "at least one defensive symbol is required",
            ));
        }
    }

    let Some(weights) = weights else {
        return Ok(());
    };
    let expected = symbols.as_ref().map_or(2, |s| s.len());
    if weights.len() != expected {
        return Err(FundexError::invalid(
            "risk",
            "defensive_weights",
            format!("expected {} weights, got {}", expected, weights.len()),
        ));
    }

    let mut total = 0.0;
    for raw in &weights {
        let w: f64 = raw.parse().map_err(|_| {
            FundexError::invalid("risk", "defensive_weights", format!("invalid weight '{raw}'"))
        })?;
        if !(w >= 0.0) {
            return Err(FundexError::invalid(
                "risk",
                "defensive_weights",
                "weights must be non-negative",
            ));
        }
        total += w;
    }
    if total > 1.0 + 1e-9 {
        return Err(FundexError::invalid(
            "risk",
            "defensive_weights",
            format!("weights sum to {total}, must not exceed 1"),
        ));
    }
    Ok(())
}
