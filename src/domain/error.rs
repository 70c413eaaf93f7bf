//! Domain error types.
//!
//! Ranking, scheduling and the drawdown guard never fail; errors only arise at the
//! collaborator boundary (data, broker) and while loading configuration.

use chrono::NaiveDate;

/// Top-level error type for fundex.
#[derive(Debug, thiserror::Error)]
pub enum FundexError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no universe snapshots between {start} and {end}")]
    NoData { start: NaiveDate, end: NaiveDate },

    #[error("no universe snapshot for {date}")]
    NoSnapshot { date: NaiveDate },

    #[error("no price for {symbol}")]
    NoPrice { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FundexError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        FundexError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn data(reason: impl Into<String>) -> Self {
        FundexError::Data {
            reason: reason.into(),
        }
    }
}

impl From<&FundexError> for std::process::ExitCode {
    fn from(err: &FundexError) -> Self {
        let code: u8 = match err {
            FundexError::Io(_) => 1,
            FundexError::ConfigParse { .. }
            | FundexError::ConfigMissing { .. }
            | FundexError::ConfigInvalid { .. } => 2,
            FundexError::Data { .. } | FundexError::NoPrice { .. } => 3,
            FundexError::NoData { .. } | FundexError::NoSnapshot { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
