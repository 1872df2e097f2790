//! Domain error types.

use chrono::{DateTime, Utc};

/// Top-level error type for trademan.
#[derive(Debug, thiserror::Error)]
pub enum TrademanError {
    #[error("invalid bar at {timestamp}: {reason}")]
    InvalidBar {
        timestamp: DateTime<Utc>,
        reason: String,
    },

    #[error("bars out of order at {timestamp}: timestamps must be strictly increasing")]
    UnorderedSeries { timestamp: DateTime<Utc> },

    #[error("insufficient data for {asset}: have {bars} bars, need {minimum}")]
    InsufficientData {
        asset: String,
        bars: usize,
        minimum: usize,
    },

    #[error("unknown indicator: {name}")]
    UnknownIndicator { name: String },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("strategy already registered: {name}")]
    DuplicateStrategy { name: String },

    #[error("indicator {indicator} is misaligned: expected {expected} points, got {actual}")]
    MisalignedIndicators {
        indicator: String,
        expected: usize,
        actual: usize,
    },

    #[error("asset not found: {asset}")]
    AssetNotFound { asset: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("store error: {reason}")]
    Store { reason: String },

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

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrademanError {
    pub(crate) fn invalid_bar(timestamp: DateTime<Utc>, reason: impl Into<String>) -> Self {
        TrademanError::InvalidBar {
            timestamp,
            reason: reason.into(),
        }
    }

    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TrademanError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TrademanError> for std::process::ExitCode {
    fn from(err: &TrademanError) -> Self {
        let code: u8 = match err {
            TrademanError::Io(_) | TrademanError::Json(_) => 1,
            TrademanError::ConfigParse { .. }
            | TrademanError::ConfigMissing { .. }
            | TrademanError::ConfigInvalid { .. } => 2,
            TrademanError::Data { .. }
            | TrademanError::Store { .. }
            | TrademanError::AssetNotFound { .. } => 3,
            TrademanError::UnknownIndicator { .. }
            | TrademanError::UnknownStrategy { .. }
            | TrademanError::DuplicateStrategy { .. }
            | TrademanError::MisalignedIndicators { .. } => 4,
            TrademanError::InvalidBar { .. }
            | TrademanError::UnorderedSeries { .. }
            | TrademanError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
