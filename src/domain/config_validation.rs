//! Configuration validation.
//!
//! Validates every field before a run, and turns the validated values into the
//! settings structs the domain takes as explicit arguments.

use chrono::TimeDelta;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::batch::{BatchSettings, DEFAULT_LOOKBACK_DAYS, DEFAULT_MIN_BARS, PersistMode};
use crate::domain::error::TrademanError;
use crate::domain::indicator_engine::STANDARD_CATALOG;
use crate::domain::interval::Interval;
use crate::domain::rule::{DEFAULT_RSI_OVERBOUGHT, DEFAULT_RSI_OVERSOLD};
use crate::domain::signal_engine::{DEFAULT_EXPIRY_HOURS, SignalPolicy};
use crate::domain::strategy::{DEFAULT_STRATEGY, RuleThresholds};
use crate::ports::config_port::ConfigPort;

/// Upper bound for `[indicators] lookback_days` (one hundred years).
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;
/// Upper bound for `[signals] expiry_hours` (one hundred years).
pub const MAX_EXPIRY_HOURS: i64 = 876_000;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TrademanError> {
    validate_data_config(config)?;
    validate_indicator_config(config)?;
    validate_signal_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), TrademanError> {
    data_dir(config)?;
    interval(config)?;
    Ok(())
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), TrademanError> {
    lookback_days(config)?;
    min_bars(config)?;
    persist_mode(config)?;
    Ok(())
}

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), TrademanError> {
    strategy_name(config)?;
    rule_thresholds(config)?;
    signal_policy(config)?;
    Ok(())
}

/// `[data] path`: directory holding the bar files.
pub fn data_dir(config: &dyn ConfigPort) -> Result<PathBuf, TrademanError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => Ok(PathBuf::from(s.trim())),
        _ => Err(TrademanError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
    }
}

/// `[data] interval`, or its older spelling `timeframe`.
pub fn interval(config: &dyn ConfigPort) -> Result<Interval, TrademanError> {
    let raw = config
        .get_string("data", "interval")
        .or_else(|| config.get_string("data", "timeframe"));
    match raw {
        Some(s) if !s.trim().is_empty() => s.parse(),
        _ => Ok(Interval::default()),
    }
}

fn lookback_days(config: &dyn ConfigPort) -> Result<i64, TrademanError> {
    let value = config.get_int("indicators", "lookback_days", DEFAULT_LOOKBACK_DAYS);
    if !(1..=MAX_LOOKBACK_DAYS).contains(&value) {
        return Err(TrademanError::config_invalid(
            "indicators",
            "lookback_days",
            format!("lookback_days must be between 1 and {}", MAX_LOOKBACK_DAYS),
        ));
    }
    Ok(value)
}

fn min_bars(config: &dyn ConfigPort) -> Result<usize, TrademanError> {
    let value = config.get_int("indicators", "min_bars", DEFAULT_MIN_BARS as i64);
    if value < 1 {
        return Err(TrademanError::config_invalid(
            "indicators",
            "min_bars",
            "min_bars must be at least 1",
        ));
    }
    Ok(value as usize)
}

fn persist_mode(config: &dyn ConfigPort) -> Result<PersistMode, TrademanError> {
    match config.get_string("indicators", "persist") {
        Some(s) if !s.trim().is_empty() => s.parse(),
        _ => Ok(PersistMode::default()),
    }
}

/// `[signals] strategy`, defaulting to the composite strategy. Whether the
/// name is registered is checked at lookup.
pub fn strategy_name(config: &dyn ConfigPort) -> Result<String, TrademanError> {
    match config.get_string("signals", "strategy") {
        None => Ok(DEFAULT_STRATEGY.to_string()),
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(_) => Err(TrademanError::config_invalid(
            "signals",
            "strategy",
            "strategy must not be empty",
        )),
    }
}

pub fn rule_thresholds(config: &dyn ConfigPort) -> Result<RuleThresholds, TrademanError> {
    let oversold = config.get_double("signals", "rsi_oversold", DEFAULT_RSI_OVERSOLD);
    let overbought = config.get_double("signals", "rsi_overbought", DEFAULT_RSI_OVERBOUGHT);
    if !(oversold > 0.0 && oversold < 100.0) {
        return Err(TrademanError::config_invalid(
            "signals",
            "rsi_oversold",
            "rsi_oversold must be between 0 and 100",
        ));
    }
    if !(overbought > 0.0 && overbought < 100.0) {
        return Err(TrademanError::config_invalid(
            "signals",
            "rsi_overbought",
            "rsi_overbought must be between 0 and 100",
        ));
    }
    if oversold >= overbought {
        return Err(TrademanError::config_invalid(
            "signals",
            "rsi_oversold",
            format!("rsi_oversold must be below rsi_overbought ({})", overbought),
        ));
    }
    Ok(RuleThresholds {
        rsi_oversold: oversold,
        rsi_overbought: overbought,
    })
}

pub fn signal_policy(config: &dyn ConfigPort) -> Result<SignalPolicy, TrademanError> {
    let expiry_hours = config.get_int("signals", "expiry_hours", DEFAULT_EXPIRY_HOURS);
    if !(0..=MAX_EXPIRY_HOURS).contains(&expiry_hours) {
        return Err(TrademanError::config_invalid(
            "signals",
            "expiry_hours",
            format!("expiry_hours must be between 0 and {}", MAX_EXPIRY_HOURS),
        ));
    }
    let take_profit_pct = percent(config, "take_profit_pct")?;
    let stop_loss_pct = percent(config, "stop_loss_pct")?;
    if stop_loss_pct.is_some_and(|pct| pct >= Decimal::ONE_HUNDRED) {
        return Err(TrademanError::config_invalid(
            "signals",
            "stop_loss_pct",
            "stop_loss_pct must be below 100",
        ));
    }
    Ok(SignalPolicy {
        expiry: (expiry_hours > 0).then(|| TimeDelta::hours(expiry_hours)),
        emit_hold: config.get_bool("signals", "emit_hold", false),
        take_profit_pct,
        stop_loss_pct,
    })
}

/// Optional non-negative percentage; zero or absent means unset.
fn percent(config: &dyn ConfigPort, key: &str) -> Result<Option<Decimal>, TrademanError> {
    let Some(raw) = config.get_string("signals", key) else {
        return Ok(None);
    };
    let value = Decimal::from_str(raw.trim()).map_err(|_| {
        TrademanError::config_invalid("signals", key, format!("invalid number '{}'", raw))
    })?;
    if value < Decimal::ZERO {
        return Err(TrademanError::config_invalid(
            "signals",
            key,
            format!("{} must be non-negative", key),
        ));
    }
    Ok((value > Decimal::ZERO).then_some(value))
}

pub fn batch_settings(config: &dyn ConfigPort) -> Result<BatchSettings, TrademanError> {
    Ok(BatchSettings {
        interval: interval(config)?,
        lookback_days: lookback_days(config)?,
        min_bars: min_bars(config)?,
        persist: persist_mode(config)?,
        indicators: STANDARD_CATALOG.to_vec(),
        policy: signal_policy(config)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use rust_decimal_macros::dec;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[data]
path = /var/lib/bars
interval = 1h

[indicators]
lookback_days = 200
min_bars = 30
persist = all

[signals]
strategy = RSI_MA_MACD_Combined
rsi_oversold = 25
rsi_overbought = 75
expiry_hours = 48
emit_hold = true
take_profit_pct = 8.5
stop_loss_pct = 4
"#,
        );
        assert!(validate_config(&config).is_ok());

        let settings = batch_settings(&config).unwrap();
        assert_eq!(settings.interval, Interval::Hour1);
        assert_eq!(settings.lookback_days, 200);
        assert_eq!(settings.min_bars, 30);
        assert_eq!(settings.persist, PersistMode::All);
        assert_eq!(settings.policy.expiry, Some(TimeDelta::hours(48)));
        assert!(settings.policy.emit_hold);
        assert_eq!(settings.policy.take_profit_pct, Some(dec!(8.5)));
        assert_eq!(settings.policy.stop_loss_pct, Some(dec!(4)));

        assert_eq!(strategy_name(&config).unwrap(), "RSI_MA_MACD_Combined");
        let thresholds = rule_thresholds(&config).unwrap();
        assert_eq!(thresholds.rsi_oversold, 25.0);
        assert_eq!(thresholds.rsi_overbought, 75.0);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = make_config("[data]\npath = ./data\n");
        assert!(validate_config(&config).is_ok());

        let settings = batch_settings(&config).unwrap();
        assert_eq!(settings, BatchSettings::default());
        assert_eq!(strategy_name(&config).unwrap(), DEFAULT_STRATEGY);
        assert_eq!(rule_thresholds(&config).unwrap(), RuleThresholds::default());
    }

    #[test]
    fn missing_data_path_fails() {
        let config = make_config("[data]\ninterval = 1d\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigMissing { key, .. } if key == "path"));
    }

    #[test]
    fn bad_interval_fails() {
        let config = make_config("[data]\npath = x\ninterval = 3d\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigInvalid { key, .. } if key == "interval"));
    }

    #[test]
    fn timeframe_is_accepted_for_interval() {
        let config = make_config("[data]\npath = x\ntimeframe = 4h\n");
        assert_eq!(interval(&config).unwrap(), Interval::Hour4);

        let both = make_config("[data]\npath = x\ninterval = 1w\ntimeframe = 4h\n");
        assert_eq!(interval(&both).unwrap(), Interval::Week1);
    }

    #[test]
    fn zero_lookback_fails() {
        let config = make_config("[data]\npath = x\n[indicators]\nlookback_days = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigInvalid { key, .. } if key == "lookback_days"));
    }

    #[test]
    fn huge_lookback_fails() {
        let config =
            make_config("[data]\npath = x\n[indicators]\nlookback_days = 1000000000\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigInvalid { key, .. } if key == "lookback_days"));

        let edge = make_config("[data]\npath = x\n[indicators]\nlookback_days = 36500\n");
        assert_eq!(batch_settings(&edge).unwrap().lookback_days, MAX_LOOKBACK_DAYS);
    }

    #[test]
    fn zero_min_bars_fails() {
        let config = make_config("[data]\npath = x\n[indicators]\nmin_bars = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigInvalid { key, .. } if key == "min_bars"));
    }

    #[test]
    fn unknown_persist_mode_fails() {
        let config = make_config("[data]\npath = x\n[indicators]\npersist = sometimes\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigInvalid { key, .. } if key == "persist"));
    }

    #[test]
    fn inverted_rsi_thresholds_fail() {
        let config =
            make_config("[data]\npath = x\n[signals]\nrsi_oversold = 70\nrsi_overbought = 30\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigInvalid { key, .. } if key == "rsi_oversold"));
    }

    #[test]
    fn out_of_range_rsi_fails() {
        let config = make_config("[data]\npath = x\n[signals]\nrsi_overbought = 120\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigInvalid { key, .. } if key == "rsi_overbought"));
    }

    #[test]
    fn negative_expiry_fails() {
        let config = make_config("[data]\npath = x\n[signals]\nexpiry_hours = -1\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigInvalid { key, .. } if key == "expiry_hours"));
    }

    #[test]
    fn huge_expiry_fails() {
        let config = make_config("[data]\npath = x\n[signals]\nexpiry_hours = 10000000000\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigInvalid { key, .. } if key == "expiry_hours"));
    }

    #[test]
    fn zero_expiry_means_never() {
        let config = make_config("[data]\npath = x\n[signals]\nexpiry_hours = 0\n");
        assert_eq!(signal_policy(&config).unwrap().expiry, None);
    }

    #[test]
    fn percent_validation() {
        let negative = make_config("[data]\npath = x\n[signals]\ntake_profit_pct = -2\n");
        assert!(matches!(
            validate_config(&negative).unwrap_err(),
            TrademanError::ConfigInvalid { key, .. } if key == "take_profit_pct"
        ));

        let garbage = make_config("[data]\npath = x\n[signals]\nstop_loss_pct = lots\n");
        assert!(matches!(
            validate_config(&garbage).unwrap_err(),
            TrademanError::ConfigInvalid { key, .. } if key == "stop_loss_pct"
        ));

        let total = make_config("[data]\npath = x\n[signals]\nstop_loss_pct = 100\n");
        assert!(validate_config(&total).is_err());

        let zero = make_config("[data]\npath = x\n[signals]\ntake_profit_pct = 0\n");
        assert_eq!(signal_policy(&zero).unwrap().take_profit_pct, None);
    }
}
