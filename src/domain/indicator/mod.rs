//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values, aligned with its bars
//!
//! Every calculator returns exactly one point per input bar. Points inside the
//! warm-up period carry `value: None`, never a placeholder zero.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use atr::calculate_atr;
pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use obv::calculate_obv;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

use crate::domain::bar::Bar;
use crate::domain::error::TrademanError;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<IndicatorValue>,
}

impl IndicatorPoint {
    pub fn defined(timestamp: DateTime<Utc>, value: IndicatorValue) -> Self {
        Self {
            timestamp,
            value: Some(value),
        }
    }

    pub fn undefined(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            value: None,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    /// The value of a single-output indicator, if defined.
    pub fn simple(&self) -> Option<f64> {
        match self.value {
            Some(IndicatorValue::Simple(v)) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    /// The signal line needs `signal` MACD points of its own before it is
    /// defined, so it (and the histogram) may lag the MACD line.
    Macd {
        line: f64,
        signal: Option<f64>,
        histogram: Option<f64>,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

impl IndicatorValue {
    /// Storage layout: (value, value2, value3).
    ///
    /// MACD → (line, signal, histogram); Bollinger → (upper, middle, lower).
    pub fn components(&self) -> (f64, Option<f64>, Option<f64>) {
        match *self {
            IndicatorValue::Simple(v) => (v, None, None),
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } => (line, signal, histogram),
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => (upper, Some(middle), Some(lower)),
        }
    }
}

/// Indicator family, as stored in the `indicator_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    Bbands,
    Atr,
    Obv,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 7] = [
        IndicatorKind::Sma,
        IndicatorKind::Ema,
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
        IndicatorKind::Bbands,
        IndicatorKind::Atr,
        IndicatorKind::Obv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Macd => "macd",
            IndicatorKind::Bbands => "bbands",
            IndicatorKind::Atr => "atr",
            IndicatorKind::Obv => "obv",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    Atr(usize),
    Obv,
}

impl IndicatorType {
    pub const MACD_DEFAULT: IndicatorType = IndicatorType::Macd {
        fast: macd::DEFAULT_FAST,
        slow: macd::DEFAULT_SLOW,
        signal: macd::DEFAULT_SIGNAL,
    };

    pub const BOLLINGER_DEFAULT: IndicatorType = IndicatorType::Bollinger {
        period: bollinger::DEFAULT_PERIOD,
        stddev_mult_x100: bollinger::DEFAULT_MULT_X100,
    };

    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorType::Sma(_) => IndicatorKind::Sma,
            IndicatorType::Ema(_) => IndicatorKind::Ema,
            IndicatorType::Rsi(_) => IndicatorKind::Rsi,
            IndicatorType::Macd { .. } => IndicatorKind::Macd,
            IndicatorType::Bollinger { .. } => IndicatorKind::Bbands,
            IndicatorType::Atr(_) => IndicatorKind::Atr,
            IndicatorType::Obv => IndicatorKind::Obv,
        }
    }

    /// Canonical record name, e.g. `SMA_20`, `MACD_12_26_9`, `BBANDS_20_2`.
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Parameters recorded alongside each value for reproducibility.
    pub fn parameters(&self) -> serde_json::Value {
        match *self {
            IndicatorType::Sma(period)
            | IndicatorType::Ema(period)
            | IndicatorType::Rsi(period)
            | IndicatorType::Atr(period) => json!({ "period": period }),
            IndicatorType::Macd { fast, slow, signal } => {
                json!({ "fast": fast, "slow": slow, "signal": signal })
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                if stddev_mult_x100 % 100 == 0 {
                    json!({ "period": period, "std": stddev_mult_x100 / 100 })
                } else {
                    json!({ "period": period, "std": stddev_mult_x100 as f64 / 100.0 })
                }
            }
            IndicatorType::Obv => json!({}),
        }
    }

    /// Number of leading bars for which the indicator is undefined.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorType::Sma(n) | IndicatorType::Ema(n) => n.saturating_sub(1),
            IndicatorType::Bollinger { period, .. } => period.saturating_sub(1),
            IndicatorType::Rsi(n) | IndicatorType::Atr(n) => n,
            IndicatorType::Macd { fast, slow, .. } => fast.max(slow).saturating_sub(1),
            IndicatorType::Obv => 0,
        }
    }

    /// Computes this indicator over `bars`, one point per bar.
    pub fn compute(&self, bars: &[Bar]) -> IndicatorSeries {
        match *self {
            IndicatorType::Sma(period) => calculate_sma(bars, period),
            IndicatorType::Ema(period) => calculate_ema(bars, period),
            IndicatorType::Rsi(period) => calculate_rsi(bars, period),
            IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => calculate_bollinger(bars, period, stddev_mult_x100),
            IndicatorType::Atr(period) => calculate_atr(bars, period),
            IndicatorType::Obv => calculate_obv(bars),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA_{}", period),
            IndicatorType::Ema(period) => write!(f, "EMA_{}", period),
            IndicatorType::Rsi(period) => write!(f, "RSI_{}", period),
            IndicatorType::Atr(period) => write!(f, "ATR_{}", period),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD_{}_{}_{}", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BBANDS_{}_{}", period, mult)
            }
        }
    }
}

impl FromStr for IndicatorType {
    type Err = TrademanError;

    /// Parses a canonical name (`SMA_20`, `MACD_12_26_9`, ...), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || TrademanError::UnknownIndicator {
            name: s.to_string(),
        };
        let upper = s.trim().to_uppercase();
        let mut parts = upper.split('_');
        let head = parts.next().ok_or_else(unknown)?;
        let args: Vec<&str> = parts.collect();

        let period = |raw: &str| -> Result<usize, TrademanError> {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(unknown()),
            }
        };

        match (head, args.as_slice()) {
            ("SMA", [n]) => Ok(IndicatorType::Sma(period(n)?)),
            ("EMA", [n]) => Ok(IndicatorType::Ema(period(n)?)),
            ("RSI", [n]) => Ok(IndicatorType::Rsi(period(n)?)),
            ("ATR", [n]) => Ok(IndicatorType::Atr(period(n)?)),
            ("OBV", []) => Ok(IndicatorType::Obv),
            ("MACD", [fast, slow, signal]) => Ok(IndicatorType::Macd {
                fast: period(fast)?,
                slow: period(slow)?,
                signal: period(signal)?,
            }),
            ("BBANDS", [n, mult]) => {
                let mult: f64 = mult.parse().map_err(|_| unknown())?;
                // Stored in hundredths: the smallest multiplier is 0.01.
                let x100 = (mult * 100.0).round();
                if !x100.is_finite() || x100 < 1.0 || x100 > f64::from(u32::MAX) {
                    return Err(unknown());
                }
                Ok(IndicatorType::Bollinger {
                    period: period(n)?,
                    stddev_mult_x100: x100 as u32,
                })
            }
            _ => Err(unknown()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|p| p.is_defined()).count()
    }

    /// Value at `index`, `None` if out of range or undefined.
    pub fn value_at(&self, index: usize) -> Option<IndicatorValue> {
        self.values.get(index).and_then(|p| p.value)
    }

    pub fn latest(&self) -> Option<IndicatorValue> {
        self.values.last().and_then(|p| p.value)
    }
}

/// Series in which every point is undefined, for inputs too short to compute.
pub(crate) fn undefined_series(bars: &[Bar], indicator_type: IndicatorType) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type,
        values: bars
            .iter()
            .map(|b| IndicatorPoint::undefined(b.timestamp))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA_20");
    }

    #[test]
    fn indicator_type_display_macd() {
        assert_eq!(IndicatorType::MACD_DEFAULT.to_string(), "MACD_12_26_9");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        assert_eq!(IndicatorType::BOLLINGER_DEFAULT.to_string(), "BBANDS_20_2");
        let wide = IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 250,
        };
        assert_eq!(wide.to_string(), "BBANDS_20_2.5");
    }

    #[test]
    fn parse_canonical_names() {
        assert_eq!("SMA_50".parse::<IndicatorType>().unwrap(), IndicatorType::Sma(50));
        assert_eq!("rsi_14".parse::<IndicatorType>().unwrap(), IndicatorType::Rsi(14));
        assert_eq!("OBV".parse::<IndicatorType>().unwrap(), IndicatorType::Obv);
        assert_eq!(
            "MACD_12_26_9".parse::<IndicatorType>().unwrap(),
            IndicatorType::MACD_DEFAULT
        );
        assert_eq!(
            "BBANDS_20_2".parse::<IndicatorType>().unwrap(),
            IndicatorType::BOLLINGER_DEFAULT
        );
    }

    #[test]
    fn parse_round_trips_display() {
        for t in [
            IndicatorType::Ema(20),
            IndicatorType::Atr(14),
            IndicatorType::MACD_DEFAULT,
            IndicatorType::Bollinger {
                period: 10,
                stddev_mult_x100: 150,
            },
        ] {
            assert_eq!(t.to_string().parse::<IndicatorType>().unwrap(), t);
        }
    }

    #[test]
    fn smallest_bollinger_multiplier_round_trips() {
        let narrow = "BBANDS_20_0.01".parse::<IndicatorType>().unwrap();
        assert_eq!(
            narrow,
            IndicatorType::Bollinger {
                period: 20,
                stddev_mult_x100: 1,
            }
        );
        assert_eq!(narrow.to_string().parse::<IndicatorType>().unwrap(), narrow);
    }

    #[test]
    fn parse_rejects_unknown_and_zero_periods() {
        let rejected = [
            "STOCH_14",
            "SMA",
            "SMA_0",
            "SMA_x",
            "MACD_12_26",
            "BBANDS_20_-1",
            "BBANDS_20_0.004",
            "",
        ];
        for bad in rejected {
            assert!(
                matches!(
                    bad.parse::<IndicatorType>(),
                    Err(TrademanError::UnknownIndicator { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn parameters_match_storage_layout() {
        assert_eq!(IndicatorType::Sma(20).parameters(), json!({"period": 20}));
        assert_eq!(
            IndicatorType::MACD_DEFAULT.parameters(),
            json!({"fast": 12, "slow": 26, "signal": 9})
        );
        assert_eq!(
            IndicatorType::BOLLINGER_DEFAULT.parameters(),
            json!({"period": 20, "std": 2})
        );
        assert_eq!(IndicatorType::Obv.parameters(), json!({}));
    }

    #[test]
    fn warmup_lengths() {
        assert_eq!(IndicatorType::Sma(20).warmup(), 19);
        assert_eq!(IndicatorType::Ema(20).warmup(), 19);
        assert_eq!(IndicatorType::Rsi(14).warmup(), 14);
        assert_eq!(IndicatorType::Atr(14).warmup(), 14);
        assert_eq!(IndicatorType::MACD_DEFAULT.warmup(), 25);
        assert_eq!(IndicatorType::BOLLINGER_DEFAULT.warmup(), 19);
        assert_eq!(IndicatorType::Obv.warmup(), 0);
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&IndicatorKind::Bbands).unwrap(),
            "\"bbands\""
        );
        assert_eq!(IndicatorType::Atr(14).kind(), IndicatorKind::Atr);
    }

    #[test]
    fn components_layout() {
        let bb = IndicatorValue::Bollinger {
            upper: 3.0,
            middle: 2.0,
            lower: 1.0,
        };
        assert_eq!(bb.components(), (3.0, Some(2.0), Some(1.0)));
        let macd = IndicatorValue::Macd {
            line: 1.0,
            signal: None,
            histogram: None,
        };
        assert_eq!(macd.components(), (1.0, None, None));
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Sma(20), "sma20_series".to_string());
        map.insert(IndicatorType::Sma(50), "sma50_series".to_string());
        map.insert(IndicatorType::MACD_DEFAULT, "macd_series".to_string());

        assert_eq!(
            map.get(&IndicatorType::Sma(20)),
            Some(&"sma20_series".to_string())
        );
        assert_eq!(
            map.get(&IndicatorType::MACD_DEFAULT),
            Some(&"macd_series".to_string())
        );
    }
}
