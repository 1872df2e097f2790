//! OHLCV bar representation.
//!
//! Prices are fixed-point [`Decimal`]s as delivered by the storage layer.
//! Indicator math runs in `f64`; the `*_f64` accessors are the one place
//! that conversion happens.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::error::TrademanError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
    pub trade_count: Option<u64>,
    pub vwap: Option<Decimal>,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            trade_count: None,
            vwap: None,
        }
    }

    /// Checks the OHLC invariant: positive prices, `low <= open, close <= high`.
    ///
    /// Violations are reported, never corrected.
    pub fn validate(&self) -> Result<(), TrademanError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, price) in fields {
            if price <= Decimal::ZERO {
                return Err(TrademanError::invalid_bar(
                    self.timestamp,
                    format!("{name} must be positive, got {price}"),
                ));
            }
        }
        if self.low > self.high {
            return Err(TrademanError::invalid_bar(
                self.timestamp,
                format!("low {} above high {}", self.low, self.high),
            ));
        }
        for (name, price) in [("open", self.open), ("close", self.close)] {
            if price < self.low || price > self.high {
                return Err(TrademanError::invalid_bar(
                    self.timestamp,
                    format!(
                        "{name} {price} outside range [{}, {}]",
                        self.low, self.high
                    ),
                ));
            }
        }
        if let Some(vwap) = self.vwap {
            if vwap <= Decimal::ZERO {
                return Err(TrademanError::invalid_bar(
                    self.timestamp,
                    format!("vwap must be positive, got {vwap}"),
                ));
            }
        }
        Ok(())
    }

    pub fn close_f64(&self) -> f64 {
        to_f64(self.close)
    }

    pub fn high_f64(&self) -> f64 {
        to_f64(self.high)
    }

    pub fn low_f64(&self) -> f64 {
        to_f64(self.low)
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high_f64() - self.low_f64();
        let hc = (self.high_f64() - prev_close).abs();
        let lc = (self.low_f64() - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn sample_bar() -> Bar {
        Bar::new(day(0), dec(100.0), dec(110.0), dec(90.0), dec(105.0), 50_000)
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        // high-low=20, |high-100|=10, |low-100|=10 → 20
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar();
        // high-low=20, |110-130|=20, |90-130|=40 → 40
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn valid_bar_passes() {
        assert!(sample_bar().validate().is_ok());
    }

    #[test]
    fn low_above_high_rejected() {
        let bar = Bar::new(day(3), dec(10.0), dec(10.0), dec(12.0), dec(11.0), 1);
        match bar.validate() {
            Err(TrademanError::InvalidBar { timestamp, reason }) => {
                assert_eq!(timestamp, day(3));
                assert!(reason.contains("low"));
            }
            other => panic!("expected InvalidBar, got {other:?}"),
        }
    }

    #[test]
    fn close_outside_range_rejected() {
        let bar = Bar::new(day(0), dec(100.0), dec(110.0), dec(90.0), dec(111.0), 1);
        assert!(matches!(
            bar.validate(),
            Err(TrademanError::InvalidBar { .. })
        ));
    }

    #[test]
    fn non_positive_price_rejected() {
        let bar = Bar::new(day(0), dec(0.0), dec(1.0), dec(0.0), dec(1.0), 1);
        assert!(bar.validate().is_err());
    }

    #[test]
    fn non_positive_vwap_rejected() {
        let mut bar = sample_bar();
        bar.vwap = Some(Decimal::ZERO);
        assert!(bar.validate().is_err());
    }
}
