//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]), maintained as a rolling sum.
//! Warmup: first (n-1) bars are undefined.

use crate::domain::bar::Bar;
use crate::domain::indicator::{
    undefined_series, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};

pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return undefined_series(bars, IndicatorType::Sma(period));
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close_f64();
        if i >= period {
            sum -= bars[i - period].close_f64();
        }

        if i + 1 < period {
            values.push(IndicatorPoint::undefined(bar.timestamp));
        } else {
            values.push(IndicatorPoint::defined(
                bar.timestamp,
                IndicatorValue::Simple(sum / period as f64),
            ));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
