//! ATR (Average True Range) indicator.
//!
//! TR[i] = max(H[i]-L[i], |H[i]-C[i-1]|, |L[i]-C[i-1]|) for i >= 1.
//! Seed: mean of TR[1..=n] at index n; then Wilder smoothing
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.
//! Warmup: first n bars are undefined.

use crate::domain::bar::Bar;
use crate::domain::indicator::{
    undefined_series, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() <= period {
        return undefined_series(bars, IndicatorType::Atr(period));
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(IndicatorPoint::undefined(bars[0].timestamp));

    let mut atr = 0.0;
    for i in 1..bars.len() {
        let tr = bars[i].true_range(bars[i - 1].close_f64());

        if i < period {
            atr += tr;
            values.push(IndicatorPoint::undefined(bars[i].timestamp));
            continue;
        }

        if i == period {
            atr = (atr + tr) / period as f64;
        } else {
            atr = (atr * (period - 1) as f64 + tr) / period as f64;
        }
        values.push(IndicatorPoint::defined(
            bars[i].timestamp,
            IndicatorValue::Simple(atr),
        ));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::fixtures::bar;

    #[test]
    fn atr_warmup() {
        let bars: Vec<Bar> = (0..6).map(|i| bar(i, 110.0, 90.0, 100.0, 1000)).collect();
        let series = calculate_atr(&bars, 3);

        assert_eq!(series.values.len(), 6);
        for i in 0..3 {
            assert!(!series.values[i].is_defined());
        }
        assert_eq!(series.defined_count(), 3);
    }

    #[test]
    fn atr_seed_is_average_true_range() {
        let bars = vec![
            bar(0, 110.0, 100.0, 105.0, 1000),
            bar(1, 115.0, 105.0, 110.0, 1000),
            bar(2, 120.0, 110.0, 115.0, 1000),
            bar(3, 125.0, 115.0, 120.0, 1000),
        ];
        // TR[1..=3] = 10 each
        let series = calculate_atr(&bars, 3);
        assert!((series.values[3].simple().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let bars = vec![
            bar(0, 110.0, 100.0, 105.0, 1000),
            bar(1, 115.0, 105.0, 110.0, 1000),
            bar(2, 120.0, 110.0, 115.0, 1000),
            bar(3, 125.0, 115.0, 120.0, 1000),
            // gap up: TR = max(10, |150-120|, |140-120|) = 30
            bar(4, 150.0, 140.0, 145.0, 1000),
        ];
        let series = calculate_atr(&bars, 3);

        let expected = (10.0 * 2.0 + 30.0) / 3.0;
        assert!((series.values[4].simple().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_insufficient_bars() {
        let bars: Vec<Bar> = (0..3).map(|i| bar(i, 110.0, 90.0, 100.0, 1000)).collect();
        let series = calculate_atr(&bars, 5);
        assert_eq!(series.values.len(), 3);
        assert_eq!(series.defined_count(), 0);
    }

    #[test]
    fn atr_indicator_type() {
        let bars = vec![bar(0, 110.0, 90.0, 100.0, 1000)];
        assert_eq!(
            calculate_atr(&bars, DEFAULT_PERIOD).indicator_type,
            IndicatorType::Atr(14)
        );
    }
}
