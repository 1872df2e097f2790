//! OBV (On-Balance Volume) indicator implementation.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

/// Calculate OBV (On-Balance Volume) indicator.
///
/// OBV[0] = volume[0]
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period; all bars are defined. Closes are compared as decimals so
/// equal prices never register as a move.
pub fn calculate_obv(bars: &[Bar]) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut obv: f64 = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let volume = bar.volume as f64;
        if i == 0 {
            obv = volume;
        } else if bar.close > bars[i - 1].close {
            obv += volume;
        } else if bar.close < bars[i - 1].close {
            obv -= volume;
        }

        values.push(IndicatorPoint::defined(
            bar.timestamp,
            IndicatorValue::Simple(obv),
        ));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Obv,
        values,
    }
}
