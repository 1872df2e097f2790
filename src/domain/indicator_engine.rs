//! Indicator engine: computes a requested set of indicators over a bar series.
//!
//! Pure and deterministic. Each requested indicator is computed independently;
//! one that cannot warm up on a short series comes back all-undefined while the
//! others still compute.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::bar_series::BarSeries;
use crate::domain::error::TrademanError;
use crate::domain::indicator::{IndicatorKind, IndicatorSeries, IndicatorType};
use crate::domain::interval::Interval;

/// Indicators computed by the scheduled batch for every asset.
pub const STANDARD_CATALOG: [IndicatorType; 9] = [
    IndicatorType::Sma(20),
    IndicatorType::Sma(50),
    IndicatorType::Ema(20),
    IndicatorType::Ema(50),
    IndicatorType::Rsi(14),
    IndicatorType::MACD_DEFAULT,
    IndicatorType::BOLLINGER_DEFAULT,
    IndicatorType::Atr(14),
    IndicatorType::Obv,
];

/// Request used when the caller names no indicators.
pub const DEFAULT_REQUEST: [&str; 2] = ["sma", "rsi"];

/// Resolves indicator names into indicator types.
///
/// Accepts family names (`sma` expands to SMA_20 and SMA_50, `macd` to
/// MACD_12_26_9, ...) and canonical names (`EMA_10`). Duplicates are dropped,
/// first occurrence wins. Any unrecognized name fails the whole request.
pub fn parse_indicator_request<S: AsRef<str>>(
    names: &[S],
) -> Result<Vec<IndicatorType>, TrademanError> {
    let mut types = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        for t in expand_family(name)? {
            if !types.contains(&t) {
                types.push(t);
            }
        }
    }
    Ok(types)
}

fn expand_family(name: &str) -> Result<Vec<IndicatorType>, TrademanError> {
    let family = IndicatorKind::ALL
        .iter()
        .find(|k| k.as_str().eq_ignore_ascii_case(name));
    let expanded = match family {
        Some(IndicatorKind::Sma) => vec![IndicatorType::Sma(20), IndicatorType::Sma(50)],
        Some(IndicatorKind::Ema) => vec![IndicatorType::Ema(20), IndicatorType::Ema(50)],
        Some(IndicatorKind::Rsi) => vec![IndicatorType::Rsi(14)],
        Some(IndicatorKind::Macd) => vec![IndicatorType::MACD_DEFAULT],
        Some(IndicatorKind::Bbands) => vec![IndicatorType::BOLLINGER_DEFAULT],
        Some(IndicatorKind::Atr) => vec![IndicatorType::Atr(14)],
        Some(IndicatorKind::Obv) => vec![IndicatorType::Obv],
        None => vec![name.parse()?],
    };
    Ok(expanded)
}

/// Indicator series aligned with the bars they were computed from.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    asset: String,
    interval: Interval,
    timestamps: Vec<DateTime<Utc>>,
    series: Vec<IndicatorSeries>,
}

impl IndicatorSet {
    /// Assembles a set from precomputed series, checking every series has one
    /// point per timestamp at the same timestamps.
    pub fn from_parts(
        asset: impl Into<String>,
        interval: Interval,
        timestamps: Vec<DateTime<Utc>>,
        series: Vec<IndicatorSeries>,
    ) -> Result<Self, TrademanError> {
        for s in &series {
            let aligned = s.values.len() == timestamps.len()
                && s.values
                    .iter()
                    .zip(&timestamps)
                    .all(|(p, ts)| p.timestamp == *ts);
            if !aligned {
                return Err(TrademanError::MisalignedIndicators {
                    indicator: s.indicator_type.name(),
                    expected: timestamps.len(),
                    actual: s.values.len(),
                });
            }
        }
        Ok(Self {
            asset: asset.into(),
            interval,
            timestamps,
            series,
        })
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn series(&self) -> &[IndicatorSeries] {
        &self.series
    }

    pub fn get(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series
            .iter()
            .find(|s| &s.indicator_type == indicator_type)
    }

    pub fn indicator_types(&self) -> Vec<IndicatorType> {
        self.series.iter().map(|s| s.indicator_type).collect()
    }

    /// One record per defined point, in request order then time order.
    pub fn records(&self) -> Vec<IndicatorRecord> {
        self.series
            .iter()
            .flat_map(|s| (0..s.values.len()).filter_map(move |i| self.record(s, i)))
            .collect()
    }

    /// Records for the newest timestamp only.
    pub fn latest_records(&self) -> Vec<IndicatorRecord> {
        match self.timestamps.len() {
            0 => Vec::new(),
            n => self
                .series
                .iter()
                .filter_map(|s| self.record(s, n - 1))
                .collect(),
        }
    }

    fn record(&self, series: &IndicatorSeries, index: usize) -> Option<IndicatorRecord> {
        let point = series.values.get(index)?;
        let (value, value2, value3) = point.value?.components();
        Some(IndicatorRecord {
            asset: self.asset.clone(),
            timestamp: point.timestamp,
            indicator_type: series.indicator_type.kind(),
            name: series.indicator_type.name(),
            value,
            value2,
            value3,
            parameters: series.indicator_type.parameters(),
            timeframe: self.interval.code().to_string(),
        })
    }
}

/// Immutable indicator row handed to storage, upserted by (asset, name, timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub asset: String,
    pub timestamp: DateTime<Utc>,
    pub indicator_type: IndicatorKind,
    pub name: String,
    pub value: f64,
    pub value2: Option<f64>,
    pub value3: Option<f64>,
    pub parameters: serde_json::Value,
    pub timeframe: String,
}

/// Computes `types` over `bars`.
///
/// `BarSeries` guarantees a non-empty, validated, ordered input, so this cannot
/// fail; malformed bars are rejected when the series is built.
pub fn compute_indicators(bars: &BarSeries, types: &[IndicatorType]) -> IndicatorSet {
    let series = types.iter().map(|t| t.compute(bars.bars())).collect();
    IndicatorSet {
        asset: bars.asset().to_string(),
        interval: bars.interval(),
        timestamps: bars.timestamps(),
        series,
    }
}
