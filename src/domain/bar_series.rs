//! Validated, time-ordered bar series for one (asset, interval) pair.

use chrono::{DateTime, Utc};

use crate::domain::bar::Bar;
use crate::domain::error::TrademanError;
use crate::domain::interval::Interval;

/// Non-empty, strictly increasing series of valid bars.
///
/// Constructed fresh per computation; the engines only ever borrow it.
#[derive(Debug, Clone)]
pub struct BarSeries {
    asset: String,
    interval: Interval,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Validates every bar and the ordering before accepting the series.
    ///
    /// Fails fast on the first malformed bar so no partial output is ever
    /// produced for the asset.
    pub fn new(
        asset: impl Into<String>,
        interval: Interval,
        bars: Vec<Bar>,
    ) -> Result<Self, TrademanError> {
        let asset = asset.into();
        if bars.is_empty() {
            return Err(TrademanError::InsufficientData {
                asset,
                bars: 0,
                minimum: 1,
            });
        }

        for (i, bar) in bars.iter().enumerate() {
            bar.validate()?;
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(TrademanError::UnorderedSeries {
                    timestamp: bar.timestamp,
                });
            }
        }

        Ok(Self {
            asset,
            interval,
            bars,
        })
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    /// Restricts the series to `[start, end]` (either bound optional).
    ///
    /// Fails with `InsufficientData` when no bar falls in the range.
    pub fn window(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<BarSeries, TrademanError> {
        let bars: Vec<Bar> = self
            .bars
            .iter()
            .filter(|b| start.is_none_or(|s| b.timestamp >= s))
            .filter(|b| end.is_none_or(|e| b.timestamp <= e))
            .cloned()
            .collect();
        if bars.is_empty() {
            return Err(TrademanError::InsufficientData {
                asset: self.asset.clone(),
                bars: 0,
                minimum: 1,
            });
        }
        Ok(BarSeries {
            asset: self.asset.clone(),
            interval: self.interval,
            bars,
        })
    }
}
