#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::BTreeMap;
use trademan::domain::bar::Bar;
use trademan::domain::bar_series::BarSeries;
use trademan::domain::error::TrademanError;
use trademan::domain::interval::Interval;
use trademan::ports::market_data_port::MarketDataPort;

/// In-memory market data keyed by symbol.
pub struct MockDataPort {
    pub data: BTreeMap<String, Vec<Bar>>,
    pub errors: BTreeMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.data.entry(symbol.to_string()).or_default();
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn list_assets(&self) -> Result<Vec<String>, TrademanError> {
        Ok(self.data.keys().cloned().collect())
    }

    fn fetch_bars(
        &self,
        asset: &str,
        _interval: Interval,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, TrademanError> {
        if let Some(reason) = self.errors.get(asset) {
            return Err(TrademanError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self
            .data
            .get(asset)
            .ok_or_else(|| TrademanError::AssetNotFound {
                asset: asset.to_string(),
            })?;
        Ok(bars
            .iter()
            .filter(|b| b.timestamp >= since && until.is_none_or(|u| b.timestamp <= u))
            .cloned()
            .collect())
    }
}

pub fn day(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

pub fn dec(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap()
}

/// Bar with open = close and a one-unit range around it.
pub fn make_bar(i: usize, close: f64, volume: u64) -> Bar {
    Bar::new(
        day(i),
        dec(close),
        dec(close + 1.0),
        dec(close - 1.0),
        dec(close),
        volume,
    )
}

/// Flat bars (open = high = low = close) on consecutive days from 2024-01-01.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(day(i), dec(c), dec(c), dec(c), dec(c), 1000))
        .collect()
}

pub fn series(symbol: &str, closes: &[f64]) -> BarSeries {
    BarSeries::new(symbol, Interval::Day1, bars_from_closes(closes)).unwrap()
}

/// 80 closes where SMA20 crosses above SMA50 on the last bar while RSI(14)
/// sits near 26.8. A one-day spike at index 29 holds SMA50 up until it
/// leaves the window on the final bar. MACD and Bollinger stay neutral.
pub fn crossover_with_oversold_rsi() -> Vec<f64> {
    let mut closes = vec![100.0; 29];
    closes.push(400.0);
    closes.extend(std::iter::repeat_n(80.0, 30));
    closes.extend((0..20).map(|i| 110.0 - 3.0 * i as f64));
    closes
}

/// Same shape without the spike: RSI is oversold but SMA20 was already above
/// SMA50, so only the RSI rule fires.
pub fn oversold_rsi_only() -> Vec<f64> {
    let mut closes = crossover_with_oversold_rsi();
    closes[29] = 100.0;
    closes
}

/// Steady rise for `n` days.
pub fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 50.0 + 0.5 * i as f64).collect()
}

/// Closes alternating between 100 and 101; RSI hovers around 50.
pub fn alternating(n: usize) -> Vec<f64> {
    (0..n).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect()
}
