//! CSV file market data adapter.
//!
//! One file per (symbol, interval): `{SYMBOL}_{interval}.csv` with header
//! `timestamp,open,high,low,close,volume[,trade_count,vwap]`. Timestamps are
//! RFC 3339 or plain `YYYY-MM-DD` dates (midnight UTC).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::bar::Bar;
use crate::domain::error::TrademanError;
use crate::domain::interval::Interval;
use crate::ports::market_data_port::MarketDataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
    interval: Interval,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: u64,
    #[serde(default)]
    trade_count: Option<u64>,
    #[serde(default)]
    vwap: Option<String>,
}

impl CsvAdapter {
    /// `interval` selects which files `list_assets` reports.
    pub fn new(base_path: PathBuf, interval: Interval) -> Self {
        Self {
            base_path,
            interval,
        }
    }

    fn csv_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol, interval.code()))
    }
}

fn data_error(reason: String) -> TrademanError {
    TrademanError::Data { reason }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TrademanError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| data_error(format!("invalid timestamp '{}'", raw)))
}

fn parse_price(raw: &str, column: &str) -> Result<Decimal, TrademanError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| data_error(format!("invalid {} value '{}': {}", column, raw, e)))
}

impl CsvRow {
    fn into_bar(self) -> Result<Bar, TrademanError> {
        let vwap = match self.vwap.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_price(raw, "vwap")?),
        };
        Ok(Bar {
            timestamp: parse_timestamp(&self.timestamp)?,
            open: parse_price(&self.open, "open")?,
            high: parse_price(&self.high, "high")?,
            low: parse_price(&self.low, "low")?,
            close: parse_price(&self.close, "close")?,
            volume: self.volume,
            trade_count: self.trade_count,
            vwap,
        })
    }
}

impl MarketDataPort for CsvAdapter {
    fn list_assets(&self) -> Result<Vec<String>, TrademanError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let suffix = format!("_{}.csv", self.interval.code());
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                if !symbol.is_empty() {
                    symbols.push(symbol.to_string());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn fetch_bars(
        &self,
        asset: &str,
        interval: Interval,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, TrademanError> {
        let path = self.csv_path(asset, interval);
        if !path.exists() {
            return Err(TrademanError::AssetNotFound {
                asset: asset.to_string(),
            });
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.deserialize::<CsvRow>() {
            let row = result.map_err(|e| {
                data_error(format!("CSV parse error in {}: {}", path.display(), e))
            })?;
            let bar = row.into_bar()?;
            if bar.timestamp < since || until.is_some_and(|u| bar.timestamp > u) {
                continue;
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}
