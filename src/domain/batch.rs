//! Batch orchestration: the scheduled per-asset indicator and signal runs.
//!
//! Each asset is computed independently (and in parallel); a failure for one
//! asset is recorded in the [`BatchReport`] and never aborts its siblings.
//! Store writes are applied sequentially once all assets are computed.

use chrono::{DateTime, TimeDelta, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{error, info, warn};

use crate::domain::bar_series::BarSeries;
use crate::domain::error::TrademanError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator_engine::{IndicatorRecord, STANDARD_CATALOG, compute_indicators as compute_set};
use crate::domain::interval::Interval;
use crate::domain::signal::{Signal, SignalId, StoredSignal};
use crate::domain::signal_engine::{SignalPolicy, evaluate_signal};
use crate::domain::strategy::Strategy;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::signal_store_port::SignalStorePort;

pub const DEFAULT_LOOKBACK_DAYS: i64 = 100;
pub const DEFAULT_MIN_BARS: usize = 20;

/// Which indicator points a run writes to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    /// Only the newest timestamp of each indicator.
    #[default]
    Latest,
    /// Every defined point in the lookback window.
    All,
}

impl fmt::Display for PersistMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistMode::Latest => f.write_str("latest"),
            PersistMode::All => f.write_str("all"),
        }
    }
}

impl FromStr for PersistMode {
    type Err = TrademanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(PersistMode::Latest),
            "all" => Ok(PersistMode::All),
            other => Err(TrademanError::config_invalid(
                "indicators",
                "persist",
                format!("expected 'latest' or 'all', got '{}'", other),
            )),
        }
    }
}

/// Explicit per-run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    pub interval: Interval,
    pub lookback_days: i64,
    /// Assets with fewer bars are skipped, not failed.
    pub min_bars: usize,
    pub persist: PersistMode,
    pub indicators: Vec<IndicatorType>,
    pub policy: SignalPolicy,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            interval: Interval::default(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            min_bars: DEFAULT_MIN_BARS,
            persist: PersistMode::default(),
            indicators: STANDARD_CATALOG.to_vec(),
            policy: SignalPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFailure {
    pub asset: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed_assets: usize,
    pub skipped_assets: usize,
    pub indicators_created: usize,
    pub signals_created: usize,
    pub deactivated_signals: usize,
    pub errors: Vec<AssetFailure>,
}

impl BatchReport {
    fn fail(&mut self, asset: &str, err: &TrademanError) {
        error!(asset, error = %err, "asset failed");
        self.errors.push(AssetFailure {
            asset: asset.to_string(),
            reason: err.to_string(),
        });
    }

    fn skip(&mut self, asset: &str, bars: usize, minimum: usize) {
        warn!(asset, bars, minimum, "insufficient bars, skipping");
        self.skipped_assets += 1;
    }
}

enum Computed<T> {
    Ready(T),
    Skipped { bars: usize },
    Failed(TrademanError),
}

fn resolve_assets(
    data: &dyn MarketDataPort,
    asset: Option<&str>,
) -> Result<Vec<String>, TrademanError> {
    let known = data.list_assets()?;
    match asset {
        None => Ok(known),
        Some(name) if known.iter().any(|a| a == name) => Ok(vec![name.to_string()]),
        Some(name) => Err(TrademanError::AssetNotFound {
            asset: name.to_string(),
        }),
    }
}

fn load_series(
    data: &dyn MarketDataPort,
    asset: &str,
    settings: &BatchSettings,
    now: DateTime<Utc>,
) -> Computed<BarSeries> {
    let Some(since) = TimeDelta::try_days(settings.lookback_days)
        .and_then(|lookback| now.checked_sub_signed(lookback))
    else {
        return Computed::Failed(TrademanError::Data {
            reason: format!("lookback of {} days is out of range", settings.lookback_days),
        });
    };
    let bars = match data.fetch_bars(asset, settings.interval, since, Some(now)) {
        Ok(bars) => bars,
        Err(e) => return Computed::Failed(e),
    };
    if bars.len() < settings.min_bars.max(1) {
        return Computed::Skipped { bars: bars.len() };
    }
    match BarSeries::new(asset, settings.interval, bars) {
        Ok(series) => Computed::Ready(series),
        Err(e) => Computed::Failed(e),
    }
}

/// Computes the configured indicators for one asset (or every known asset)
/// and upserts the resulting records.
pub fn compute_indicators(
    data: &dyn MarketDataPort,
    store: &mut dyn SignalStorePort,
    asset: Option<&str>,
    settings: &BatchSettings,
    now: DateTime<Utc>,
) -> Result<BatchReport, TrademanError> {
    let assets = resolve_assets(data, asset)?;
    info!(assets = assets.len(), persist = %settings.persist, "computing indicators");

    let computed: Vec<(&str, Computed<Vec<IndicatorRecord>>)> = assets
        .par_iter()
        .map(|asset| {
            let outcome = match load_series(data, asset, settings, now) {
                Computed::Ready(series) => {
                    let set = compute_set(&series, &settings.indicators);
                    Computed::Ready(match settings.persist {
                        PersistMode::Latest => set.latest_records(),
                        PersistMode::All => set.records(),
                    })
                }
                Computed::Skipped { bars } => Computed::Skipped { bars },
                Computed::Failed(e) => Computed::Failed(e),
            };
            (asset.as_str(), outcome)
        })
        .collect();

    let mut report = BatchReport::default();
    for (asset, outcome) in computed {
        match outcome {
            Computed::Ready(records) => match store.upsert_indicators(&records) {
                Ok(written) => {
                    report.processed_assets += 1;
                    report.indicators_created += written;
                }
                Err(e) => report.fail(asset, &e),
            },
            Computed::Skipped { bars } => report.skip(asset, bars, settings.min_bars),
            Computed::Failed(e) => report.fail(asset, &e),
        }
    }
    info!(
        processed = report.processed_assets,
        skipped = report.skipped_assets,
        failed = report.errors.len(),
        indicators = report.indicators_created,
        "indicator run finished"
    );
    Ok(report)
}

/// Evaluates `strategy` for one asset (or every known asset). Each new
/// signal supersedes the asset's previously active ones.
pub fn compute_signals(
    data: &dyn MarketDataPort,
    store: &mut dyn SignalStorePort,
    asset: Option<&str>,
    strategy: &dyn Strategy,
    settings: &BatchSettings,
    now: DateTime<Utc>,
) -> Result<BatchReport, TrademanError> {
    let assets = resolve_assets(data, asset)?;
    info!(assets = assets.len(), strategy = strategy.name(), "computing signals");
    let required = strategy.required_indicators();

    let computed: Vec<(&str, Computed<Option<Signal>>)> = assets
        .par_iter()
        .map(|asset| {
            let outcome = match load_series(data, asset, settings, now) {
                Computed::Ready(series) => {
                    let set = compute_set(&series, &required);
                    match evaluate_signal(strategy, &series, &set, &settings.policy, now) {
                        Ok(signal) => Computed::Ready(signal),
                        Err(e) => Computed::Failed(e),
                    }
                }
                Computed::Skipped { bars } => Computed::Skipped { bars },
                Computed::Failed(e) => Computed::Failed(e),
            };
            (asset.as_str(), outcome)
        })
        .collect();

    let mut report = BatchReport::default();
    for (asset, outcome) in computed {
        match outcome {
            Computed::Ready(signal) => {
                report.processed_assets += 1;
                let Some(signal) = signal else { continue };
                match store_signal(store, signal, now) {
                    Ok(deactivated) => {
                        report.signals_created += 1;
                        report.deactivated_signals += deactivated;
                    }
                    Err(e) => report.fail(asset, &e),
                }
            }
            Computed::Skipped { bars } => report.skip(asset, bars, settings.min_bars),
            Computed::Failed(e) => report.fail(asset, &e),
        }
    }
    info!(
        processed = report.processed_assets,
        signals = report.signals_created,
        deactivated = report.deactivated_signals,
        failed = report.errors.len(),
        "signal run finished"
    );
    Ok(report)
}

fn store_signal(
    store: &mut dyn SignalStorePort,
    signal: Signal,
    now: DateTime<Utc>,
) -> Result<usize, TrademanError> {
    let prior = store.active_signals(Some(&signal.asset))?;
    let stale = plan_deactivations(&prior, std::slice::from_ref(&signal), now);
    store.insert_signal(signal)?;
    store.deactivate(&stale)
}

/// Deactivates every active signal whose `expires_at` is at or before `now`.
pub fn deactivate_expired_signals(
    store: &mut dyn SignalStorePort,
    now: DateTime<Utc>,
) -> Result<BatchReport, TrademanError> {
    let active = store.active_signals(None)?;
    let expired = plan_deactivations(&active, &[], now);
    let deactivated = store.deactivate(&expired)?;
    info!(deactivated, "expired signals deactivated");
    Ok(BatchReport {
        deactivated_signals: deactivated,
        ..BatchReport::default()
    })
}

/// Prior signals that should go inactive: expired at `now`, or superseded
/// by a new signal for the same asset at the same or a later timestamp.
pub fn plan_deactivations(
    prior: &[StoredSignal],
    new: &[Signal],
    now: DateTime<Utc>,
) -> Vec<SignalId> {
    prior
        .iter()
        .filter(|stored| stored.signal.is_active)
        .filter(|stored| {
            stored.signal.is_expired(now)
                || new.iter().any(|n| {
                    n.asset == stored.signal.asset && n.timestamp >= stored.signal.timestamp
                })
        })
        .map(|stored| stored.id)
        .collect()
}
