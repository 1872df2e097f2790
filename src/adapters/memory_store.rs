//! In-memory signal store.
//!
//! Backs the CLI batch command and the tests. Indicator rows are keyed by
//! (asset, name, timestamp) so re-running a batch overwrites instead of
//! duplicating.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::error::TrademanError;
use crate::domain::indicator_engine::IndicatorRecord;
use crate::domain::signal::{Signal, SignalId, StoredSignal};
use crate::ports::signal_store_port::SignalStorePort;

type IndicatorKey = (String, String, DateTime<Utc>);

#[derive(Debug, Default)]
pub struct MemoryStore {
    indicators: BTreeMap<IndicatorKey, IndicatorRecord>,
    signals: Vec<StoredSignal>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored indicator row, ordered by (asset, name, timestamp).
    pub fn indicators(&self) -> impl Iterator<Item = &IndicatorRecord> {
        self.indicators.values()
    }

    pub fn indicator_count(&self) -> usize {
        self.indicators.len()
    }

    /// Every signal ever inserted, active or not, in insertion order.
    pub fn signals(&self) -> &[StoredSignal] {
        &self.signals
    }

    pub fn signal(&self, id: SignalId) -> Option<&StoredSignal> {
        self.signals.iter().find(|s| s.id == id)
    }
}

impl SignalStorePort for MemoryStore {
    fn upsert_indicators(&mut self, records: &[IndicatorRecord]) -> Result<usize, TrademanError> {
        for record in records {
            let key = (record.asset.clone(), record.name.clone(), record.timestamp);
            self.indicators.insert(key, record.clone());
        }
        Ok(records.len())
    }

    fn insert_signal(&mut self, signal: Signal) -> Result<SignalId, TrademanError> {
        self.next_id += 1;
        let id = SignalId(self.next_id);
        self.signals.push(StoredSignal { id, signal });
        Ok(id)
    }

    fn active_signals(&self, asset: Option<&str>) -> Result<Vec<StoredSignal>, TrademanError> {
        Ok(self
            .signals
            .iter()
            .filter(|s| s.signal.is_active)
            .filter(|s| asset.is_none_or(|a| s.signal.asset == a))
            .cloned()
            .collect())
    }

    fn deactivate(&mut self, ids: &[SignalId]) -> Result<usize, TrademanError> {
        let mut count = 0;
        for stored in self.signals.iter_mut() {
            if stored.signal.is_active && ids.contains(&stored.id) {
                stored.signal.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }
}
