//! Persistence port for indicator rows and signals.

use crate::domain::error::TrademanError;
use crate::domain::indicator_engine::IndicatorRecord;
use crate::domain::signal::{Signal, SignalId, StoredSignal};

pub trait SignalStorePort {
    /// Inserts or replaces rows keyed by (asset, name, timestamp); returns
    /// the number of rows written.
    fn upsert_indicators(&mut self, records: &[IndicatorRecord]) -> Result<usize, TrademanError>;

    fn insert_signal(&mut self, signal: Signal) -> Result<SignalId, TrademanError>;

    /// Active signals, optionally restricted to one asset, oldest first.
    fn active_signals(&self, asset: Option<&str>) -> Result<Vec<StoredSignal>, TrademanError>;

    /// Marks signals inactive; returns how many were active before the call.
    fn deactivate(&mut self, ids: &[SignalId]) -> Result<usize, TrademanError>;
}
