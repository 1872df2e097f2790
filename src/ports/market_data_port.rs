//! Market data access port trait.

use chrono::{DateTime, Utc};

use crate::domain::bar::Bar;
use crate::domain::error::TrademanError;
use crate::domain::interval::Interval;

/// Read-only source of bars.
///
/// `Sync` so the batch can fetch for several assets in parallel.
pub trait MarketDataPort: Sync {
    /// Symbols of all active assets, sorted.
    fn list_assets(&self) -> Result<Vec<String>, TrademanError>;

    /// Bars for `asset` at `interval` with `since <= timestamp <= until`,
    /// oldest first. An unknown asset fails with `AssetNotFound`.
    fn fetch_bars(
        &self,
        asset: &str,
        interval: Interval,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, TrademanError>;
}
