//! Trading signal records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
    StrongBuy,
    StrongSell,
}

impl SignalType {
    pub const ALL: [SignalType; 5] = [
        SignalType::Buy,
        SignalType::Sell,
        SignalType::Hold,
        SignalType::StrongBuy,
        SignalType::StrongSell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "buy",
            SignalType::Sell => "sell",
            SignalType::Hold => "hold",
            SignalType::StrongBuy => "strong_buy",
            SignalType::StrongSell => "strong_sell",
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, SignalType::Buy | SignalType::StrongBuy)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, SignalType::Sell | SignalType::StrongSell)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered: `Weak < Moderate < Strong`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
}

impl SignalStrength {
    pub const ALL: [SignalStrength; 3] = [
        SignalStrength::Weak,
        SignalStrength::Moderate,
        SignalStrength::Strong,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStrength::Weak => "weak",
            SignalStrength::Moderate => "moderate",
            SignalStrength::Strong => "strong",
        }
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signal emitted by the signal engine.
///
/// Immutable once emitted; deactivation of superseded or expired signals is
/// bookkeeping done by the store, never by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub asset: String,
    pub timestamp: DateTime<Utc>,
    pub signal_type: SignalType,
    pub strength: SignalStrength,
    /// 0-100, two decimal places.
    pub confidence: f64,
    pub price: Decimal,
    pub target_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub strategy: String,
    pub rationale: String,
    pub indicators_used: Vec<String>,
    pub timeframe: String,
    pub is_active: bool,
    pub generated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Signal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Identifier assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(pub u64);

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signal as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSignal {
    pub id: SignalId,
    #[serde(flatten)]
    pub signal: Signal,
}
