//! Signal rules.
//!
//! Each rule reads the latest indicator values (and the previous point, for
//! crossovers) and casts one vote. A rule whose inputs are missing or still
//! warming up abstains with a neutral vote; rules never fail.
//!
//! Crossover semantics: `left` crosses above `right` when
//! `left_prev <= right_prev && left_curr > right_curr` (mirror for below).

use serde::{Deserialize, Serialize};

use crate::domain::bar_series::BarSeries;
use crate::domain::indicator::{IndicatorType, IndicatorValue};
use crate::domain::indicator_engine::IndicatorSet;

pub const DEFAULT_RSI_OVERSOLD: f64 = 30.0;
pub const DEFAULT_RSI_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    RsiThreshold,
    SmaCrossover,
    MacdCrossover,
    BollingerReversion,
    SmaTrend,
    MacdMomentum,
}

/// Result of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: RuleKind,
    pub vote: Vote,
    /// Human-readable reading, e.g. "RSI oversold (28.5)".
    pub reading: String,
    /// Canonical names of the indicators this rule consulted.
    pub indicators: Vec<String>,
}

impl RuleOutcome {
    pub fn fired(&self) -> bool {
        self.vote != Vote::Neutral
    }
}

/// Read-only view the rules evaluate against.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext<'a> {
    pub bars: &'a BarSeries,
    pub indicators: &'a IndicatorSet,
}

impl<'a> SignalContext<'a> {
    pub fn new(bars: &'a BarSeries, indicators: &'a IndicatorSet) -> Self {
        Self { bars, indicators }
    }

    pub fn latest(&self, indicator_type: &IndicatorType) -> Option<IndicatorValue> {
        self.indicators.get(indicator_type)?.latest()
    }

    pub fn previous(&self, indicator_type: &IndicatorType) -> Option<IndicatorValue> {
        let series = self.indicators.get(indicator_type)?;
        let len = series.values.len();
        if len < 2 {
            return None;
        }
        series.value_at(len - 2)
    }

    pub fn latest_close(&self) -> f64 {
        self.bars.latest().close_f64()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalRule {
    /// RSI below `oversold` → bullish; above `overbought` → bearish.
    RsiThreshold {
        period: usize,
        oversold: f64,
        overbought: f64,
    },
    /// SMA(fast) crossing SMA(slow) between the last two points.
    SmaCrossover { fast: usize, slow: usize },
    /// MACD line crossing its signal line between the last two points.
    MacdCrossover {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    /// Close at/below the lower band → bullish; at/above the upper → bearish.
    BollingerReversion {
        period: usize,
        stddev_mult_x100: u32,
    },
    /// Relative position of SMA(fast) vs SMA(slow) at the latest point.
    SmaTrend { fast: usize, slow: usize },
    /// MACD above its signal line and above zero → bullish; below both → bearish.
    MacdMomentum {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl SignalRule {
    pub fn rsi() -> Self {
        SignalRule::RsiThreshold {
            period: 14,
            oversold: DEFAULT_RSI_OVERSOLD,
            overbought: DEFAULT_RSI_OVERBOUGHT,
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            SignalRule::RsiThreshold { .. } => RuleKind::RsiThreshold,
            SignalRule::SmaCrossover { .. } => RuleKind::SmaCrossover,
            SignalRule::MacdCrossover { .. } => RuleKind::MacdCrossover,
            SignalRule::BollingerReversion { .. } => RuleKind::BollingerReversion,
            SignalRule::SmaTrend { .. } => RuleKind::SmaTrend,
            SignalRule::MacdMomentum { .. } => RuleKind::MacdMomentum,
        }
    }

    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        match *self {
            SignalRule::RsiThreshold { period, .. } => vec![IndicatorType::Rsi(period)],
            SignalRule::SmaCrossover { fast, slow } | SignalRule::SmaTrend { fast, slow } => {
                vec![IndicatorType::Sma(fast), IndicatorType::Sma(slow)]
            }
            SignalRule::MacdCrossover { fast, slow, signal }
            | SignalRule::MacdMomentum { fast, slow, signal } => {
                vec![IndicatorType::Macd { fast, slow, signal }]
            }
            SignalRule::BollingerReversion {
                period,
                stddev_mult_x100,
            } => vec![IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            }],
        }
    }

    pub fn evaluate(&self, ctx: &SignalContext<'_>) -> RuleOutcome {
        let indicators = self
            .required_indicators()
            .iter()
            .map(IndicatorType::name)
            .collect();
        let (vote, reading) = match *self {
            SignalRule::RsiThreshold {
                period,
                oversold,
                overbought,
            } => rsi_vote(ctx, period, oversold, overbought),
            SignalRule::SmaCrossover { fast, slow } => sma_cross_vote(ctx, fast, slow),
            SignalRule::MacdCrossover { fast, slow, signal } => {
                macd_cross_vote(ctx, IndicatorType::Macd { fast, slow, signal })
            }
            SignalRule::BollingerReversion {
                period,
                stddev_mult_x100,
            } => bollinger_vote(
                ctx,
                IndicatorType::Bollinger {
                    period,
                    stddev_mult_x100,
                },
            ),
            SignalRule::SmaTrend { fast, slow } => sma_trend_vote(ctx, fast, slow),
            SignalRule::MacdMomentum { fast, slow, signal } => {
                macd_momentum_vote(ctx, IndicatorType::Macd { fast, slow, signal })
            }
        };
        RuleOutcome {
            rule: self.kind(),
            vote,
            reading,
            indicators,
        }
    }
}

fn abstain(indicator: &IndicatorType) -> (Vote, String) {
    (Vote::Neutral, format!("{} unavailable", indicator.name()))
}

fn simple(value: Option<IndicatorValue>) -> Option<f64> {
    match value? {
        IndicatorValue::Simple(v) => Some(v),
        _ => None,
    }
}

/// (line, signal) when both are defined.
fn macd_pair(value: Option<IndicatorValue>) -> Option<(f64, f64)> {
    match value? {
        IndicatorValue::Macd {
            line,
            signal: Some(signal),
            ..
        } => Some((line, signal)),
        _ => None,
    }
}

fn cross(prev: (f64, f64), curr: (f64, f64)) -> Vote {
    let (left_prev, right_prev) = prev;
    let (left_curr, right_curr) = curr;
    if left_prev <= right_prev && left_curr > right_curr {
        Vote::Bullish
    } else if left_prev >= right_prev && left_curr < right_curr {
        Vote::Bearish
    } else {
        Vote::Neutral
    }
}

fn rsi_vote(ctx: &SignalContext<'_>, period: usize, oversold: f64, overbought: f64) -> (Vote, String) {
    let rsi_type = IndicatorType::Rsi(period);
    let Some(rsi) = simple(ctx.latest(&rsi_type)) else {
        return abstain(&rsi_type);
    };
    if rsi < oversold {
        (Vote::Bullish, format!("RSI oversold ({:.1})", rsi))
    } else if rsi > overbought {
        (Vote::Bearish, format!("RSI overbought ({:.1})", rsi))
    } else {
        (Vote::Neutral, format!("RSI neutral ({:.1})", rsi))
    }
}

fn sma_cross_vote(ctx: &SignalContext<'_>, fast: usize, slow: usize) -> (Vote, String) {
    let (fast_type, slow_type) = (IndicatorType::Sma(fast), IndicatorType::Sma(slow));
    let points = (
        simple(ctx.previous(&fast_type)),
        simple(ctx.previous(&slow_type)),
        simple(ctx.latest(&fast_type)),
        simple(ctx.latest(&slow_type)),
    );
    let (Some(fast_prev), Some(slow_prev), Some(fast_curr), Some(slow_curr)) = points else {
        return abstain(if points.2.is_none() || points.0.is_none() {
            &fast_type
        } else {
            &slow_type
        });
    };
    match cross((fast_prev, slow_prev), (fast_curr, slow_curr)) {
        Vote::Bullish => (
            Vote::Bullish,
            format!(
                "SMA{} crossed above SMA{} ({:.2} > {:.2})",
                fast, slow, fast_curr, slow_curr
            ),
        ),
        Vote::Bearish => (
            Vote::Bearish,
            format!(
                "SMA{} crossed below SMA{} ({:.2} < {:.2})",
                fast, slow, fast_curr, slow_curr
            ),
        ),
        Vote::Neutral => {
            let side = if fast_curr > slow_curr { "above" } else { "at or below" };
            (
                Vote::Neutral,
                format!("SMA{} {} SMA{}, no crossover", fast, side, slow),
            )
        }
    }
}

fn macd_cross_vote(ctx: &SignalContext<'_>, macd_type: IndicatorType) -> (Vote, String) {
    let (Some(prev), Some(curr)) = (
        macd_pair(ctx.previous(&macd_type)),
        macd_pair(ctx.latest(&macd_type)),
    ) else {
        return abstain(&macd_type);
    };
    let (line, signal) = curr;
    match cross(prev, curr) {
        Vote::Bullish => (
            Vote::Bullish,
            format!("MACD crossed above signal line ({:.4} > {:.4})", line, signal),
        ),
        Vote::Bearish => (
            Vote::Bearish,
            format!("MACD crossed below signal line ({:.4} < {:.4})", line, signal),
        ),
        Vote::Neutral => (
            Vote::Neutral,
            format!("MACD histogram {:.4}, no crossover", line - signal),
        ),
    }
}

fn bollinger_vote(ctx: &SignalContext<'_>, bb_type: IndicatorType) -> (Vote, String) {
    let Some(IndicatorValue::Bollinger { upper, lower, .. }) = ctx.latest(&bb_type) else {
        return abstain(&bb_type);
    };
    let close = ctx.latest_close();
    if close <= lower {
        (
            Vote::Bullish,
            format!("Close at or below lower Bollinger band ({:.2} <= {:.2})", close, lower),
        )
    } else if close >= upper {
        (
            Vote::Bearish,
            format!("Close at or above upper Bollinger band ({:.2} >= {:.2})", close, upper),
        )
    } else {
        (Vote::Neutral, "Close inside Bollinger bands".to_string())
    }
}

fn sma_trend_vote(ctx: &SignalContext<'_>, fast: usize, slow: usize) -> (Vote, String) {
    let (fast_type, slow_type) = (IndicatorType::Sma(fast), IndicatorType::Sma(slow));
    let Some(fast_val) = simple(ctx.latest(&fast_type)) else {
        return abstain(&fast_type);
    };
    let Some(slow_val) = simple(ctx.latest(&slow_type)) else {
        return abstain(&slow_type);
    };
    if fast_val > slow_val {
        (
            Vote::Bullish,
            format!("SMA {} above SMA {} (bullish trend)", fast, slow),
        )
    } else if fast_val < slow_val {
        (
            Vote::Bearish,
            format!("SMA {} below SMA {} (bearish trend)", fast, slow),
        )
    } else {
        (Vote::Neutral, format!("SMA {} level with SMA {}", fast, slow))
    }
}

fn macd_momentum_vote(ctx: &SignalContext<'_>, macd_type: IndicatorType) -> (Vote, String) {
    let Some((line, signal)) = macd_pair(ctx.latest(&macd_type)) else {
        return abstain(&macd_type);
    };
    if line > signal && line > 0.0 {
        (
            Vote::Bullish,
            format!("MACD bullish momentum ({:.4} above signal {:.4})", line, signal),
        )
    } else if line < signal && line < 0.0 {
        (
            Vote::Bearish,
            format!("MACD bearish momentum ({:.4} below signal {:.4})", line, signal),
        )
    } else {
        (Vote::Neutral, "MACD momentum unconfirmed".to_string())
    }
}
