//! Signal engine: turns rule votes into at most one signal per evaluation.
//!
//! Votes are tallied over the rules that fired (non-neutral):
//!
//! | condition                          | signal                      | strength |
//! |------------------------------------|-----------------------------|----------|
//! | nothing fired, or net = 0          | none (`hold` if requested)  | weak     |
//! | \|net\| >= 2 and unanimous         | `strong_buy`/`strong_sell`  | strong   |
//! | otherwise, one agreeing rule       | `buy`/`sell`                | weak     |
//! | otherwise                          | `buy`/`sell`                | moderate |
//!
//! Confidence is `100 * (agreeing / fired) * (agreeing / (agreeing + 1))`,
//! rounded to two decimals, so both agreement and corroboration raise it.
//! The rationale ends with `[agreeing/fired rules agree]`, which makes the
//! score reproducible from the text alone.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::bar_series::BarSeries;
use crate::domain::error::TrademanError;
use crate::domain::indicator_engine::IndicatorSet;
use crate::domain::rule::{RuleOutcome, SignalContext, Vote};
use crate::domain::signal::{Signal, SignalStrength, SignalType};
use crate::domain::strategy::Strategy;

pub const DEFAULT_EXPIRY_HOURS: i64 = 24;

/// Per-call knobs for turning votes into a signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPolicy {
    /// `None` means signals never expire.
    pub expiry: Option<TimeDelta>,
    /// Emit a `hold` instead of nothing when votes cancel out.
    pub emit_hold: bool,
    /// Percent above (buys) or below (sells) the price for the target.
    pub take_profit_pct: Option<Decimal>,
    /// Percent below (buys) or above (sells) the price for the stop.
    pub stop_loss_pct: Option<Decimal>,
}

impl Default for SignalPolicy {
    fn default() -> Self {
        Self {
            expiry: Some(TimeDelta::hours(DEFAULT_EXPIRY_HOURS)),
            emit_hold: false,
            take_profit_pct: None,
            stop_loss_pct: None,
        }
    }
}

/// Vote counts over the fired rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub bullish: usize,
    pub bearish: usize,
}

impl Tally {
    pub fn of(outcomes: &[RuleOutcome]) -> Self {
        outcomes.iter().fold(Tally::default(), |mut t, o| {
            match o.vote {
                Vote::Bullish => t.bullish += 1,
                Vote::Bearish => t.bearish += 1,
                Vote::Neutral => {}
            }
            t
        })
    }

    pub fn fired(&self) -> usize {
        self.bullish + self.bearish
    }

    pub fn net(&self) -> i64 {
        self.bullish as i64 - self.bearish as i64
    }

    /// Votes on the winning side; zero when the tally is even.
    pub fn agreeing(&self) -> usize {
        match self.net() {
            n if n > 0 => self.bullish,
            n if n < 0 => self.bearish,
            _ => 0,
        }
    }

    pub fn is_unanimous(&self) -> bool {
        self.fired() > 0 && (self.bullish == 0 || self.bearish == 0)
    }
}

/// Signal type and strength for a tally, `None` when there is no direction.
pub fn classify(tally: Tally) -> Option<(SignalType, SignalStrength)> {
    let net = tally.net();
    if tally.fired() == 0 || net == 0 {
        return None;
    }
    let bullish = net > 0;
    if net.abs() >= 2 && tally.is_unanimous() {
        let signal_type = if bullish {
            SignalType::StrongBuy
        } else {
            SignalType::StrongSell
        };
        return Some((signal_type, SignalStrength::Strong));
    }
    let signal_type = if bullish {
        SignalType::Buy
    } else {
        SignalType::Sell
    };
    let strength = if tally.agreeing() == 1 {
        SignalStrength::Weak
    } else {
        SignalStrength::Moderate
    };
    Some((signal_type, strength))
}

/// 0-100, two decimal places. Increases with both the agreement ratio and
/// the number of agreeing rules.
pub fn confidence(tally: Tally) -> f64 {
    let fired = tally.fired();
    let agreeing = tally.agreeing();
    if fired == 0 || agreeing == 0 {
        return 0.0;
    }
    let ratio = agreeing as f64 / fired as f64;
    let corroboration = agreeing as f64 / (agreeing as f64 + 1.0);
    (100.0 * ratio * corroboration * 100.0).round() / 100.0
}

/// Evaluates `strategy` at the latest bar.
///
/// Fails only when `indicators` was not computed over `bars`; missing or
/// warming-up indicators make their rules abstain instead.
pub fn evaluate_signal(
    strategy: &dyn Strategy,
    bars: &BarSeries,
    indicators: &IndicatorSet,
    policy: &SignalPolicy,
    generated_at: DateTime<Utc>,
) -> Result<Option<Signal>, TrademanError> {
    let outcomes = evaluate_rules(strategy, bars, indicators)?;
    Ok(decide(strategy.name(), bars, &outcomes, policy, generated_at))
}

/// Runs every rule of `strategy` and returns their outcomes in rule order.
pub fn evaluate_rules(
    strategy: &dyn Strategy,
    bars: &BarSeries,
    indicators: &IndicatorSet,
) -> Result<Vec<RuleOutcome>, TrademanError> {
    check_alignment(bars, indicators)?;
    Ok(strategy.evaluate(&SignalContext::new(bars, indicators)))
}

fn check_alignment(bars: &BarSeries, indicators: &IndicatorSet) -> Result<(), TrademanError> {
    let aligned = indicators.len() == bars.len()
        && bars
            .bars()
            .iter()
            .zip(indicators.timestamps())
            .all(|(b, ts)| b.timestamp == *ts);
    if aligned {
        Ok(())
    } else {
        Err(TrademanError::MisalignedIndicators {
            indicator: format!("indicator set for {}", indicators.asset()),
            expected: bars.len(),
            actual: indicators.len(),
        })
    }
}

/// Applies the vote policy to already evaluated outcomes.
pub fn decide(
    strategy: &str,
    bars: &BarSeries,
    outcomes: &[RuleOutcome],
    policy: &SignalPolicy,
    generated_at: DateTime<Utc>,
) -> Option<Signal> {
    let tally = Tally::of(outcomes);
    let fired: Vec<&RuleOutcome> = outcomes.iter().filter(|o| o.fired()).collect();
    let readings = fired
        .iter()
        .map(|o| o.reading.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    let (signal_type, strength, confidence, rationale) = match classify(tally) {
        Some((signal_type, strength)) => (
            signal_type,
            strength,
            confidence(tally),
            format!(
                "{} [{}/{} rules agree]",
                readings,
                tally.agreeing(),
                tally.fired()
            ),
        ),
        None if policy.emit_hold => {
            let (confidence, rationale) = if tally.fired() == 0 {
                (0.0, "No rules fired".to_string())
            } else {
                (
                    50.0,
                    format!(
                        "Mixed signals: {} [{}/{} rules agree]",
                        readings,
                        tally.agreeing(),
                        tally.fired()
                    ),
                )
            };
            (SignalType::Hold, SignalStrength::Weak, confidence, rationale)
        }
        None => {
            debug!(
                asset = bars.asset(),
                strategy,
                bullish = tally.bullish,
                bearish = tally.bearish,
                "no signal"
            );
            return None;
        }
    };

    let latest = bars.latest();
    let price = latest.close;
    let (target_price, stop_loss) = price_levels(price, signal_type, policy);
    let signal = Signal {
        asset: bars.asset().to_string(),
        timestamp: latest.timestamp,
        signal_type,
        strength,
        confidence,
        price,
        target_price,
        stop_loss,
        strategy: strategy.to_string(),
        rationale,
        indicators_used: indicators_used(&fired),
        timeframe: bars.interval().code().to_string(),
        is_active: true,
        generated_at,
        expires_at: policy
            .expiry
            .and_then(|horizon| generated_at.checked_add_signed(horizon)),
    };
    debug!(
        asset = %signal.asset,
        signal_type = %signal.signal_type,
        confidence = signal.confidence,
        "signal emitted"
    );
    Some(signal)
}

/// Names consulted by the fired rules, deduplicated, in rule order.
fn indicators_used(fired: &[&RuleOutcome]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in fired.iter().flat_map(|o| o.indicators.iter()) {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
}

fn price_levels(
    price: Decimal,
    signal_type: SignalType,
    policy: &SignalPolicy,
) -> (Option<Decimal>, Option<Decimal>) {
    let hundred = Decimal::ONE_HUNDRED;
    let up = |pct: Decimal| (price * (hundred + pct) / hundred).round_dp(8);
    let down = |pct: Decimal| (price * (hundred - pct) / hundred).round_dp(8);
    if signal_type.is_bullish() {
        (policy.take_profit_pct.map(up), policy.stop_loss_pct.map(down))
    } else if signal_type.is_bearish() {
        (policy.take_profit_pct.map(down), policy.stop_loss_pct.map(up))
    } else {
        (None, None)
    }
}
