//! Strategies: named rule sets the signal engine evaluates.
//!
//! A strategy only casts votes; turning votes into a [`Signal`] is the
//! engine's job, so every strategy is graded by the same policy.
//!
//! [`Signal`]: crate::domain::signal::Signal

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::error::TrademanError;
use crate::domain::indicator::IndicatorType;
use crate::domain::rule::{RuleOutcome, SignalContext, SignalRule};

pub const COMPOSITE_STRATEGY: &str = "RSI_SMA_MACD_BB_Composite";
pub const TREND_STRATEGY: &str = "RSI_MA_MACD_Combined";
pub const DEFAULT_STRATEGY: &str = COMPOSITE_STRATEGY;

/// Common interface for anything the engine can evaluate.
///
/// `Send + Sync` so one registry can be shared by the parallel batch workers.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Indicators that must be computed for `evaluate` to see every input.
    fn required_indicators(&self) -> Vec<IndicatorType>;

    /// One outcome per rule, in rule order.
    fn evaluate(&self, ctx: &SignalContext<'_>) -> Vec<RuleOutcome>;
}

/// RSI thresholds shared by the built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleThresholds {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: crate::domain::rule::DEFAULT_RSI_OVERSOLD,
            rsi_overbought: crate::domain::rule::DEFAULT_RSI_OVERBOUGHT,
        }
    }
}

/// A strategy made of an ordered list of [`SignalRule`]s.
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: String,
    rules: Vec<SignalRule>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<SignalRule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    /// RSI thresholds, SMA20/50 crossover, MACD signal-line crossover and
    /// Bollinger band touches.
    pub fn composite(thresholds: RuleThresholds) -> Self {
        Self::new(
            COMPOSITE_STRATEGY,
            vec![
                rsi_rule(thresholds),
                SignalRule::SmaCrossover { fast: 20, slow: 50 },
                SignalRule::MacdCrossover {
                    fast: 12,
                    slow: 26,
                    signal: 9,
                },
                SignalRule::BollingerReversion {
                    period: 20,
                    stddev_mult_x100: 200,
                },
            ],
        )
    }

    /// RSI thresholds, SMA20/50 trend position and MACD momentum.
    pub fn trend(thresholds: RuleThresholds) -> Self {
        Self::new(
            TREND_STRATEGY,
            vec![
                rsi_rule(thresholds),
                SignalRule::SmaTrend { fast: 20, slow: 50 },
                SignalRule::MacdMomentum {
                    fast: 12,
                    slow: 26,
                    signal: 9,
                },
            ],
        )
    }

    pub fn rules(&self) -> &[SignalRule] {
        &self.rules
    }
}

fn rsi_rule(thresholds: RuleThresholds) -> SignalRule {
    SignalRule::RsiThreshold {
        period: 14,
        oversold: thresholds.rsi_oversold,
        overbought: thresholds.rsi_overbought,
    }
}

impl Strategy for RuleSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_indicators(&self) -> Vec<IndicatorType> {
        let mut types = Vec::new();
        for t in self.rules.iter().flat_map(SignalRule::required_indicators) {
            if !types.contains(&t) {
                types.push(t);
            }
        }
        types
    }

    fn evaluate(&self, ctx: &SignalContext<'_>) -> Vec<RuleOutcome> {
        self.rules.iter().map(|rule| rule.evaluate(ctx)).collect()
    }
}

/// Strategies addressable by name.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding both built-in strategies.
    pub fn with_builtins(thresholds: RuleThresholds) -> Self {
        let mut registry = Self::new();
        for strategy in [RuleSet::composite(thresholds), RuleSet::trend(thresholds)] {
            registry
                .strategies
                .insert(strategy.name().to_string(), Arc::new(strategy));
        }
        registry
    }

    pub fn register(&mut self, strategy: Arc<dyn Strategy>) -> Result<(), TrademanError> {
        let name = strategy.name().to_string();
        if self.strategies.contains_key(&name) {
            return Err(TrademanError::DuplicateStrategy { name });
        }
        self.strategies.insert(name, strategy);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Strategy>, TrademanError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| TrademanError::UnknownStrategy {
                name: name.to_string(),
            })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}
