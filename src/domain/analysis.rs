//! On-demand analysis: indicators plus a signal for one asset, no persistence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::bar_series::BarSeries;
use crate::domain::error::TrademanError;
use crate::domain::indicator::{IndicatorType, IndicatorValue};
use crate::domain::indicator_engine::{IndicatorRecord, IndicatorSet, compute_indicators};
use crate::domain::rule::RuleOutcome;
use crate::domain::signal::Signal;
use crate::domain::signal_engine::{SignalPolicy, decide, evaluate_rules};
use crate::domain::strategy::{RuleThresholds, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendReading {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MomentumReading {
    Overbought,
    Oversold,
    Neutral,
}

/// Everything computed for one request.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub indicators: IndicatorSet,
    pub outcomes: Vec<RuleOutcome>,
    pub signal: Option<Signal>,
}

/// Computes `requested` plus whatever `strategy` needs, then evaluates it.
pub fn analyze(
    series: &BarSeries,
    requested: &[IndicatorType],
    strategy: &dyn Strategy,
    policy: &SignalPolicy,
    now: DateTime<Utc>,
) -> Result<Analysis, TrademanError> {
    let mut types = requested.to_vec();
    for t in strategy.required_indicators() {
        if !types.contains(&t) {
            types.push(t);
        }
    }
    let indicators = compute_indicators(series, &types);
    let outcomes = evaluate_rules(strategy, series, &indicators)?;
    let signal = decide(strategy.name(), series, &outcomes, policy, now);
    Ok(Analysis {
        indicators,
        outcomes,
        signal,
    })
}

/// Latest readings in a flat shape for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub asset: String,
    pub timeframe: String,
    pub latest_close: Decimal,
    pub latest_date: DateTime<Utc>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_20: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub trend: TrendReading,
    pub momentum: MomentumReading,
    pub rule_readings: Vec<String>,
}

impl Analysis {
    pub fn summary(&self, series: &BarSeries, thresholds: RuleThresholds) -> AnalysisSummary {
        let latest = series.latest();
        let simple = |t: IndicatorType| match self.latest(&t) {
            Some(IndicatorValue::Simple(v)) => Some(v),
            _ => None,
        };
        let (macd, macd_signal) = match self.latest(&IndicatorType::MACD_DEFAULT) {
            Some(IndicatorValue::Macd { line, signal, .. }) => (Some(line), signal),
            _ => (None, None),
        };
        let (bb_upper, bb_middle, bb_lower) = match self.latest(&IndicatorType::BOLLINGER_DEFAULT) {
            Some(IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            }) => (Some(upper), Some(middle), Some(lower)),
            _ => (None, None, None),
        };

        let rsi = simple(IndicatorType::Rsi(14));
        let sma_20 = simple(IndicatorType::Sma(20));
        let sma_50 = simple(IndicatorType::Sma(50));
        let trend = match (sma_20, sma_50) {
            (Some(fast), Some(slow)) if fast > slow => TrendReading::Bullish,
            (Some(fast), Some(slow)) if fast < slow => TrendReading::Bearish,
            _ => TrendReading::Neutral,
        };
        let momentum = match rsi {
            Some(v) if v > thresholds.rsi_overbought => MomentumReading::Overbought,
            Some(v) if v < thresholds.rsi_oversold => MomentumReading::Oversold,
            _ => MomentumReading::Neutral,
        };

        AnalysisSummary {
            asset: series.asset().to_string(),
            timeframe: series.interval().code().to_string(),
            latest_close: latest.close,
            latest_date: latest.timestamp,
            rsi,
            macd,
            macd_signal,
            sma_20,
            sma_50,
            ema_20: simple(IndicatorType::Ema(20)),
            bb_upper,
            bb_middle,
            bb_lower,
            trend,
            momentum,
            rule_readings: self.outcomes.iter().map(|o| o.reading.clone()).collect(),
        }
    }

    pub fn report(&self, series: &BarSeries, thresholds: RuleThresholds) -> AnalysisReport {
        AnalysisReport {
            summary: self.summary(series, thresholds),
            indicators: self.indicators.records(),
            signals: self.signal.iter().cloned().collect(),
        }
    }

    fn latest(&self, indicator_type: &IndicatorType) -> Option<IndicatorValue> {
        self.indicators.get(indicator_type)?.latest()
    }
}

/// Serializable result of an on-demand analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: AnalysisSummary,
    pub indicators: Vec<IndicatorRecord>,
    pub signals: Vec<Signal>,
}
