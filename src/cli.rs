//! CLI definition and dispatch.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::memory_store::MemoryStore;
use crate::domain::analysis::analyze;
use crate::domain::bar_series::BarSeries;
use crate::domain::batch::{self, BatchReport};
use crate::domain::config_validation::{
    batch_settings, data_dir, interval, rule_thresholds, signal_policy, strategy_name,
    validate_config,
};
use crate::domain::error::TrademanError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::indicator_engine::{DEFAULT_REQUEST, STANDARD_CATALOG, parse_indicator_request};
use crate::domain::interval::Interval;
use crate::domain::signal::{SignalStrength, SignalType};
use crate::domain::strategy::StrategyRegistry;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::report_port::ReportPort;
use crate::ports::signal_store_port::SignalStorePort;

#[derive(Parser, Debug)]
#[command(name = "trademan", about = "Technical indicators and trading signals over OHLCV bars")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute indicators and evaluate the configured strategy for one symbol
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        symbol: String,
        /// Indicator families or canonical names, e.g. sma,rsi,EMA_10
        #[arg(short, long, value_delimiter = ',')]
        indicators: Vec<String>,
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the indicator, signal and expiry batch against the data directory
    Batch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        symbol: Option<String>,
        /// Evaluate as of this date instead of now
        #[arg(long, value_parser = parse_date)]
        as_of: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List supported indicators, signal types, strengths and strategies
    Catalog,
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Analyze {
            config,
            symbol,
            indicators,
            start,
            end,
            output,
        } => run_analyze(&config, &symbol, &indicators, start, end, output.as_deref()),
        Command::Batch {
            config,
            symbol,
            as_of,
            output,
        } => run_batch(&config, symbol.as_deref(), as_of, output.as_deref()),
        Command::Catalog => run_catalog(),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TrademanError> {
    info!(path = %path.display(), "loading config");
    let config = FileConfigAdapter::from_file(path)?;
    validate_config(&config)?;
    Ok(config)
}

fn output_sink(path: Option<&Path>) -> Result<Box<dyn Write>, TrademanError> {
    Ok(match path {
        Some(p) => Box::new(File::create(p)?),
        None => Box::new(io::stdout()),
    })
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + chrono::TimeDelta::days(1) - chrono::TimeDelta::seconds(1)
}

fn registry(config: &dyn ConfigPort) -> Result<StrategyRegistry, TrademanError> {
    Ok(StrategyRegistry::with_builtins(rule_thresholds(config)?))
}

fn run_analyze(
    config_path: &Path,
    symbol: &str,
    requested: &[String],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output: Option<&Path>,
) -> Result<(), TrademanError> {
    let config = load_config(config_path)?;
    let interval = interval(&config)?;
    let data = CsvAdapter::new(data_dir(&config)?, interval);

    let types = if requested.is_empty() {
        parse_indicator_request(&DEFAULT_REQUEST)?
    } else {
        parse_indicator_request(requested)?
    };
    let strategy = registry(&config)?.get(&strategy_name(&config)?)?;
    let policy = signal_policy(&config)?;
    let thresholds = rule_thresholds(&config)?;

    let bars = data.fetch_bars(symbol, interval, DateTime::<Utc>::MIN_UTC, None)?;
    let series = BarSeries::new(symbol, interval, bars)?
        .window(start.map(start_of_day), end.map(end_of_day))?;
    info!(
        symbol,
        bars = series.len(),
        indicators = types.len(),
        strategy = strategy.name(),
        "analyzing"
    );

    let analysis = analyze(&series, &types, strategy.as_ref(), &policy, Utc::now())?;
    let mut reporter = JsonReportAdapter::new(output_sink(output)?, true);
    reporter.write_analysis(&analysis.report(&series, thresholds))
}

fn run_batch(
    config_path: &Path,
    symbol: Option<&str>,
    as_of: Option<NaiveDate>,
    output: Option<&Path>,
) -> Result<(), TrademanError> {
    let config = load_config(config_path)?;
    let settings = batch_settings(&config)?;
    let data = CsvAdapter::new(data_dir(&config)?, settings.interval);
    let strategy = registry(&config)?.get(&strategy_name(&config)?)?;
    let now = as_of.map(end_of_day).unwrap_or_else(Utc::now);
    let mut store = MemoryStore::new();

    let indicators = batch::compute_indicators(&data, &mut store, symbol, &settings, now)?;
    let signals =
        batch::compute_signals(&data, &mut store, symbol, strategy.as_ref(), &settings, now)?;
    let expiry = batch::deactivate_expired_signals(&mut store, now)?;

    let runs: [(&str, BatchReport); 3] = [
        ("indicators", indicators),
        ("signals", signals),
        ("expiry", expiry),
    ];
    let active = store.active_signals(None)?;
    let mut reporter = JsonReportAdapter::new(output_sink(output)?, true);
    reporter.write_batch(&runs, &active)
}

fn run_catalog() -> Result<(), TrademanError> {
    let registry = StrategyRegistry::with_builtins(Default::default());
    let catalog = json!({
        "indicator_families": IndicatorKind::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
        "standard_indicators": STANDARD_CATALOG
            .iter()
            .map(|t| json!({ "name": t.name(), "type": t.kind(), "parameters": t.parameters() }))
            .collect::<Vec<_>>(),
        "signal_types": SignalType::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        "strengths": SignalStrength::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        "strategies": registry.names(),
        "intervals": Interval::ALL.iter().map(|i| i.code()).collect::<Vec<_>>(),
    });
    let mut out = io::stdout();
    serde_json::to_writer_pretty(&mut out, &catalog)?;
    writeln!(out)?;
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), TrademanError> {
    let config = load_config(config_path)?;
    let name = strategy_name(&config)?;
    registry(&config)?.get(&name)?;
    println!("Configuration valid (strategy {name})");
    Ok(())
}
