//! CLI integration tests: config files and CSV data on disk, driven through
//! the same entry points the binary uses.
//!
//! Tests cover:
//! - Config loading and validation (load_config)
//! - Batch command end to end against a CSV directory
//! - Analyze command output shape
//! - CSV data feeding the library batch directly

mod common;

use common::*;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use trademan::adapters::csv_adapter::CsvAdapter;
use trademan::adapters::memory_store::MemoryStore;
use trademan::cli::{self, Cli, Command};
use trademan::domain::batch;
use trademan::domain::config_validation::{batch_settings, data_dir, strategy_name};
use trademan::domain::error::TrademanError;
use trademan::domain::interval::Interval;
use trademan::domain::strategy::{RuleThresholds, StrategyRegistry};
use trademan::ports::market_data_port::MarketDataPort;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_csv(dir: &Path, symbol: &str, closes: &[f64]) {
    let mut body = String::from("timestamp,open,high,low,close,volume\n");
    for (i, c) in closes.iter().enumerate() {
        body.push_str(&format!(
            "{},{c},{c},{c},{c},1000\n",
            day(i).format("%Y-%m-%d")
        ));
    }
    fs::write(dir.join(format!("{}_1d.csv", symbol)), body).unwrap();
}

/// Data directory with two signalling assets and one too short to evaluate.
fn data_dir_fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "AAPL", &crossover_with_oversold_rsi());
    write_csv(dir.path(), "MSFT", &oversold_rsi_only());
    write_csv(dir.path(), "TINY", &[100.0, 101.0, 102.0]);
    dir
}

fn config_for(data: &Path, extra: &str) -> tempfile::NamedTempFile {
    write_temp_ini(&format!(
        "[data]\npath = {}\ninterval = 1d\n\n{}",
        data.display(),
        extra
    ))
}

fn read_json(path: &PathBuf) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

mod config_loading {
    use super::*;

    #[test]
    fn valid_config_loads() {
        let data = data_dir_fixture();
        let ini = config_for(
            data.path(),
            "[signals]\nstrategy = RSI_MA_MACD_Combined\nexpiry_hours = 12\n",
        );

        let config = cli::load_config(ini.path()).unwrap();
        assert_eq!(data_dir(&config).unwrap(), data.path());
        assert_eq!(strategy_name(&config).unwrap(), "RSI_MA_MACD_Combined");
        let settings = batch_settings(&config).unwrap();
        assert_eq!(settings.policy.expiry, Some(chrono::TimeDelta::hours(12)));
    }

    #[test]
    fn missing_file_is_error() {
        let err = cli::load_config(Path::new("/nonexistent/trademan.ini")).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigParse { .. }));
    }

    #[test]
    fn invalid_value_is_rejected_at_load() {
        let data = data_dir_fixture();
        let ini = config_for(data.path(), "[indicators]\npersist = sometimes\n");
        let err = cli::load_config(ini.path()).unwrap_err();
        assert!(matches!(err, TrademanError::ConfigInvalid { key, .. } if key == "persist"));
    }

    #[test]
    fn unknown_strategy_is_reported() {
        let data = data_dir_fixture();
        let ini = config_for(data.path(), "[signals]\nstrategy = Moonshot\n");
        let config = cli::load_config(ini.path()).unwrap();
        let name = strategy_name(&config).unwrap();

        let err = StrategyRegistry::with_builtins(RuleThresholds::default())
            .get(&name)
            .err()
            .unwrap();
        assert!(matches!(err, TrademanError::UnknownStrategy { name } if name == "Moonshot"));
    }
}

mod commands {
    use super::*;

    #[test]
    fn batch_writes_runs_and_active_signals() {
        let data = data_dir_fixture();
        let ini = config_for(data.path(), "");
        let out_dir = tempfile::tempdir().unwrap();
        let out = out_dir.path().join("batch.json");

        cli::run(Cli {
            command: Command::Batch {
                config: ini.path().to_path_buf(),
                symbol: None,
                as_of: chrono::NaiveDate::from_ymd_opt(2024, 3, 20),
                output: Some(out.clone()),
            },
        });

        let json = read_json(&out);
        let runs = json["runs"].as_array().unwrap();
        let stages: Vec<&str> = runs.iter().map(|r| r["stage"].as_str().unwrap()).collect();
        assert_eq!(stages, vec!["indicators", "signals", "expiry"]);

        let indicators = &runs[0]["report"];
        assert_eq!(indicators["processed_assets"], 2);
        assert_eq!(indicators["skipped_assets"], 1);

        let signals = &runs[1]["report"];
        assert_eq!(signals["signals_created"], 2);

        let active = json["active_signals"].as_array().unwrap();
        assert_eq!(active.len(), 2);
        let aapl = active.iter().find(|s| s["asset"] == "AAPL").unwrap();
        assert_eq!(aapl["signal_type"], "strong_buy");
        assert_eq!(aapl["strength"], "strong");
        assert_eq!(aapl["timeframe"], "1d");
        assert!(aapl["id"].as_u64().is_some());
    }

    #[test]
    fn analyze_writes_summary_indicators_and_signals() {
        let data = data_dir_fixture();
        let ini = config_for(data.path(), "");
        let out_dir = tempfile::tempdir().unwrap();
        let out = out_dir.path().join("aapl.json");

        cli::run(Cli {
            command: Command::Analyze {
                config: ini.path().to_path_buf(),
                symbol: "AAPL".to_string(),
                indicators: vec!["sma".to_string(), "rsi".to_string()],
                start: None,
                end: None,
                output: Some(out.clone()),
            },
        });

        let json = read_json(&out);
        assert_eq!(json["summary"]["asset"], "AAPL");
        assert_eq!(json["summary"]["momentum"], "oversold");
        assert_eq!(json["summary"]["trend"], "bullish");

        let names: Vec<&str> = json["indicators"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"SMA_20"));
        assert!(names.contains(&"RSI_14"));
        assert!(!names.contains(&"OBV"));

        let signals = json["signals"].as_array().unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0]["signal_type"], "strong_buy");
    }

    #[test]
    fn analyze_restricts_bars_to_date_range() {
        let data = data_dir_fixture();
        let ini = config_for(data.path(), "");
        let out_dir = tempfile::tempdir().unwrap();
        let out = out_dir.path().join("aapl.json");

        cli::run(Cli {
            command: Command::Analyze {
                config: ini.path().to_path_buf(),
                symbol: "AAPL".to_string(),
                indicators: vec!["sma".to_string()],
                start: None,
                end: Some(day(59).date_naive()),
                output: Some(out.clone()),
            },
        });

        let json = read_json(&out);
        assert_eq!(
            json["summary"]["latest_date"],
            serde_json::to_value(day(59)).unwrap()
        );
    }

    #[test]
    fn analyze_with_empty_range_writes_nothing() {
        let data = data_dir_fixture();
        let ini = config_for(data.path(), "");
        let out_dir = tempfile::tempdir().unwrap();
        let out = out_dir.path().join("aapl.json");

        cli::run(Cli {
            command: Command::Analyze {
                config: ini.path().to_path_buf(),
                symbol: "AAPL".to_string(),
                indicators: vec![],
                start: Some(day(200).date_naive()),
                end: None,
                output: Some(out.clone()),
            },
        });

        assert!(!out.exists());
    }
}

mod csv_batch {
    use super::*;

    #[test]
    fn csv_directory_feeds_the_batch() {
        let data = data_dir_fixture();
        let adapter = CsvAdapter::new(data.path().to_path_buf(), Interval::Day1);
        assert_eq!(adapter.list_assets().unwrap(), vec!["AAPL", "MSFT", "TINY"]);

        let settings = batch::BatchSettings::default();
        let strategy = StrategyRegistry::with_builtins(RuleThresholds::default())
            .get(trademan::domain::strategy::DEFAULT_STRATEGY)
            .unwrap();
        let mut store = MemoryStore::new();

        let report = batch::compute_signals(
            &adapter,
            &mut store,
            Some("MSFT"),
            strategy.as_ref(),
            &settings,
            day(80),
        )
        .unwrap();
        assert_eq!(report.processed_assets, 1);
        assert_eq!(report.signals_created, 1);
        assert_eq!(store.signals()[0].signal.indicators_used, vec!["RSI_14"]);
    }
}
