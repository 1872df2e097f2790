//! Core domain types and logic.

pub mod analysis;
pub mod bar;
pub mod bar_series;
pub mod batch;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod indicator_engine;
pub mod interval;
pub mod rule;
pub mod signal;
pub mod signal_engine;
pub mod strategy;
