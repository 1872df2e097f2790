//! Port traits: the boundary between the domain and its adapters.

pub mod config_port;
pub mod market_data_port;
pub mod report_port;
pub mod signal_store_port;
