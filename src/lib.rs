// Grid Harvester Library
//
// A grid trading bot built as three cooperating services around one
// durable level state machine: the trading engine, the order-assurance
// gateway and the price monitor.

pub mod assurance;
pub mod clients;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod monitor;

// Re-export commonly used types for convenience
pub use config::{AssuranceConfig, ConfigError, EngineConfig, MonitorConfig, PriceSource};
pub use db::{Database, GridLevelRepository, TransactionRepository};
pub use engine::{GridService, OrderAssurance};
pub use error::{TradingError, TradingResult};
pub use models::{GridLevel, GridState, Transaction, TxSide, TxStatus};
