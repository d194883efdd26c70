//! Price monitor: turns venue price updates into throttled triggers for
//! the trading engine. Deliberately stateless across restarts.

pub mod api;
pub mod service;
pub mod ticker;
pub mod ws;

pub use service::PriceMonitor;
pub use ticker::BinanceTicker;
pub use ws::{BinanceWs, PriceUpdate};
