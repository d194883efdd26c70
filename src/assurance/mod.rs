//! Order-assurance gateway: an idempotent wrapper around the exchange.
//!
//! A caller's `place` either returns an existing open order matching the
//! parameters or causes exactly one new order on the venue; observed fills
//! are pushed back to the engine as webhook notifications.

pub mod api;
pub mod exchange;
pub mod notifier;
pub mod service;

pub use exchange::{BinanceClient, SymbolRules};
pub use notifier::Notifier;
pub use service::OrderService;
