//! HTTP clients the services use to talk to each other.

pub mod grid_trading;
pub mod order_assurance;

pub use grid_trading::GridTradingClient;
pub use order_assurance::OrderAssuranceClient;
