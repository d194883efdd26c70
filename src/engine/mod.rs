//! Trading engine: the per-level state machine, the recovery sweeper and
//! the HTTP surface the other services talk to.

pub mod api;
pub mod service;
pub mod sweeper;

pub use service::{GridInitSummary, GridService, OrderAssurance, StatusResponse};
