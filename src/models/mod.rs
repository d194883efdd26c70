//! Domain and wire types shared by the engine, gateway and monitor.

pub mod grid_level;
pub mod orders;
pub mod transaction;

pub use grid_level::{GridLevel, GridState};
pub use orders::{
    CreateGridRequest, ErrorNotification, FillNotification, OrderRequest, OrderResponse, OrderSide,
    OrderState, OrderStatusInfo, PriceTrigger,
};
pub use transaction::{Transaction, TxSide, TxStatus};
