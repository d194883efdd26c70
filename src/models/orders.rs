//! Wire types exchanged between the services. Decimals travel as JSON
//! strings; sides are lowercase on the wire.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("buy"),
            OrderSide::Sell => f.write_str("sell"),
        }
    }
}

/// Order placement request from the engine to the gateway. For buys the
/// amount is quote notional (USDT); for sells it is base units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub price: Decimal,
    pub side: OrderSide,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Open,
    Filled,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusInfo {
    pub order_id: String,
    pub status: OrderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_price: Option<Decimal>,
}

/// Fill callback from the gateway to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillNotification {
    pub order_id: String,
    pub symbol: String,
    pub price: Decimal,
    pub side: OrderSide,
    pub status: String,
    pub filled_amount: Decimal,
    pub fill_price: Decimal,
}

/// Error callback from the gateway to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorNotification {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTrigger {
    pub symbol: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGridRequest {
    pub symbol: String,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub grid_step: Decimal,
    pub buy_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_side_wire_format() {
        assert_eq!(serde_json::to_string(&OrderSide::Buy).unwrap(), "\"buy\"");
        assert_eq!(serde_json::from_str::<OrderSide>("\"sell\"").unwrap(), OrderSide::Sell);
    }

    #[test]
    fn test_order_state_unknown_fallback() {
        assert_eq!(serde_json::from_str::<OrderState>("\"open\"").unwrap(), OrderState::Open);
        assert_eq!(
            serde_json::from_str::<OrderState>("\"half-baked\"").unwrap(),
            OrderState::Unknown
        );
    }

    #[test]
    fn test_fill_notification_decimals_as_strings() {
        let n = FillNotification {
            order_id: "42".to_string(),
            symbol: "ETHUSDT".to_string(),
            price: dec!(3598),
            side: OrderSide::Buy,
            status: "filled".to_string(),
            filled_amount: dec!(0.278),
            fill_price: dec!(3598),
        };
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"filled_amount\":\"0.278\""), "json: {}", json);

        let back: FillNotification = serde_json::from_str(&json).unwrap();
        assert_eq!(back.filled_amount, dec!(0.278));
        assert_eq!(back.side, OrderSide::Buy);
    }

    #[test]
    fn test_price_trigger_accepts_string_and_number() {
        let t: PriceTrigger =
            serde_json::from_str(r#"{"symbol":"ETHUSDT","price":"3650.5"}"#).unwrap();
        assert_eq!(t.price, dec!(3650.5));

        let t: PriceTrigger = serde_json::from_str(r#"{"symbol":"ETHUSDT","price":3650.5}"#).unwrap();
        assert_eq!(t.price, dec!(3650.5));
    }
}
