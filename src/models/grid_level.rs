//! Grid level: one buy-and-sell cycle on a symbol, driven by a durable
//! state machine. All transitions happen through guarded SQL updates in the
//! repository; the predicates here only decide whether a trigger qualifies.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridState {
    #[serde(rename = "READY")]
    Ready,
    #[serde(rename = "PLACING_BUY")]
    PlacingBuy,
    #[serde(rename = "BUY_ACTIVE")]
    BuyActive,
    #[serde(rename = "HOLDING")]
    Holding,
    #[serde(rename = "PLACING_SELL")]
    PlacingSell,
    #[serde(rename = "SELL_ACTIVE")]
    SellActive,
    #[serde(rename = "ERROR")]
    Error,
}

impl GridState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridState::Ready => "READY",
            GridState::PlacingBuy => "PLACING_BUY",
            GridState::BuyActive => "BUY_ACTIVE",
            GridState::Holding => "HOLDING",
            GridState::PlacingSell => "PLACING_SELL",
            GridState::SellActive => "SELL_ACTIVE",
            GridState::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "READY" => Some(GridState::Ready),
            "PLACING_BUY" => Some(GridState::PlacingBuy),
            "BUY_ACTIVE" => Some(GridState::BuyActive),
            "HOLDING" => Some(GridState::Holding),
            "PLACING_SELL" => Some(GridState::PlacingSell),
            "SELL_ACTIVE" => Some(GridState::SellActive),
            "ERROR" => Some(GridState::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for GridState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridLevel {
    pub id: i64,
    pub symbol: String,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub buy_amount: Decimal,
    pub filled_amount: Option<Decimal>,
    pub state: GridState,
    pub buy_order_id: Option<String>,
    pub sell_order_id: Option<String>,
    pub enabled: bool,
    pub state_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GridLevel {
    /// A buy limit order may be placed when the level is idle and the market
    /// trades strictly above the buy price (the limit order sits below the
    /// market). Equality does not trigger.
    pub fn can_place_buy(&self, current_price: Decimal) -> bool {
        self.state == GridState::Ready && self.enabled && current_price > self.buy_price
    }

    /// A sell limit order may be placed while holding a position and the
    /// market trades strictly below the sell price (the limit order sits
    /// above the market). Equality does not trigger, and a missing or
    /// non-positive filled amount blocks the sell.
    pub fn can_place_sell(&self, current_price: Decimal) -> bool {
        self.state == GridState::Holding
            && self.enabled
            && current_price < self.sell_price
            && self.filled_amount.map_or(false, |amount| amount > Decimal::ZERO)
    }

    pub fn is_in_placing_state(&self) -> bool {
        matches!(self.state, GridState::PlacingBuy | GridState::PlacingSell)
    }

    pub fn is_in_active_state(&self) -> bool {
        matches!(self.state, GridState::BuyActive | GridState::SellActive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(state: GridState, enabled: bool) -> GridLevel {
        GridLevel {
            id: 1,
            symbol: "ETHUSDT".to_string(),
            buy_price: dec!(3600),
            sell_price: dec!(3800),
            buy_amount: dec!(1000),
            filled_amount: None,
            state,
            buy_order_id: None,
            sell_order_id: None,
            enabled,
            state_changed_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_place_buy() {
        let cases = [
            // (state, enabled, price, expected)
            (GridState::Ready, true, dec!(3650), true),
            (GridState::Ready, true, dec!(3550), false),
            // equality does not trigger
            (GridState::Ready, true, dec!(3600), false),
            (GridState::Ready, false, dec!(3650), false),
            (GridState::Holding, true, dec!(3650), false),
            (GridState::PlacingBuy, true, dec!(3650), false),
            (GridState::BuyActive, true, dec!(3650), false),
            (GridState::PlacingSell, true, dec!(3650), false),
            (GridState::SellActive, true, dec!(3650), false),
            (GridState::Error, true, dec!(3650), false),
        ];

        for (state, enabled, price, expected) in cases {
            let l = level(state, enabled);
            assert_eq!(
                l.can_place_buy(price),
                expected,
                "state={} enabled={} price={}",
                state,
                enabled,
                price
            );
        }
    }

    #[test]
    fn test_can_place_buy_high_precision() {
        let mut l = level(GridState::Ready, true);
        l.buy_price = dec!(3599.99999999);
        assert!(l.can_place_buy(dec!(3600.00000001)));

        l.buy_price = dec!(3600.00000001);
        assert!(!l.can_place_buy(dec!(3599.99999999)));
    }

    #[test]
    fn test_can_place_sell() {
        let holding = |amount: Option<Decimal>, enabled: bool| {
            let mut l = level(GridState::Holding, enabled);
            l.filled_amount = amount;
            l
        };

        // market below the sell target with a position held
        assert!(holding(Some(dec!(0.278)), true).can_place_sell(dec!(3750)));
        // strictly below: equality does not trigger
        assert!(!holding(Some(dec!(0.278)), true).can_place_sell(dec!(3800)));
        // market above the sell target does not trigger
        assert!(!holding(Some(dec!(0.278)), true).can_place_sell(dec!(3850)));
        // missing, zero and negative amounts block the sell
        assert!(!holding(None, true).can_place_sell(dec!(3750)));
        assert!(!holding(Some(Decimal::ZERO), true).can_place_sell(dec!(3750)));
        assert!(!holding(Some(dec!(-1)), true).can_place_sell(dec!(3750)));
        // disabled levels never trigger
        assert!(!holding(Some(dec!(0.278)), false).can_place_sell(dec!(3750)));
        // tiny but positive amounts are enough
        assert!(holding(Some(dec!(0.000001)), true).can_place_sell(dec!(3750)));
    }

    #[test]
    fn test_can_place_sell_wrong_states() {
        for state in [
            GridState::Ready,
            GridState::PlacingBuy,
            GridState::BuyActive,
            GridState::PlacingSell,
            GridState::SellActive,
            GridState::Error,
        ] {
            let mut l = level(state, true);
            l.filled_amount = Some(dec!(0.278));
            assert!(!l.can_place_sell(dec!(3750)), "state={}", state);
        }
    }

    #[test]
    fn test_state_round_trip() {
        for state in [
            GridState::Ready,
            GridState::PlacingBuy,
            GridState::BuyActive,
            GridState::Holding,
            GridState::PlacingSell,
            GridState::SellActive,
            GridState::Error,
        ] {
            assert_eq!(GridState::parse(state.as_str()), Some(state));
        }
        assert_eq!(GridState::parse("BOGUS"), None);
    }
}
