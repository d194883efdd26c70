//! Gateway order service: converts engine requests into venue orders and
//! pushes observed fills back to the engine.

use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::assurance::exchange::{map_venue_status, BinanceClient, VenueOrder};
use crate::assurance::notifier::Notifier;
use crate::error::TradingResult;
use crate::models::{
    ErrorNotification, FillNotification, OrderRequest, OrderResponse, OrderSide, OrderState,
    OrderStatusInfo,
};

pub struct OrderService {
    exchange: BinanceClient,
    notifier: Arc<Notifier>,
}

impl OrderService {
    pub fn new(exchange: BinanceClient, notifier: Arc<Notifier>) -> Self {
        Self { exchange, notifier }
    }

    /// Idempotent order placement. For buys the request amount is quote
    /// notional and is converted to base units at the limit price before
    /// quantization.
    pub async fn place_order(&self, req: &OrderRequest) -> TradingResult<OrderResponse> {
        let quantity = match req.side {
            OrderSide::Buy => {
                let quantity = req.amount / req.price;
                info!(
                    "Converting buy amount: {} USDT @ {} = {} coins",
                    req.amount, req.price, quantity
                );
                quantity
            }
            OrderSide::Sell => req.amount,
        };

        info!(
            "Placing order - {} {} @ {} x {}",
            req.side, req.symbol, req.price, quantity
        );

        let order = self
            .exchange
            .place_order(&req.symbol, req.side, req.price, quantity)
            .await?;

        info!("Order assured - id {}, {} {}", order.order_id, req.side, req.symbol);

        Ok(OrderResponse {
            order_id: order.order_id.to_string(),
            status: "assured".to_string(),
        })
    }

    /// Current status of an order, through the two-tier venue lookup. A
    /// `filled` observation also dispatches the fill notification to the
    /// engine on a background task.
    pub async fn order_status(
        &self,
        symbol: &str,
        order_id: &str,
    ) -> TradingResult<Option<OrderStatusInfo>> {
        let order = match self.exchange.get_order(symbol, order_id).await? {
            Some(order) => order,
            None => {
                warn!("Order {} not found on venue", order_id);
                return Ok(None);
            }
        };

        let status = map_venue_status(&order.status);
        let mut result = OrderStatusInfo {
            order_id: order_id.to_string(),
            status,
            filled_amount: None,
            fill_price: None,
        };

        if status == OrderState::Filled {
            let executed_qty = Decimal::from_str(&order.executed_qty).unwrap_or(Decimal::ZERO);
            let quote_qty =
                Decimal::from_str(&order.cummulative_quote_qty).unwrap_or(Decimal::ZERO);
            let fill_price = if executed_qty.is_zero() {
                Decimal::ZERO
            } else {
                quote_qty / executed_qty
            };

            result.filled_amount = Some(executed_qty);
            result.fill_price = Some(fill_price);

            info!(
                "Order {} filled - executed {} @ {} (quote {})",
                order_id, executed_qty, fill_price, quote_qty
            );

            self.dispatch_fill(&order, executed_qty, fill_price);
        } else if order.status == "REJECTED" {
            // Surface venue rejections to the engine's error path as well.
            self.dispatch_error(&order, "order rejected by venue");
        }

        Ok(Some(result))
    }

    fn dispatch_fill(&self, order: &VenueOrder, filled_amount: Decimal, fill_price: Decimal) {
        let notification = FillNotification {
            order_id: order.order_id.to_string(),
            symbol: order.symbol.clone(),
            price: fill_price,
            side: venue_side(order),
            status: "filled".to_string(),
            filled_amount,
            fill_price,
        };

        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_fill_notification(&notification).await {
                error!(
                    "Failed to deliver fill notification for order {}: {}",
                    notification.order_id, e
                );
            }
        });
    }

    fn dispatch_error(&self, order: &VenueOrder, message: &str) {
        let notification = ErrorNotification {
            order_id: order.order_id.to_string(),
            symbol: order.symbol.clone(),
            side: venue_side(order),
            error: message.to_string(),
        };

        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_error_notification(&notification).await {
                error!(
                    "Failed to deliver error notification for order {}: {}",
                    notification.order_id, e
                );
            }
        });
    }

    pub fn has_credentials(&self) -> bool {
        self.exchange.has_credentials()
    }
}

fn venue_side(order: &VenueOrder) -> OrderSide {
    if order.side.eq_ignore_ascii_case("sell") {
        OrderSide::Sell
    } else {
        OrderSide::Buy
    }
}
