//! HTTP surface of the order-assurance gateway.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::assurance::OrderService;
use crate::error::TradingError;
use crate::models::OrderRequest;

pub fn router(service: Arc<OrderService>) -> Router {
    Router::new()
        .route("/order-assurance", post(place_order))
        .route("/order-status/:order_id", get(order_status))
        .route("/health", get(health))
        .with_state(service)
}

fn error_response(err: TradingError) -> Response {
    let status = match &err {
        TradingError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        TradingError::Validation(_)
        | TradingError::InsufficientFunds(_)
        | TradingError::OrderTooSmall(_)
        | TradingError::InvalidSymbol(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.error_code(), "message": err.to_string() }))).into_response()
}

async fn place_order(
    State(service): State<Arc<OrderService>>,
    Json(req): Json<OrderRequest>,
) -> Response {
    info!(
        "Received order request: {} {} at {}, amount {}",
        req.side, req.symbol, req.price, req.amount
    );

    if req.symbol.is_empty() || req.price <= Decimal::ZERO || req.amount <= Decimal::ZERO {
        return error_response(TradingError::Validation("invalid order parameters".to_string()));
    }

    match service.place_order(&req).await {
        Ok(resp) => {
            info!("Order placed successfully: {}", resp.order_id);
            (StatusCode::OK, Json(resp)).into_response()
        }
        Err(e) => {
            error!("Error placing order: {}", e);
            error_response(e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    symbol: Option<String>,
}

async fn order_status(
    State(service): State<Arc<OrderService>>,
    Path(order_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let symbol = match query.symbol {
        Some(symbol) if !symbol.is_empty() => symbol,
        _ => {
            return error_response(TradingError::Validation(
                "symbol query parameter is required".to_string(),
            ));
        }
    };

    match service.order_status(&symbol, &order_id).await {
        Ok(Some(status)) => (StatusCode::OK, Json(status)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "order_not_found", "message": "Order not found" })),
        )
            .into_response(),
        Err(e) => {
            error!("Error getting order status: {}", e);
            error_response(e)
        }
    }
}

async fn health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "healthy" }))).into_response()
}
