//! HTTP surface of the trading engine.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::engine::GridService;
use crate::error::TradingError;
use crate::models::{CreateGridRequest, ErrorNotification, FillNotification, OrderSide, PriceTrigger};

pub fn router(service: Arc<GridService>) -> Router {
    Router::new()
        .route("/grids", post(create_grid).get(get_all_grids))
        .route("/grids/:symbol", get(get_grids_by_symbol))
        .route("/trigger-for-price", post(price_trigger))
        .route("/order-fill-notification", post(fill_notification))
        .route("/order-fill-error-notification", post(error_notification))
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(service)
}

fn error_response(err: TradingError) -> Response {
    let status = match &err {
        TradingError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.error_code(), "message": err.to_string() }))).into_response()
}

async fn create_grid(
    State(service): State<Arc<GridService>>,
    Json(req): Json<CreateGridRequest>,
) -> Response {
    if req.symbol.is_empty() {
        return error_response(TradingError::Validation("symbol is required".to_string()));
    }
    if req.min_price <= Decimal::ZERO || req.max_price <= Decimal::ZERO {
        return error_response(TradingError::Validation(
            "min and max prices must be positive".to_string(),
        ));
    }
    if req.min_price >= req.max_price {
        return error_response(TradingError::Validation(
            "min price must be less than max price".to_string(),
        ));
    }
    if req.grid_step <= Decimal::ZERO {
        return error_response(TradingError::Validation("grid step must be positive".to_string()));
    }
    if req.buy_amount <= Decimal::ZERO {
        return error_response(TradingError::Validation("buy amount must be positive".to_string()));
    }

    info!(
        "Creating grid for {}: min={}, max={}, step={}, amount={}",
        req.symbol, req.min_price, req.max_price, req.grid_step, req.buy_amount
    );

    match service
        .create_grid(&req.symbol, req.min_price, req.max_price, req.grid_step, req.buy_amount)
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            error!("Error creating grid: {}", e);
            error_response(e)
        }
    }
}

async fn get_all_grids(State(service): State<Arc<GridService>>) -> Response {
    match service.get_all_grid_levels() {
        Ok(levels) => (StatusCode::OK, Json(levels)).into_response(),
        Err(e) => {
            error!("Error fetching grid levels: {}", e);
            error_response(e)
        }
    }
}

async fn get_grids_by_symbol(
    State(service): State<Arc<GridService>>,
    Path(symbol): Path<String>,
) -> Response {
    match service.get_grid_levels(&symbol) {
        Ok(levels) => (StatusCode::OK, Json(levels)).into_response(),
        Err(e) => {
            error!("Error fetching grid levels for {}: {}", symbol, e);
            error_response(e)
        }
    }
}

async fn price_trigger(
    State(service): State<Arc<GridService>>,
    Json(req): Json<PriceTrigger>,
) -> Response {
    if req.symbol.is_empty() || req.price <= Decimal::ZERO {
        return error_response(TradingError::Validation(
            "symbol and positive price are required".to_string(),
        ));
    }

    info!("Received price trigger for {} at {}", req.symbol, req.price);

    match service.process_price_trigger(&req.symbol, req.price).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "processed" }))).into_response(),
        Err(e) => {
            error!("Error processing price trigger: {}", e);
            error_response(e)
        }
    }
}

async fn fill_notification(
    State(service): State<Arc<GridService>>,
    Json(req): Json<FillNotification>,
) -> Response {
    if req.status != "filled" {
        return (StatusCode::OK, Json(json!({ "status": "ignored" }))).into_response();
    }

    info!(
        "Received fill notification for order {} ({} {} at {})",
        req.order_id, req.side, req.symbol, req.fill_price
    );

    let result = match req.side {
        OrderSide::Buy => {
            service
                .process_buy_fill(&req.order_id, req.filled_amount, req.fill_price)
                .await
        }
        OrderSide::Sell => {
            service
                .process_sell_fill(&req.order_id, req.filled_amount, req.fill_price)
                .await
        }
    };

    match result {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "processed" }))).into_response(),
        Err(e) => {
            error!("Error processing fill notification: {}", e);
            error_response(e)
        }
    }
}

async fn error_notification(
    State(service): State<Arc<GridService>>,
    Json(req): Json<ErrorNotification>,
) -> Response {
    info!("Received error notification for order {}: {}", req.order_id, req.error);

    match service
        .process_error_notification(&req.order_id, req.side, &req.error)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "processed" }))).into_response(),
        Err(e) => {
            error!("Error processing error notification: {}", e);
            error_response(e)
        }
    }
}

async fn health(State(service): State<Arc<GridService>>) -> Response {
    match service.check_health() {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "healthy" }))).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn status(State(service): State<Arc<GridService>>) -> Response {
    match service.get_status() {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => {
            error!("Error building status: {}", e);
            error_response(e)
        }
    }
}
