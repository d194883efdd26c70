//! Health and status endpoints of the price monitor.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::monitor::PriceMonitor;

pub fn router(monitor: Arc<PriceMonitor>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(monitor)
}

async fn health(State(monitor): State<Arc<PriceMonitor>>) -> Response {
    let status = if monitor.is_connected() { "healthy" } else { "reconnecting" };
    (StatusCode::OK, Json(json!({ "status": status }))).into_response()
}

async fn status(State(monitor): State<Arc<PriceMonitor>>) -> Response {
    (StatusCode::OK, Json(monitor.status())).into_response()
}
