//! Engine-side client for the order-assurance gateway.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::engine::OrderAssurance;
use crate::error::{TradingError, TradingResult};
use crate::models::{OrderRequest, OrderResponse, OrderStatusInfo};

pub struct OrderAssuranceClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

impl OrderAssuranceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Rebuild the gateway's typed error from its wire form so the engine
    /// can keep matching on variants.
    fn decode_error(status: reqwest::StatusCode, body: &str) -> TradingError {
        let decoded: Option<GatewayError> = serde_json::from_str(body).ok();
        let message = decoded
            .as_ref()
            .filter(|e| !e.message.is_empty())
            .map(|e| e.message.clone())
            .unwrap_or_else(|| format!("gateway returned {}", status.as_u16()));

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return TradingError::RateLimited(message);
        }

        match decoded.map(|e| e.error).as_deref() {
            Some("insufficient_funds") => TradingError::InsufficientFunds(message),
            Some("order_too_small") => TradingError::OrderTooSmall(message),
            Some("invalid_symbol") => TradingError::InvalidSymbol(message),
            Some("rate_limited") => TradingError::RateLimited(message),
            _ => TradingError::OrderFailed(message),
        }
    }
}

#[async_trait]
impl OrderAssurance for OrderAssuranceClient {
    async fn place_order(&self, req: &OrderRequest) -> TradingResult<OrderResponse> {
        let resp = self
            .http
            .post(format!("{}/order-assurance", self.base_url))
            .json(req)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Self::decode_error(status, &text));
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn order_status(
        &self,
        symbol: &str,
        order_id: &str,
    ) -> TradingResult<Option<OrderStatusInfo>> {
        let resp = self
            .http
            .get(format!("{}/order-status/{}", self.base_url, order_id))
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Self::decode_error(status, &text));
        }

        Ok(Some(serde_json::from_str(&text)?))
    }
}
