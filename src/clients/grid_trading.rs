//! Monitor-side client for the trading engine.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{TradingError, TradingResult};
use crate::models::PriceTrigger;
use rust_decimal::Decimal;

pub struct GridTradingClient {
    base_url: String,
    http: reqwest::Client,
}

impl GridTradingClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
        }
    }

    pub async fn send_price_trigger(&self, symbol: &str, price: Decimal) -> TradingResult<()> {
        let trigger = PriceTrigger {
            symbol: symbol.to_string(),
            price,
        };

        let resp = self
            .http
            .post(format!("{}/trigger-for-price", self.base_url))
            .json(&trigger)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(TradingError::ApiResponse(format!(
                "engine returned {} for price trigger",
                resp.status().as_u16()
            )));
        }
        Ok(())
    }

    /// Distinct symbols of the engine's grid levels, in level order.
    pub async fn fetch_symbols(&self) -> TradingResult<Vec<String>> {
        #[derive(Deserialize)]
        struct LevelSymbol {
            symbol: String,
        }

        let resp = self
            .http
            .get(format!("{}/grids", self.base_url))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(TradingError::ApiResponse(format!(
                "engine returned {} for grid listing",
                resp.status().as_u16()
            )));
        }

        let levels: Vec<LevelSymbol> = resp.json().await?;
        let mut symbols: Vec<String> = Vec::new();
        for level in levels {
            if !symbols.contains(&level.symbol) {
                symbols.push(level.symbol);
            }
        }
        Ok(symbols)
    }
}
