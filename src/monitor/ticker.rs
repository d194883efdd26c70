//! REST price poller, the fallback transport when the trade stream is not
//! wanted.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::error::{TradingError, TradingResult};

pub const BINANCE_REST_URL: &str = "https://api.binance.com";

pub struct BinanceTicker {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceTicker {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Current prices for the given venue symbols, keyed by symbol.
    pub async fn get_prices(&self, symbols: &[String]) -> TradingResult<HashMap<String, Decimal>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let upper: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
        let symbols_json = serde_json::to_string(&upper)?;

        let resp = self
            .http
            .get(format!("{}/api/v3/ticker/price", self.base_url))
            .query(&[("symbols", symbols_json.as_str())])
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(TradingError::ApiResponse(format!(
                "venue ticker error {}: {}",
                status.as_u16(),
                text
            )));
        }

        #[derive(Deserialize)]
        struct Ticker {
            symbol: String,
            price: String,
        }

        let tickers: Vec<Ticker> = serde_json::from_str(&text)?;
        let mut result = HashMap::new();
        for ticker in tickers {
            match Decimal::from_str(&ticker.price) {
                Ok(price) => {
                    result.insert(ticker.symbol, price);
                }
                Err(e) => warn!("Invalid price for {}: {} ({})", ticker.symbol, ticker.price, e),
            }
        }
        Ok(result)
    }
}
