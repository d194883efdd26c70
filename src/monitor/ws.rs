//! Binance trade-stream WebSocket client.
//!
//! Connects to the combined raw stream for all monitored symbols and
//! yields one `PriceUpdate` per trade event. Reconnection is the caller's
//! job; a read error or close ends the stream.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{TradingError, TradingResult};

pub const BINANCE_WS_URL: &str = "wss://stream.binance.com:9443/ws";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpdate {
    pub symbol: String,
    pub price: Decimal,
}

pub struct BinanceWs {
    sender: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
    receiver: SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl BinanceWs {
    /// Connect to the combined trade stream for the given symbols
    /// (full venue symbols, e.g. `ETHUSDT`).
    pub async fn connect(base_url: &str, symbols: &[String]) -> TradingResult<Self> {
        if symbols.is_empty() {
            return Err(TradingError::Validation("no symbols to subscribe".to_string()));
        }

        let streams: Vec<String> = symbols
            .iter()
            .map(|s| format!("{}@trade", s.to_lowercase()))
            .collect();
        let url = format!("{}/{}", base_url.trim_end_matches('/'), streams.join("/"));

        let (ws_stream, _) = connect_async(&url)
            .await
            .map_err(|e| TradingError::ApiConnection(format!("websocket dial failed: {}", e)))?;

        info!("Connected to venue trade stream for {} symbols", symbols.len());

        let (sender, receiver) = ws_stream.split();
        Ok(Self { sender, receiver })
    }

    /// Next trade price. `Ok(None)` means the stream closed and the caller
    /// should reconnect.
    pub async fn next_price(&mut self) -> TradingResult<Option<PriceUpdate>> {
        while let Some(message) = self.receiver.next().await {
            let message = message
                .map_err(|e| TradingError::ApiConnection(format!("websocket read error: {}", e)))?;

            match message {
                Message::Text(text) => {
                    if let Ok(value) = serde_json::from_str::<Value>(&text) {
                        if let Some(update) = parse_trade_event(&value) {
                            return Ok(Some(update));
                        }
                    }
                }
                Message::Ping(payload) => {
                    // Keep the venue's keepalive happy.
                    if let Err(e) = self.sender.send(Message::Pong(payload)).await {
                        warn!("Failed to answer ping: {}", e);
                    }
                }
                Message::Close(_) => {
                    info!("Venue closed the trade stream");
                    return Ok(None);
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

/// Parse a raw trade event (`{"e":"trade","s":"ETHUSDT","p":"3650.10",...}`).
pub fn parse_trade_event(data: &Value) -> Option<PriceUpdate> {
    if data.get("e").and_then(|e| e.as_str()) != Some("trade") {
        return None;
    }

    let symbol = data.get("s").and_then(|s| s.as_str())?.to_string();
    let price_text = data.get("p").and_then(|p| p.as_str())?;
    let price = match Decimal::from_str(price_text) {
        Ok(price) => price,
        Err(_) => {
            debug!("Invalid price format for {}: {}", symbol, price_text);
            return None;
        }
    };

    Some(PriceUpdate { symbol, price })
}
