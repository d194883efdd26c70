//! Binance spot REST client.
//!
//! Carries the two caches that make placement idempotent: symbol trading
//! rules (tick/step/min-notional, 24 h expiry) and recently placed orders
//! keyed by their parameters (short expiry, re-validated against the venue
//! before reuse).

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{TradingError, TradingResult};
use crate::models::{OrderSide, OrderState};

pub const BINANCE_API_URL: &str = "https://api.binance.com";

const ORDER_CACHE_EXPIRY: Duration = Duration::from_secs(5);
const SYMBOL_RULES_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Venue trading rules for one symbol.
#[derive(Debug, Clone)]
pub struct SymbolRules {
    pub min_qty: Decimal,
    pub max_qty: Decimal,
    pub step_size: Decimal,
    pub tick_size: Decimal,
    pub min_notional: Decimal,
}

impl Default for SymbolRules {
    fn default() -> Self {
        Self {
            min_qty: dec!(0.00001),
            max_qty: dec!(10000000),
            step_size: dec!(0.00001),
            tick_size: dec!(0.01),
            min_notional: dec!(10),
        }
    }
}

/// Raw venue order as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueOrder {
    pub symbol: String,
    pub order_id: i64,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub orig_qty: String,
    #[serde(default)]
    pub executed_qty: String,
    #[serde(default)]
    pub cummulative_quote_qty: String,
    pub status: String,
    #[serde(default)]
    pub side: String,
}

#[derive(Debug, Deserialize)]
struct VenueError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

struct OrderCache {
    entries: HashMap<String, VenueOrder>,
    updated_at: Option<Instant>,
}

pub struct BinanceClient {
    api_key: String,
    api_secret: String,
    base_url: String,
    http: reqwest::Client,
    order_cache: RwLock<OrderCache>,
    rules: RwLock<HashMap<String, (SymbolRules, Instant)>>,
}

impl BinanceClient {
    pub fn new(api_key: &str, api_secret: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            order_cache: RwLock::new(OrderCache {
                entries: HashMap::new(),
                updated_at: None,
            }),
            rules: RwLock::new(HashMap::new()),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// Place a LIMIT GTC order, quantized to the venue rules and idempotent
    /// within the cache window.
    pub async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
    ) -> TradingResult<VenueOrder> {
        let rules = self.symbol_rules(symbol).await?;
        let (price, quantity) = quantize_order(&rules, side, price, quantity)?;

        let cache_key = cache_key(symbol, side, price, quantity);
        if let Some(cached) = self.cached_order(&cache_key) {
            info!(
                "Idempotency cache hit for {} {} @ {} x {} (order {})",
                symbol, side, price, quantity, cached.order_id
            );
            match self.get_order(symbol, &cached.order_id.to_string()).await {
                Ok(Some(current))
                    if current.status == "NEW" || current.status == "PARTIALLY_FILLED" =>
                {
                    info!(
                        "Reusing existing order {} (status {}), idempotent placement",
                        current.order_id, current.status
                    );
                    return Ok(current);
                }
                _ => warn!("Cached order {} no longer open, placing new order", cached.order_id),
            }
        }

        if !self.has_credentials() {
            return Err(TradingError::ApiAuthentication(
                "exchange API credentials not configured".to_string(),
            ));
        }

        let query = format!(
            "symbol={}&side={}&type=LIMIT&timeInForce=GTC&price={}&quantity={}&recvWindow=5000&timestamp={}",
            symbol,
            side.to_string().to_uppercase(),
            price.normalize(),
            quantity.normalize(),
            Utc::now().timestamp_millis()
        );
        let signature = self.sign(&query);
        let body = format!("{}&signature={}", query, signature);

        let resp = self
            .http
            .post(format!("{}/api/v3/order", self.base_url))
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if let Some(weight) = resp.headers().get("X-MBX-USED-WEIGHT-1M") {
            debug!("Venue API weight used: {:?}", weight);
        }

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(classify_venue_error(status, &text));
        }

        let order: VenueOrder = serde_json::from_str(&text)?;
        self.store_order(cache_key, order.clone());
        info!(
            "Placed order on venue - id {}, {} {} @ {} x {}",
            order.order_id, symbol, side, price, quantity
        );
        Ok(order)
    }

    /// Two-tier order lookup: the live-order endpoint first, then the
    /// recent-history endpoint for orders the venue has purged from it.
    pub async fn get_order(&self, symbol: &str, order_id: &str) -> TradingResult<Option<VenueOrder>> {
        if !self.has_credentials() {
            return Err(TradingError::ApiAuthentication(
                "exchange API credentials not configured".to_string(),
            ));
        }

        let query = format!(
            "symbol={}&orderId={}&recvWindow=5000&timestamp={}",
            symbol,
            order_id,
            Utc::now().timestamp_millis()
        );
        let signature = self.sign(&query);

        let resp = self
            .http
            .get(format!(
                "{}/api/v3/order?{}&signature={}",
                self.base_url, query, signature
            ))
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if status.is_success() {
            let order: VenueOrder = serde_json::from_str(&text)?;
            return Ok(Some(order));
        }

        // The venue answers 404, or 400 with its "order does not exist"
        // code, for orders purged from the live endpoint. Only those fall
        // through to the history lookup; any other 400 (bad signature, bad
        // parameters) is a real error and must surface as one.
        if status == StatusCode::NOT_FOUND
            || (status == StatusCode::BAD_REQUEST && is_unknown_order_body(&text))
        {
            debug!(
                "Order {} not found on the live endpoint, falling back to history",
                order_id
            );
            return self.get_order_from_history(symbol, order_id).await;
        }

        Err(classify_venue_error(status, &text))
    }

    async fn get_order_from_history(
        &self,
        symbol: &str,
        order_id: &str,
    ) -> TradingResult<Option<VenueOrder>> {
        let target: i64 = order_id
            .parse()
            .map_err(|_| TradingError::Validation(format!("invalid order id: {}", order_id)))?;

        let query = format!(
            "symbol={}&limit=500&recvWindow=5000&timestamp={}",
            symbol,
            Utc::now().timestamp_millis()
        );
        let signature = self.sign(&query);

        let resp = self
            .http
            .get(format!(
                "{}/api/v3/allOrders?{}&signature={}",
                self.base_url, query, signature
            ))
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(classify_venue_error(status, &text));
        }

        let orders: Vec<VenueOrder> = serde_json::from_str(&text)?;
        let found = orders.into_iter().find(|o| o.order_id == target);
        if found.is_none() {
            warn!("Order {} not found in recent history for {}", order_id, symbol);
        }
        Ok(found)
    }

    /// Open orders for a symbol; rebuilds the idempotency cache as a side
    /// effect.
    pub async fn get_open_orders(&self, symbol: &str) -> TradingResult<Vec<VenueOrder>> {
        if !self.has_credentials() {
            return Err(TradingError::ApiAuthentication(
                "exchange API credentials not configured".to_string(),
            ));
        }

        let query = format!(
            "symbol={}&recvWindow=5000&timestamp={}",
            symbol,
            Utc::now().timestamp_millis()
        );
        let signature = self.sign(&query);

        let resp = self
            .http
            .get(format!(
                "{}/api/v3/openOrders?{}&signature={}",
                self.base_url, query, signature
            ))
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(classify_venue_error(status, &text));
        }

        let orders: Vec<VenueOrder> = serde_json::from_str(&text)?;
        self.rebuild_cache(&orders);
        Ok(orders)
    }

    async fn symbol_rules(&self, symbol: &str) -> TradingResult<SymbolRules> {
        {
            let rules = self.rules.read().unwrap();
            if let Some((cached, at)) = rules.get(symbol) {
                if at.elapsed() < SYMBOL_RULES_EXPIRY {
                    return Ok(cached.clone());
                }
            }
        }

        info!("Fetching symbol rules from venue for {}", symbol);

        let resp = self
            .http
            .get(format!("{}/api/v3/exchangeInfo", self.base_url))
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            if text.contains("Invalid symbol") {
                return Err(TradingError::InvalidSymbol(symbol.to_string()));
            }
            return Err(classify_venue_error(status, &text));
        }

        #[derive(Deserialize)]
        struct Filter {
            #[serde(rename = "filterType")]
            filter_type: String,
            #[serde(rename = "minQty", default)]
            min_qty: Option<String>,
            #[serde(rename = "maxQty", default)]
            max_qty: Option<String>,
            #[serde(rename = "stepSize", default)]
            step_size: Option<String>,
            #[serde(rename = "tickSize", default)]
            tick_size: Option<String>,
            #[serde(rename = "minNotional", default)]
            min_notional: Option<String>,
        }
        #[derive(Deserialize)]
        struct SymbolEntry {
            filters: Vec<Filter>,
        }
        #[derive(Deserialize)]
        struct ExchangeInfo {
            symbols: Vec<SymbolEntry>,
        }

        let info: ExchangeInfo = serde_json::from_str(&text)?;
        let entry = info
            .symbols
            .into_iter()
            .next()
            .ok_or_else(|| TradingError::InvalidSymbol(symbol.to_string()))?;

        let mut rules = SymbolRules::default();
        for filter in entry.filters {
            match filter.filter_type.as_str() {
                "LOT_SIZE" => {
                    if let Some(v) = filter.min_qty.as_deref().and_then(parse_dec) {
                        rules.min_qty = v;
                    }
                    if let Some(v) = filter.max_qty.as_deref().and_then(parse_dec) {
                        rules.max_qty = v;
                    }
                    if let Some(v) = filter.step_size.as_deref().and_then(parse_dec) {
                        rules.step_size = v;
                    }
                }
                "PRICE_FILTER" => {
                    if let Some(v) = filter.tick_size.as_deref().and_then(parse_dec) {
                        rules.tick_size = v;
                    }
                }
                "MIN_NOTIONAL" | "NOTIONAL" => {
                    if let Some(v) = filter.min_notional.as_deref().and_then(parse_dec) {
                        rules.min_notional = v;
                    }
                }
                _ => {}
            }
        }

        info!(
            "Cached symbol rules for {} - step {}, tick {}, min notional {}",
            symbol, rules.step_size, rules.tick_size, rules.min_notional
        );

        self.rules
            .write()
            .unwrap()
            .insert(symbol.to_string(), (rules.clone(), Instant::now()));
        Ok(rules)
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn cached_order(&self, key: &str) -> Option<VenueOrder> {
        let cache = self.order_cache.read().unwrap();
        match cache.updated_at {
            Some(at) if at.elapsed() < ORDER_CACHE_EXPIRY => cache.entries.get(key).cloned(),
            _ => None,
        }
    }

    fn store_order(&self, key: String, order: VenueOrder) {
        let mut cache = self.order_cache.write().unwrap();
        cache.entries.insert(key, order);
        cache.updated_at = Some(Instant::now());
    }

    fn rebuild_cache(&self, orders: &[VenueOrder]) {
        let mut cache = self.order_cache.write().unwrap();
        cache.entries.clear();
        for order in orders {
            if order.status != "NEW" && order.status != "PARTIALLY_FILLED" {
                continue;
            }
            let (Some(price), Some(qty)) = (parse_dec(&order.price), parse_dec(&order.orig_qty))
            else {
                continue;
            };
            let side = if order.side.eq_ignore_ascii_case("sell") {
                OrderSide::Sell
            } else {
                OrderSide::Buy
            };
            cache
                .entries
                .insert(cache_key(&order.symbol, side, price, qty), order.clone());
        }
        cache.updated_at = Some(Instant::now());
    }
}

fn parse_dec(s: &str) -> Option<Decimal> {
    Decimal::from_str(s).ok()
}

/// Quantize an order to the venue rules. Price and quantity floor to the
/// tick and step grids. A buy below the minimum notional is bumped up to
/// the next qualifying step; a sell must keep the exact held amount, so
/// falling below the minimum is a failure instead.
pub fn quantize_order(
    rules: &SymbolRules,
    side: OrderSide,
    price: Decimal,
    quantity: Decimal,
) -> TradingResult<(Decimal, Decimal)> {
    let price = floor_to(price, rules.tick_size);
    if price <= Decimal::ZERO {
        return Err(TradingError::Validation(format!("price {} rounds to zero", price)));
    }

    let mut quantity = floor_to(quantity, rules.step_size);

    let notional = price * quantity;
    if notional < rules.min_notional {
        match side {
            OrderSide::Buy => {
                // 1% buffer so a boundary fill still clears the minimum.
                let needed = rules.min_notional * dec!(1.01) / price;
                quantity = ceil_to(needed, rules.step_size);
                info!(
                    "Adjusted buy quantity to {} to meet min notional {} (was {})",
                    quantity, rules.min_notional, notional
                );
            }
            OrderSide::Sell => {
                return Err(TradingError::OrderTooSmall(format!(
                    "sell notional {} below venue minimum {}",
                    notional, rules.min_notional
                )));
            }
        }
    }

    if quantity < rules.min_qty {
        match side {
            OrderSide::Buy => {
                info!("Adjusted buy quantity {} up to venue minimum {}", quantity, rules.min_qty);
                quantity = rules.min_qty;
            }
            OrderSide::Sell => {
                return Err(TradingError::OrderTooSmall(format!(
                    "sell quantity {} below venue minimum {}",
                    quantity, rules.min_qty
                )));
            }
        }
    }

    if quantity > rules.max_qty {
        return Err(TradingError::Validation(format!(
            "quantity {} exceeds venue maximum {}",
            quantity, rules.max_qty
        )));
    }

    Ok((price, quantity))
}

pub(crate) fn floor_to(value: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return value;
    }
    ((value / step).floor() * step).normalize()
}

pub(crate) fn ceil_to(value: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return value;
    }
    ((value / step).ceil() * step).normalize()
}

/// Idempotency cache key: identical parameters map to the same key, with a
/// 0.01% tolerance on the quantity (five significant figures, so anything
/// closer than one part in ten thousand collapses onto one bucket).
pub fn cache_key(symbol: &str, side: OrderSide, price: Decimal, quantity: Decimal) -> String {
    let rounded = quantity.round_sf(5).unwrap_or(quantity).normalize();
    format!("{}_{}_{}_{}", symbol, side, price.normalize(), rounded)
}

/// Map a venue order status onto the gateway's three-state contract.
pub fn map_venue_status(status: &str) -> OrderState {
    match status {
        "NEW" | "PARTIALLY_FILLED" => OrderState::Open,
        "FILLED" => OrderState::Filled,
        "CANCELED" | "REJECTED" | "EXPIRED" => OrderState::Cancelled,
        _ => OrderState::Open,
    }
}

/// Venue error code for "Order does not exist".
const VENUE_UNKNOWN_ORDER_CODE: i64 = -2013;

fn is_unknown_order_body(body: &str) -> bool {
    serde_json::from_str::<VenueError>(body)
        .map(|e| e.code == VENUE_UNKNOWN_ORDER_CODE)
        .unwrap_or(false)
}

fn classify_venue_error(status: StatusCode, body: &str) -> TradingError {
    let msg = serde_json::from_str::<VenueError>(body)
        .map(|e| {
            if e.msg.is_empty() {
                body.to_string()
            } else {
                format!("{} (code {})", e.msg, e.code)
            }
        })
        .unwrap_or_else(|_| body.to_string());

    if status == StatusCode::TOO_MANY_REQUESTS {
        return TradingError::RateLimited(msg);
    }

    let lowered = msg.to_lowercase();
    if lowered.contains("insufficient") || lowered.contains("balance") {
        TradingError::InsufficientFunds(msg)
    } else if lowered.contains("notional") {
        TradingError::OrderTooSmall(msg)
    } else if lowered.contains("invalid symbol") {
        TradingError::InvalidSymbol(msg)
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        TradingError::ApiAuthentication(msg)
    } else {
        TradingError::OrderFailed(format!("venue error {}: {}", status.as_u16(), msg))
    }
}
