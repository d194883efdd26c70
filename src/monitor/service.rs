//! Throttled trigger forwarding.
//!
//! Every venue tick passes two gates before it becomes an engine trigger:
//! a per-symbol minimum interval and a minimum relative price change. State
//! is in-memory only; a restart simply re-primes it from the next ticks.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::clients::GridTradingClient;
use crate::config::{MonitorConfig, PriceSource};
use crate::error::TradingResult;
use crate::monitor::ticker::BinanceTicker;
use crate::monitor::ws::{BinanceWs, PriceUpdate};

#[derive(Default)]
struct ThrottleState {
    last_trigger: HashMap<String, DateTime<Utc>>,
    last_price: HashMap<String, Decimal>,
}

pub struct PriceMonitor {
    cfg: MonitorConfig,
    grid_client: GridTradingClient,
    state: Mutex<ThrottleState>,
    symbols: RwLock<Vec<String>>,
    connected: AtomicBool,
}

impl PriceMonitor {
    pub fn new(cfg: MonitorConfig) -> Self {
        let grid_client = GridTradingClient::new(&cfg.grid_trading_url);
        let symbols = cfg.monitored_symbols.clone();
        Self {
            cfg,
            grid_client,
            state: Mutex::new(ThrottleState::default()),
            symbols: RwLock::new(symbols),
            connected: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Refresh the subscribed symbol set. A static `MONITORED_SYMBOLS` list
    /// wins; otherwise the distinct symbols of the engine's grid levels are
    /// used.
    pub async fn refresh_symbols(&self) -> TradingResult<()> {
        if !self.cfg.monitored_symbols.is_empty() {
            return Ok(());
        }

        let fetched = self.grid_client.fetch_symbols().await?;
        let mut symbols = self.symbols.write().unwrap();
        if *symbols != fetched {
            info!("Monitored symbols changed: {:?}", fetched);
            *symbols = fetched;
        }
        Ok(())
    }

    pub async fn run_symbol_refresh(&self) {
        let interval = Duration::from_millis(self.cfg.symbol_refresh_interval_ms);
        loop {
            if let Err(e) = self.refresh_symbols().await {
                warn!("Failed to refresh symbols: {}", e);
            }
            sleep(interval).await;
        }
    }

    /// Main feed loop; never returns.
    pub async fn run(&self) {
        match self.cfg.price_source {
            PriceSource::Ws => self.run_ws_loop().await,
            PriceSource::Rest => self.run_rest_loop().await,
        }
    }

    async fn run_ws_loop(&self) {
        let mut reconnect_delay = Duration::from_secs(1);
        const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

        loop {
            let symbols = self.symbols.read().unwrap().clone();
            if symbols.is_empty() {
                debug!("No symbols to monitor yet");
                sleep(Duration::from_secs(5)).await;
                continue;
            }

            match BinanceWs::connect(&self.cfg.ws_url, &symbols).await {
                Ok(mut ws) => {
                    self.connected.store(true, Ordering::SeqCst);
                    reconnect_delay = Duration::from_secs(1);
                    info!("Monitoring {:?} over the trade stream", symbols);

                    loop {
                        match ws.next_price().await {
                            Ok(Some(update)) => self.handle_price_update(update).await,
                            Ok(None) => break,
                            Err(e) => {
                                warn!("Trade stream error: {}", e);
                                break;
                            }
                        }
                    }

                    self.connected.store(false, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!("Connection failed: {}, retrying in {:?}", e, reconnect_delay);
                }
            }

            sleep(reconnect_delay).await;
            reconnect_delay = (reconnect_delay * 2).min(MAX_RECONNECT_DELAY);
        }
    }

    async fn run_rest_loop(&self) {
        let ticker = BinanceTicker::new(&self.cfg.rest_url);
        let interval = Duration::from_millis(self.cfg.price_check_interval_ms);

        loop {
            let symbols = self.symbols.read().unwrap().clone();
            if symbols.is_empty() {
                debug!("No symbols to monitor yet");
                sleep(Duration::from_secs(5)).await;
                continue;
            }

            match ticker.get_prices(&symbols).await {
                Ok(prices) => {
                    self.connected.store(true, Ordering::SeqCst);
                    for (symbol, price) in prices {
                        self.handle_price_update(PriceUpdate { symbol, price }).await;
                    }
                }
                Err(e) => {
                    self.connected.store(false, Ordering::SeqCst);
                    warn!("Failed to fetch prices: {}", e);
                }
            }

            sleep(interval).await;
        }
    }

    pub async fn handle_price_update(&self, update: PriceUpdate) {
        let now = Utc::now();
        let forward = {
            let state = self.state.lock().unwrap();
            should_forward(
                state.last_trigger.get(&update.symbol).copied(),
                state.last_price.get(&update.symbol).copied(),
                now,
                update.price,
                self.cfg.trigger_interval_ms,
                self.cfg.min_price_change_pct,
            )
        };

        if !forward {
            return;
        }

        if let Err(e) = self
            .grid_client
            .send_price_trigger(&update.symbol, update.price)
            .await
        {
            warn!("Failed to send trigger for {} at {}: {}", update.symbol, update.price, e);
            return;
        }

        let mut state = self.state.lock().unwrap();
        state.last_trigger.insert(update.symbol.clone(), now);
        state.last_price.insert(update.symbol.clone(), update.price);
        info!("Triggered {} at {}", update.symbol, update.price);
    }

    pub fn status(&self) -> MonitorStatus {
        let state = self.state.lock().unwrap();
        MonitorStatus {
            connected: self.is_connected(),
            monitored_symbols: self.symbols.read().unwrap().clone(),
            last_prices: state
                .last_price
                .iter()
                .map(|(symbol, price)| (symbol.clone(), price.to_string()))
                .collect(),
            last_triggers: state
                .last_trigger
                .iter()
                .map(|(symbol, at)| (symbol.clone(), at.to_rfc3339()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub connected: bool,
    pub monitored_symbols: Vec<String>,
    pub last_prices: HashMap<String, String>,
    pub last_triggers: HashMap<String, String>,
}

/// The throttle decision: drop a tick that arrives inside the per-symbol
/// trigger interval, or whose relative change against the last forwarded
/// price is below the configured minimum (in percent).
pub fn should_forward(
    last_trigger: Option<DateTime<Utc>>,
    last_price: Option<Decimal>,
    now: DateTime<Utc>,
    price: Decimal,
    trigger_interval_ms: i64,
    min_change_pct: Decimal,
) -> bool {
    if let Some(last) = last_trigger {
        if now - last < ChronoDuration::milliseconds(trigger_interval_ms) {
            return false;
        }
    }

    if let Some(last) = last_price {
        if !last.is_zero() {
            let change_pct = ((price - last).abs() / last) * dec!(100);
            if change_pct < min_change_pct {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_always_forwards() {
        assert!(should_forward(None, None, Utc::now(), dec!(3650), 1000, dec!(0.01)));
    }

    #[test]
    fn test_tick_inside_interval_dropped() {
        let now = Utc::now();
        let last = now - ChronoDuration::milliseconds(500);
        assert!(!should_forward(Some(last), Some(dec!(3600)), now, dec!(3700), 1000, dec!(0.01)));
    }

    #[test]
    fn test_insignificant_change_dropped() {
        let now = Utc::now();
        let last = now - ChronoDuration::milliseconds(5000);
        // 0.005% move against a 0.01% threshold.
        assert!(!should_forward(
            Some(last),
            Some(dec!(10000)),
            now,
            dec!(10000.5),
            1000,
            dec!(0.01)
        ));
    }

    #[test]
    fn test_significant_change_forwards() {
        let now = Utc::now();
        let last = now - ChronoDuration::milliseconds(5000);
        assert!(should_forward(
            Some(last),
            Some(dec!(10000)),
            now,
            dec!(10010),
            1000,
            dec!(0.01)
        ));
    }

    #[test]
    fn test_change_measured_in_both_directions() {
        let now = Utc::now();
        let last = now - ChronoDuration::milliseconds(5000);
        assert!(should_forward(
            Some(last),
            Some(dec!(10000)),
            now,
            dec!(9990),
            1000,
            dec!(0.01)
        ));
    }

    #[test]
    fn test_zero_last_price_does_not_divide() {
        let now = Utc::now();
        let last = now - ChronoDuration::milliseconds(5000);
        assert!(should_forward(Some(last), Some(Decimal::ZERO), now, dec!(1), 1000, dec!(0.01)));
    }
}
