// Price monitor tests against a stub engine: throttle behavior, trigger
// forwarding and symbol refresh from the engine's grid listing.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use grid_harvester::config::{MonitorConfig, PriceSource};
use grid_harvester::monitor::{PriceMonitor, PriceUpdate};

struct EngineStub {
    triggers: Mutex<Vec<Value>>,
}

async fn spawn_engine_stub() -> (String, Arc<EngineStub>) {
    let state = Arc::new(EngineStub {
        triggers: Mutex::new(Vec::new()),
    });

    async fn trigger(State(state): State<Arc<EngineStub>>, Json(body): Json<Value>) -> Json<Value> {
        state.triggers.lock().unwrap().push(body);
        Json(json!({"status": "processed"}))
    }

    async fn grids() -> Json<Value> {
        Json(json!([
            {"symbol": "ETHUSDT", "buy_price": "3600", "sell_price": "3800"},
            {"symbol": "ETHUSDT", "buy_price": "3400", "sell_price": "3600"},
            {"symbol": "BTCUSDT", "buy_price": "60000", "sell_price": "62000"}
        ]))
    }

    let app = Router::new()
        .route("/trigger-for-price", post(trigger))
        .route("/grids", get(grids))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

fn monitor_config(engine_url: &str, symbols: Vec<String>) -> MonitorConfig {
    MonitorConfig {
        server_port: 0,
        grid_trading_url: engine_url.to_string(),
        monitored_symbols: symbols,
        price_source: PriceSource::Rest,
        ws_url: "wss://localhost:1/unused".to_string(),
        rest_url: "http://localhost:1/unused".to_string(),
        price_check_interval_ms: 1000,
        trigger_interval_ms: 200,
        min_price_change_pct: dec!(0.01),
        symbol_refresh_interval_ms: 60000,
    }
}

#[tokio::test]
async fn test_first_update_triggers_engine() {
    let (engine_url, engine) = spawn_engine_stub().await;
    let monitor = PriceMonitor::new(monitor_config(&engine_url, vec!["ETHUSDT".to_string()]));

    monitor
        .handle_price_update(PriceUpdate {
            symbol: "ETHUSDT".to_string(),
            price: dec!(3650.5),
        })
        .await;

    let triggers = engine.triggers.lock().unwrap();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0]["symbol"], "ETHUSDT");
    assert_eq!(triggers[0]["price"], "3650.5");
}

#[tokio::test]
async fn test_updates_inside_interval_are_dropped() {
    let (engine_url, engine) = spawn_engine_stub().await;
    let monitor = PriceMonitor::new(monitor_config(&engine_url, vec!["ETHUSDT".to_string()]));

    monitor
        .handle_price_update(PriceUpdate {
            symbol: "ETHUSDT".to_string(),
            price: dec!(3650),
        })
        .await;
    // A large move immediately after: still inside the trigger interval.
    monitor
        .handle_price_update(PriceUpdate {
            symbol: "ETHUSDT".to_string(),
            price: dec!(3700),
        })
        .await;

    assert_eq!(engine.triggers.lock().unwrap().len(), 1);

    // After the interval passes, the same move goes through.
    tokio::time::sleep(Duration::from_millis(250)).await;
    monitor
        .handle_price_update(PriceUpdate {
            symbol: "ETHUSDT".to_string(),
            price: dec!(3700),
        })
        .await;
    assert_eq!(engine.triggers.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_insignificant_moves_are_dropped() {
    let (engine_url, engine) = spawn_engine_stub().await;
    let monitor = PriceMonitor::new(monitor_config(&engine_url, vec!["ETHUSDT".to_string()]));

    monitor
        .handle_price_update(PriceUpdate {
            symbol: "ETHUSDT".to_string(),
            price: dec!(10000),
        })
        .await;

    tokio::time::sleep(Duration::from_millis(250)).await;
    // 0.005% move against a 0.01% threshold: dropped even though the
    // interval has passed.
    monitor
        .handle_price_update(PriceUpdate {
            symbol: "ETHUSDT".to_string(),
            price: dec!(10000.5),
        })
        .await;
    assert_eq!(engine.triggers.lock().unwrap().len(), 1);

    // A full 0.1% move goes through.
    monitor
        .handle_price_update(PriceUpdate {
            symbol: "ETHUSDT".to_string(),
            price: dec!(10010),
        })
        .await;
    assert_eq!(engine.triggers.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_symbols_are_throttled_independently() {
    let (engine_url, engine) = spawn_engine_stub().await;
    let monitor = PriceMonitor::new(monitor_config(
        &engine_url,
        vec!["ETHUSDT".to_string(), "BTCUSDT".to_string()],
    ));

    monitor
        .handle_price_update(PriceUpdate {
            symbol: "ETHUSDT".to_string(),
            price: dec!(3650),
        })
        .await;
    // A different symbol right away is not throttled by the first one.
    monitor
        .handle_price_update(PriceUpdate {
            symbol: "BTCUSDT".to_string(),
            price: dec!(61000),
        })
        .await;

    assert_eq!(engine.triggers.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_symbol_refresh_follows_engine_grids() {
    let (engine_url, _engine) = spawn_engine_stub().await;
    // No static symbol list: the monitor follows the engine's grids.
    let monitor = PriceMonitor::new(monitor_config(&engine_url, Vec::new()));

    monitor.refresh_symbols().await.unwrap();

    let status = monitor.status();
    assert_eq!(
        status.monitored_symbols,
        vec!["ETHUSDT".to_string(), "BTCUSDT".to_string()],
        "distinct symbols in level order"
    );
}

#[tokio::test]
async fn test_static_symbol_list_wins_over_refresh() {
    let (engine_url, _engine) = spawn_engine_stub().await;
    let monitor = PriceMonitor::new(monitor_config(&engine_url, vec!["SOLUSDT".to_string()]));

    monitor.refresh_symbols().await.unwrap();

    assert_eq!(monitor.status().monitored_symbols, vec!["SOLUSDT".to_string()]);
}

#[tokio::test]
async fn test_status_reflects_forwarded_prices() {
    let (engine_url, _engine) = spawn_engine_stub().await;
    let monitor = PriceMonitor::new(monitor_config(&engine_url, vec!["ETHUSDT".to_string()]));

    monitor
        .handle_price_update(PriceUpdate {
            symbol: "ETHUSDT".to_string(),
            price: dec!(3650.5),
        })
        .await;

    let status = monitor.status();
    assert_eq!(status.last_prices.get("ETHUSDT").map(String::as_str), Some("3650.5"));
    assert!(status.last_triggers.contains_key("ETHUSDT"));
    assert!(!status.connected, "connection flag belongs to the feed loop");
}

#[tokio::test]
async fn test_failed_trigger_does_not_update_throttle_state() {
    // Point the monitor at a dead engine: the trigger fails and the
    // throttle state must stay unprimed so the next tick retries.
    let monitor = PriceMonitor::new(monitor_config("http://127.0.0.1:1", vec!["ETHUSDT".to_string()]));

    monitor
        .handle_price_update(PriceUpdate {
            symbol: "ETHUSDT".to_string(),
            price: dec!(3650),
        })
        .await;

    let status = monitor.status();
    assert!(status.last_prices.is_empty());
    assert!(status.last_triggers.is_empty());
}
