// Common test utilities and helpers
#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use grid_harvester::db::{Database, GridLevelRepository, TransactionRepository};
use grid_harvester::engine::{GridService, OrderAssurance};
use grid_harvester::error::{TradingError, TradingResult};
use grid_harvester::models::{
    GridLevel, GridState, OrderRequest, OrderResponse, OrderState, OrderStatusInfo,
};

/// Create an in-memory database; opening it applies the schema.
pub fn test_database() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

/// Create a temporary directory for file-backed test databases.
pub fn create_temp_db_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    (temp_dir, db_path)
}

/// Gateway mock implementing the assurance contract: identical parameters
/// within one test resolve to one order unless `fixed_order_id` is unset
/// and the counter advances.
pub struct MockAssurance {
    pub placed: Mutex<Vec<OrderRequest>>,
    pub statuses: Mutex<HashMap<String, OrderStatusInfo>>,
    pub fail_place: AtomicBool,
    pub fixed_order_id: Mutex<Option<String>>,
    issued: Mutex<HashSet<String>>,
    counter: AtomicU64,
}

impl MockAssurance {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            placed: Mutex::new(Vec::new()),
            statuses: Mutex::new(HashMap::new()),
            fail_place: AtomicBool::new(false),
            fixed_order_id: Mutex::new(None),
            issued: Mutex::new(HashSet::new()),
            counter: AtomicU64::new(0),
        })
    }

    pub fn placed_orders(&self) -> Vec<OrderRequest> {
        self.placed.lock().unwrap().clone()
    }

    pub fn placed_count(&self) -> usize {
        self.placed.lock().unwrap().len()
    }

    pub fn set_status(&self, order_id: &str, status: OrderState, fill: Option<(Decimal, Decimal)>) {
        self.statuses.lock().unwrap().insert(
            order_id.to_string(),
            OrderStatusInfo {
                order_id: order_id.to_string(),
                status,
                filled_amount: fill.map(|(amount, _)| amount),
                fill_price: fill.map(|(_, price)| price),
            },
        );
    }

    pub fn last_order_id(&self) -> String {
        let n = self.counter.load(Ordering::SeqCst);
        format!("order-{}", n)
    }
}

#[async_trait]
impl OrderAssurance for MockAssurance {
    async fn place_order(&self, req: &OrderRequest) -> TradingResult<OrderResponse> {
        if self.fail_place.load(Ordering::SeqCst) {
            return Err(TradingError::OrderFailed("venue unavailable".to_string()));
        }

        self.placed.lock().unwrap().push(req.clone());

        let order_id = match self.fixed_order_id.lock().unwrap().clone() {
            Some(id) => id,
            None => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                format!("order-{}", n)
            }
        };
        self.issued.lock().unwrap().insert(order_id.clone());

        Ok(OrderResponse {
            order_id,
            status: "assured".to_string(),
        })
    }

    async fn order_status(
        &self,
        _symbol: &str,
        order_id: &str,
    ) -> TradingResult<Option<OrderStatusInfo>> {
        if let Some(status) = self.statuses.lock().unwrap().get(order_id) {
            return Ok(Some(status.clone()));
        }
        if self.issued.lock().unwrap().contains(order_id) {
            return Ok(Some(OrderStatusInfo {
                order_id: order_id.to_string(),
                status: OrderState::Open,
                filled_amount: None,
                fill_price: None,
            }));
        }
        Ok(None)
    }
}

/// Engine service wired to an in-memory database and the mock gateway,
/// with the default 0.1% per-side fee.
pub fn make_service(db: &Database, assurance: Arc<MockAssurance>) -> GridService {
    GridService::new(
        GridLevelRepository::new(db),
        TransactionRepository::new(db),
        assurance,
        dec!(0.1),
    )
}

/// Insert a READY level and return its id.
pub fn seed_level(db: &Database, symbol: &str, buy: Decimal, sell: Decimal, amount: Decimal) -> i64 {
    GridLevelRepository::new(db)
        .create(symbol, buy, sell, amount)
        .expect("Failed to create level")
        .expect("Level already existed")
}

pub fn get_level(db: &Database, id: i64) -> GridLevel {
    GridLevelRepository::new(db)
        .get_by_id(id)
        .expect("Failed to load level")
        .expect("Level not found")
}

/// Force a level into an arbitrary state (test scaffolding only; the
/// engine itself always goes through the guarded updates).
pub fn force_state(db: &Database, id: i64, state: GridState, filled_amount: Option<Decimal>) {
    let conn = db.connection();
    let conn = conn.lock().unwrap();
    conn.execute(
        "UPDATE grid_levels SET state = ?2, filled_amount = ?3, \
         state_changed_at = datetime('now'), updated_at = datetime('now') WHERE id = ?1",
        rusqlite::params![id, state.as_str(), filled_amount.map(|a| a.normalize().to_string())],
    )
    .expect("Failed to force state");
}

pub fn set_buy_order_id(db: &Database, id: i64, order_id: &str) {
    let conn = db.connection();
    let conn = conn.lock().unwrap();
    conn.execute(
        "UPDATE grid_levels SET buy_order_id = ?2 WHERE id = ?1",
        rusqlite::params![id, order_id],
    )
    .expect("Failed to set buy order id");
}

pub fn set_enabled(db: &Database, id: i64, enabled: bool) {
    let conn = db.connection();
    let conn = conn.lock().unwrap();
    conn.execute(
        "UPDATE grid_levels SET enabled = ?2 WHERE id = ?1",
        rusqlite::params![id, enabled],
    )
    .expect("Failed to set enabled");
}

/// Backdate the last state change, e.g. to make a PLACING_* level look
/// stuck to the sweeper.
pub fn backdate_state_change(db: &Database, id: i64, minutes: i64) {
    let conn = db.connection();
    let conn = conn.lock().unwrap();
    conn.execute(
        "UPDATE grid_levels SET state_changed_at = datetime('now', ?2) WHERE id = ?1",
        rusqlite::params![id, format!("-{} minutes", minutes)],
    )
    .expect("Failed to backdate state change");
}

pub fn count_transactions(db: &Database, side: &str, status: &str) -> i64 {
    let conn = db.connection();
    let conn = conn.lock().unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE side = ?1 AND status = ?2",
        rusqlite::params![side, status],
        |row| row.get(0),
    )
    .expect("Failed to count transactions")
}
