//! SQLite persistence layer.
//!
//! A single connection behind a mutex serializes all writes, which is the
//! concurrency model the guarded state transitions rely on. Decimals are
//! stored as TEXT and timestamps as UTC `datetime('now')` text.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rusqlite::types::Type;
use rusqlite::{Connection, Result as SqlResult, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

pub mod grid_levels;
pub mod transactions;

pub use grid_levels::GridLevelRepository;
pub use transactions::{DailyCounts, ProfitStats, TransactionRepository};

const SCHEMA_SQL: &str = include_str!("migrations/V1__initial_schema.sql");
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Shared handle to the single writer connection. Opening a database also
/// applies the schema, so a handle is always ready for the repositories.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and bring the schema up.
    pub fn open<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Throwaway in-memory database, used by the test suites.
    pub fn open_in_memory() -> SqlResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> SqlResult<Self> {
        // SQLite leaves foreign keys off by default; the audit log's
        // reference to grid_levels depends on them.
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Hand out the shared connection; each repository keeps its own clone.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Cheap liveness probe for the health endpoints.
    pub fn ping(&self) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(()))
    }
}

/// Canonical TEXT form for stored decimals. Trailing zeros are stripped so
/// the natural-key uniqueness on `(symbol, buy_price, sell_price)` cannot be
/// defeated by `3600` vs `3600.00`.
pub(crate) fn dec_text(value: Decimal) -> String {
    value.normalize().to_string()
}

pub(crate) fn get_decimal(row: &Row, idx: usize) -> SqlResult<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn get_opt_decimal(row: &Row, idx: usize) -> SqlResult<Option<Decimal>> {
    let text: Option<String> = row.get(idx)?;
    match text {
        Some(text) => Decimal::from_str(&text)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

pub(crate) fn get_timestamp(row: &Row, idx: usize) -> SqlResult<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    let naive = NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Format a timestamp the way SQLite's `datetime('now')` does.
pub(crate) fn timestamp_text(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
