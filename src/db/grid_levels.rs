//! Grid level repository.
//!
//! The guarded conditional updates here are the system's only concurrency
//! primitive: every `try_*` / `process_*` method updates a row only when it
//! is still in the expected pre-state, and reports through its return value
//! whether this caller won the transition.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::db::{dec_text, get_decimal, get_opt_decimal, get_timestamp, timestamp_text, Database};
use crate::error::{TradingError, TradingResult};
use crate::models::{GridLevel, GridState};

const LEVEL_COLUMNS: &str = "id, symbol, buy_price, sell_price, buy_amount, filled_amount, \
     state, buy_order_id, sell_order_id, enabled, state_changed_at, created_at, updated_at";

#[derive(Clone)]
pub struct GridLevelRepository {
    conn: Arc<Mutex<Connection>>,
}

impl GridLevelRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            conn: db.connection(),
        }
    }

    fn level_from_row(row: &Row) -> rusqlite::Result<GridLevel> {
        let state_text: String = row.get(6)?;
        let state = GridState::parse(&state_text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                format!("unknown grid state: {}", state_text).into(),
            )
        })?;

        Ok(GridLevel {
            id: row.get(0)?,
            symbol: row.get(1)?,
            buy_price: get_decimal(row, 2)?,
            sell_price: get_decimal(row, 3)?,
            buy_amount: get_decimal(row, 4)?,
            filled_amount: get_opt_decimal(row, 5)?,
            state,
            buy_order_id: row.get(7)?,
            sell_order_id: row.get(8)?,
            enabled: row.get(9)?,
            state_changed_at: get_timestamp(row, 10)?,
            created_at: get_timestamp(row, 11)?,
            updated_at: get_timestamp(row, 12)?,
        })
    }

    pub fn get_all(&self) -> TradingResult<Vec<GridLevel>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM grid_levels ORDER BY symbol, CAST(buy_price AS REAL) ASC",
            LEVEL_COLUMNS
        ))?;
        let rows = stmt.query_map([], Self::level_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_by_symbol(&self, symbol: &str) -> TradingResult<Vec<GridLevel>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM grid_levels WHERE symbol = ?1 ORDER BY CAST(buy_price AS REAL) ASC",
            LEVEL_COLUMNS
        ))?;
        let rows = stmt.query_map(params![symbol], Self::level_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_by_id(&self, id: i64) -> TradingResult<Option<GridLevel>> {
        self.get_one("id = ?1", params![id])
    }

    pub fn get_by_buy_order_id(&self, order_id: &str) -> TradingResult<Option<GridLevel>> {
        self.get_one("buy_order_id = ?1", params![order_id])
    }

    pub fn get_by_sell_order_id(&self, order_id: &str) -> TradingResult<Option<GridLevel>> {
        self.get_one("sell_order_id = ?1", params![order_id])
    }

    fn get_one(
        &self,
        predicate: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> TradingResult<Option<GridLevel>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM grid_levels WHERE {}",
            LEVEL_COLUMNS, predicate
        ))?;
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::level_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Levels that entered a `PLACING_*` state longer ago than `timeout` and
    /// never made it out. These are the sweeper's recovery candidates.
    pub fn get_stuck_in_placing(&self, timeout: Duration) -> TradingResult<Vec<GridLevel>> {
        let cutoff: DateTime<Utc> = Utc::now() - timeout;
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM grid_levels \
             WHERE state IN ('PLACING_BUY', 'PLACING_SELL') AND state_changed_at < ?1",
            LEVEL_COLUMNS
        ))?;
        let rows = stmt.query_map(params![timestamp_text(cutoff)], Self::level_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_all_active(&self) -> TradingResult<Vec<GridLevel>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM grid_levels WHERE state IN ('BUY_ACTIVE', 'SELL_ACTIVE')",
            LEVEL_COLUMNS
        ))?;
        let rows = stmt.query_map([], Self::level_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_distinct_symbols(&self) -> TradingResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT DISTINCT symbol FROM grid_levels ORDER BY symbol")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Counts of enabled levels in HOLDING and READY, for the status view.
    pub fn get_level_counts(&self) -> TradingResult<(i64, i64)> {
        let conn = self.conn.lock().unwrap();
        let counts = conn.query_row(
            "SELECT \
                COUNT(CASE WHEN state = 'HOLDING' THEN 1 END), \
                COUNT(CASE WHEN state = 'READY' THEN 1 END) \
             FROM grid_levels WHERE enabled = 1",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        Ok(counts)
    }

    /// READY -> PLACING_BUY, only for an enabled level still in READY.
    /// Returns whether this caller won the transition.
    pub fn try_start_buy_order(&self, id: i64) -> TradingResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE grid_levels \
             SET state = 'PLACING_BUY', state_changed_at = datetime('now'), updated_at = datetime('now') \
             WHERE id = ?1 AND state = 'READY' AND enabled = 1",
            params![id],
        )?;
        if affected > 0 {
            info!("Level {} → PLACING_BUY", id);
        }
        Ok(affected > 0)
    }

    /// HOLDING -> PLACING_SELL, requires a recorded filled amount.
    pub fn try_start_sell_order(&self, id: i64) -> TradingResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE grid_levels \
             SET state = 'PLACING_SELL', state_changed_at = datetime('now'), updated_at = datetime('now') \
             WHERE id = ?1 AND state = 'HOLDING' AND enabled = 1 AND filled_amount IS NOT NULL",
            params![id],
        )?;
        if affected > 0 {
            info!("Level {} → PLACING_SELL", id);
        }
        Ok(affected > 0)
    }

    /// PLACING_BUY -> BUY_ACTIVE, recording the venue order id. A `false`
    /// return means the level left PLACING_BUY in the meantime and the
    /// transition must be abandoned.
    pub fn update_buy_order_placed(&self, id: i64, order_id: &str) -> TradingResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE grid_levels \
             SET state = 'BUY_ACTIVE', buy_order_id = ?2, state_changed_at = datetime('now'), updated_at = datetime('now') \
             WHERE id = ?1 AND state = 'PLACING_BUY'",
            params![id, order_id],
        )?;
        if affected > 0 {
            info!("Level {} → BUY_ACTIVE, buy_order_id={}", id, order_id);
        } else {
            warn!("Level {} not in PLACING_BUY, cannot record buy order {}", id, order_id);
        }
        Ok(affected > 0)
    }

    /// PLACING_SELL -> SELL_ACTIVE, recording the venue order id.
    pub fn update_sell_order_placed(&self, id: i64, order_id: &str) -> TradingResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE grid_levels \
             SET state = 'SELL_ACTIVE', sell_order_id = ?2, state_changed_at = datetime('now'), updated_at = datetime('now') \
             WHERE id = ?1 AND state = 'PLACING_SELL'",
            params![id, order_id],
        )?;
        if affected > 0 {
            info!("Level {} → SELL_ACTIVE, sell_order_id={}", id, order_id);
        } else {
            warn!("Level {} not in PLACING_SELL, cannot record sell order {}", id, order_id);
        }
        Ok(affected > 0)
    }

    /// BUY_ACTIVE -> HOLDING on a confirmed fill. Clears the buy order id so
    /// duplicate deliveries no longer resolve to this level.
    pub fn process_buy_fill(&self, id: i64, filled_amount: Decimal) -> TradingResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE grid_levels \
             SET state = 'HOLDING', filled_amount = ?2, buy_order_id = NULL, \
                 state_changed_at = datetime('now'), updated_at = datetime('now') \
             WHERE id = ?1 AND state = 'BUY_ACTIVE'",
            params![id, dec_text(filled_amount)],
        )?;
        if affected > 0 {
            info!("Level {} → HOLDING, filled_amount={}", id, filled_amount);
        } else {
            warn!("Level {} not in BUY_ACTIVE, skipping buy fill", id);
        }
        Ok(affected > 0)
    }

    /// SELL_ACTIVE -> READY: the cycle is complete, position and sell order
    /// are cleared.
    pub fn process_sell_fill(&self, id: i64) -> TradingResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE grid_levels \
             SET state = 'READY', filled_amount = NULL, sell_order_id = NULL, \
                 state_changed_at = datetime('now'), updated_at = datetime('now') \
             WHERE id = ?1 AND state = 'SELL_ACTIVE'",
            params![id],
        )?;
        if affected > 0 {
            info!("Level {} → READY (cycle complete)", id);
        } else {
            warn!("Level {} not in SELL_ACTIVE, skipping sell fill", id);
        }
        Ok(affected > 0)
    }

    /// Revert a buy-side level (PLACING_BUY or BUY_ACTIVE) to READY and drop
    /// the order id. Used when the venue reports the order cancelled or gone.
    pub fn release_buy_order(&self, id: i64) -> TradingResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE grid_levels \
             SET state = 'READY', buy_order_id = NULL, \
                 state_changed_at = datetime('now'), updated_at = datetime('now') \
             WHERE id = ?1 AND state IN ('PLACING_BUY', 'BUY_ACTIVE')",
            params![id],
        )?;
        if affected > 0 {
            info!("Level {} → READY (buy order released)", id);
        }
        Ok(affected > 0)
    }

    /// Revert a sell-side level (PLACING_SELL or SELL_ACTIVE) to HOLDING and
    /// drop the order id; the held amount stays for the next attempt.
    pub fn release_sell_order(&self, id: i64) -> TradingResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE grid_levels \
             SET state = 'HOLDING', sell_order_id = NULL, \
                 state_changed_at = datetime('now'), updated_at = datetime('now') \
             WHERE id = ?1 AND state IN ('PLACING_SELL', 'SELL_ACTIVE')",
            params![id],
        )?;
        if affected > 0 {
            info!("Level {} → HOLDING (sell order released)", id);
        }
        Ok(affected > 0)
    }

    /// Unconditional state change; the escape hatch for PLACING_* reverts
    /// and the terminal ERROR transition.
    pub fn update_state(&self, id: i64, state: GridState) -> TradingResult<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE grid_levels \
             SET state = ?2, state_changed_at = datetime('now'), updated_at = datetime('now') \
             WHERE id = ?1",
            params![id, state.as_str()],
        )?;
        if affected > 0 {
            info!("Level {} state → {}", id, state);
        } else {
            warn!("Level {} state update to {} affected 0 rows", id, state);
        }
        Ok(())
    }

    /// Insert a new level in READY. The natural key makes this idempotent:
    /// an existing `(symbol, buy_price, sell_price)` triple is skipped and
    /// `None` is returned.
    pub fn create(
        &self,
        symbol: &str,
        buy_price: Decimal,
        sell_price: Decimal,
        buy_amount: Decimal,
    ) -> TradingResult<Option<i64>> {
        if sell_price <= buy_price {
            return Err(TradingError::Validation(format!(
                "sell price {} must be greater than buy price {}",
                sell_price, buy_price
            )));
        }

        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "INSERT INTO grid_levels (symbol, buy_price, sell_price, buy_amount, state, enabled) \
             VALUES (?1, ?2, ?3, ?4, 'READY', 1) \
             ON CONFLICT (symbol, buy_price, sell_price) DO NOTHING",
            params![
                symbol,
                dec_text(buy_price),
                dec_text(sell_price),
                dec_text(buy_amount)
            ],
        )?;

        if affected == 0 {
            Ok(None)
        } else {
            Ok(Some(conn.last_insert_rowid()))
        }
    }
}
