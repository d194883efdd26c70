//! Transaction repository: the append-only audit log.
//!
//! FILLED and PLACED rows are plain inserts. ERROR rows are deduplicated:
//! an identical error (level, side, target price, message) within one hour
//! is suppressed so a flapping venue cannot flood the log.

use chrono::{Datelike, Duration, Utc};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::db::{dec_text, get_decimal, get_opt_decimal, get_timestamp, Database};
use crate::error::TradingResult;
use crate::models::{Transaction, TxSide, TxStatus};

const TX_COLUMNS: &str = "id, grid_level_id, symbol, side, status, order_id, target_price, \
     executed_price, amount_coin, amount_usdt, related_buy_id, profit_usdt, profit_pct, \
     error_code, error_msg, created_at";

#[derive(Debug, Clone, Default)]
pub struct DailyCounts {
    pub buys: i64,
    pub sells: i64,
    pub errors: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ProfitStats {
    pub today: Decimal,
    pub week: Decimal,
    pub month: Decimal,
    pub all_time: Decimal,
}

#[derive(Clone)]
pub struct TransactionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TransactionRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            conn: db.connection(),
        }
    }

    fn tx_from_row(row: &Row) -> rusqlite::Result<Transaction> {
        let side_text: String = row.get(3)?;
        let status_text: String = row.get(4)?;
        let side = TxSide::parse(&side_text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown transaction side: {}", side_text).into(),
            )
        })?;
        let status = TxStatus::parse(&status_text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown transaction status: {}", status_text).into(),
            )
        })?;

        Ok(Transaction {
            id: row.get(0)?,
            grid_level_id: row.get(1)?,
            symbol: row.get(2)?,
            side,
            status,
            order_id: row.get(5)?,
            target_price: get_decimal(row, 6)?,
            executed_price: get_opt_decimal(row, 7)?,
            amount_coin: get_opt_decimal(row, 8)?,
            amount_usdt: get_opt_decimal(row, 9)?,
            related_buy_id: row.get(10)?,
            profit_usdt: get_opt_decimal(row, 11)?,
            profit_pct: get_opt_decimal(row, 12)?,
            error_code: row.get(13)?,
            error_msg: row.get(14)?,
            created_at: get_timestamp(row, 15)?,
        })
    }

    pub fn record_buy_placed(
        &self,
        grid_level_id: i64,
        symbol: &str,
        order_id: &str,
        target_price: Decimal,
        amount_usdt: Decimal,
    ) -> TradingResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO transactions (grid_level_id, symbol, side, status, order_id, target_price, amount_usdt) \
             VALUES (?1, ?2, 'BUY', 'PLACED', ?3, ?4, ?5)",
            params![grid_level_id, symbol, order_id, dec_text(target_price), dec_text(amount_usdt)],
        )?;
        info!(
            "Recorded BUY PLACED - level {}, order {}, target {}, amount {} USDT",
            grid_level_id, order_id, target_price, amount_usdt
        );
        Ok(())
    }

    pub fn record_sell_placed(
        &self,
        grid_level_id: i64,
        symbol: &str,
        order_id: &str,
        target_price: Decimal,
        amount_coin: Decimal,
    ) -> TradingResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO transactions (grid_level_id, symbol, side, status, order_id, target_price, amount_coin) \
             VALUES (?1, ?2, 'SELL', 'PLACED', ?3, ?4, ?5)",
            params![grid_level_id, symbol, order_id, dec_text(target_price), dec_text(amount_coin)],
        )?;
        info!(
            "Recorded SELL PLACED - level {}, order {}, target {}, amount {} coins",
            grid_level_id, order_id, target_price, amount_coin
        );
        Ok(())
    }

    pub fn record_buy_filled(
        &self,
        grid_level_id: i64,
        symbol: &str,
        order_id: &str,
        target_price: Decimal,
        executed_price: Decimal,
        amount_coin: Decimal,
        amount_usdt: Decimal,
    ) -> TradingResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO transactions (grid_level_id, symbol, side, status, order_id, target_price, \
                                       executed_price, amount_coin, amount_usdt) \
             VALUES (?1, ?2, 'BUY', 'FILLED', ?3, ?4, ?5, ?6, ?7)",
            params![
                grid_level_id,
                symbol,
                order_id,
                dec_text(target_price),
                dec_text(executed_price),
                dec_text(amount_coin),
                dec_text(amount_usdt)
            ],
        )?;
        let tx_id = conn.last_insert_rowid();
        info!(
            "Recorded BUY FILLED (tx {}) - level {}, order {}, executed {} (target {}), {} coins = {} USDT",
            tx_id, grid_level_id, order_id, executed_price, target_price, amount_coin, amount_usdt
        );
        Ok(tx_id)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_sell_filled(
        &self,
        grid_level_id: i64,
        symbol: &str,
        order_id: &str,
        target_price: Decimal,
        executed_price: Decimal,
        amount_coin: Decimal,
        amount_usdt: Decimal,
        related_buy_id: Option<i64>,
        profit_usdt: Option<Decimal>,
        profit_pct: Option<Decimal>,
    ) -> TradingResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO transactions (grid_level_id, symbol, side, status, order_id, target_price, \
                                       executed_price, amount_coin, amount_usdt, related_buy_id, \
                                       profit_usdt, profit_pct) \
             VALUES (?1, ?2, 'SELL', 'FILLED', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                grid_level_id,
                symbol,
                order_id,
                dec_text(target_price),
                dec_text(executed_price),
                dec_text(amount_coin),
                dec_text(amount_usdt),
                related_buy_id,
                profit_usdt.map(dec_text),
                profit_pct.map(dec_text)
            ],
        )?;
        let tx_id = conn.last_insert_rowid();
        match (related_buy_id, profit_usdt) {
            (Some(buy_id), Some(profit)) => info!(
                "Recorded SELL FILLED (tx {}) - level {}, order {}, executed {} (target {}), \
                 {} coins = {} USDT, related buy {}, profit {} USDT",
                tx_id, grid_level_id, order_id, executed_price, target_price, amount_coin,
                amount_usdt, buy_id, profit
            ),
            _ => info!(
                "Recorded SELL FILLED (tx {}) - level {}, order {}, executed {} (target {}), \
                 {} coins = {} USDT (no related buy)",
                tx_id, grid_level_id, order_id, executed_price, target_price, amount_coin, amount_usdt
            ),
        }
        Ok(tx_id)
    }

    pub fn record_buy_error(
        &self,
        grid_level_id: i64,
        symbol: &str,
        target_price: Decimal,
        error_code: &str,
        error_msg: &str,
    ) -> TradingResult<bool> {
        self.record_error(grid_level_id, symbol, TxSide::Buy, target_price, error_code, error_msg)
    }

    pub fn record_sell_error(
        &self,
        grid_level_id: i64,
        symbol: &str,
        target_price: Decimal,
        error_code: &str,
        error_msg: &str,
    ) -> TradingResult<bool> {
        self.record_error(grid_level_id, symbol, TxSide::Sell, target_price, error_code, error_msg)
    }

    /// Insert an ERROR row unless an identical one was written within the
    /// last hour. Returns whether a row was actually written.
    fn record_error(
        &self,
        grid_level_id: i64,
        symbol: &str,
        side: TxSide,
        target_price: Decimal,
        error_code: &str,
        error_msg: &str,
    ) -> TradingResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "INSERT INTO transactions (grid_level_id, symbol, side, status, target_price, error_code, error_msg) \
             SELECT ?1, ?2, ?3, 'ERROR', ?4, ?5, ?6 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM transactions \
                 WHERE grid_level_id = ?1 AND side = ?3 AND status = 'ERROR' \
                   AND target_price = ?4 AND error_msg = ?6 \
                   AND created_at > datetime('now', '-1 hour'))",
            params![
                grid_level_id,
                symbol,
                side.as_str(),
                dec_text(target_price),
                error_code,
                error_msg
            ],
        )?;

        if affected > 0 {
            warn!(
                "Recorded {} ERROR - level {}, target {}, code {}: {}",
                side.as_str(),
                grid_level_id,
                target_price,
                error_code,
                error_msg
            );
        } else {
            debug!(
                "Duplicate {} ERROR for level {} within 1 hour, skipped",
                side.as_str(),
                grid_level_id
            );
        }
        Ok(affected > 0)
    }

    /// The BUY/FILLED row that opened the level's current cycle.
    pub fn get_last_buy_for_level(&self, grid_level_id: i64) -> TradingResult<Option<Transaction>> {
        self.get_last("grid_level_id = ?1 AND side = 'BUY' AND status = 'FILLED'", params![grid_level_id])
    }

    pub fn get_last_buy(&self) -> TradingResult<Option<Transaction>> {
        self.get_last("side = 'BUY' AND status = 'FILLED'", params![])
    }

    pub fn get_last_sell(&self) -> TradingResult<Option<Transaction>> {
        self.get_last("side = 'SELL' AND status = 'FILLED'", params![])
    }

    pub fn get_last_error(&self) -> TradingResult<Option<Transaction>> {
        self.get_last("status = 'ERROR'", params![])
    }

    fn get_last(
        &self,
        predicate: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> TradingResult<Option<Transaction>> {
        let conn = self.conn.lock().unwrap();
        // id DESC breaks ties: created_at is not monotonic below one second.
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE {} ORDER BY created_at DESC, id DESC LIMIT 1",
            TX_COLUMNS, predicate
        ))?;
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::tx_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Counts of today's filled buys, filled sells and errors.
    pub fn get_daily_counts(&self) -> TradingResult<DailyCounts> {
        let conn = self.conn.lock().unwrap();
        let counts = conn.query_row(
            "SELECT \
                COUNT(CASE WHEN side = 'BUY' AND status = 'FILLED' THEN 1 END), \
                COUNT(CASE WHEN side = 'SELL' AND status = 'FILLED' THEN 1 END), \
                COUNT(CASE WHEN status = 'ERROR' THEN 1 END) \
             FROM transactions WHERE date(created_at) = date('now')",
            [],
            |row| {
                Ok(DailyCounts {
                    buys: row.get(0)?,
                    sells: row.get(1)?,
                    errors: row.get(2)?,
                })
            },
        )?;
        Ok(counts)
    }

    /// Profit sums over SELL/FILLED rows, bucketed by created_at. Summed in
    /// decimal arithmetic rather than SQL so no precision is lost.
    pub fn get_profit_stats(&self) -> TradingResult<ProfitStats> {
        let rows: Vec<(Decimal, chrono::DateTime<Utc>)> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT profit_usdt, created_at FROM transactions \
                 WHERE side = 'SELL' AND status = 'FILLED' AND profit_usdt IS NOT NULL",
            )?;
            let mapped = stmt.query_map([], |row| {
                Ok((get_decimal(row, 0)?, get_timestamp(row, 1)?))
            })?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let now = Utc::now();
        let today = now.date_naive();
        let week_start = today - Duration::days(now.weekday().num_days_from_monday() as i64);

        let mut stats = ProfitStats::default();
        for (profit, created_at) in rows {
            let date = created_at.date_naive();
            stats.all_time += profit;
            if date == today {
                stats.today += profit;
            }
            if date >= week_start {
                stats.week += profit;
            }
            if date.year() == today.year() && date.month() == today.month() {
                stats.month += profit;
            }
        }
        Ok(stats)
    }
}
