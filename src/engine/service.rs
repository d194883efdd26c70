//! The level state machine.
//!
//! No in-process locks guard the levels: the only concurrency primitive is
//! the guarded conditional update in the repository. Two concurrent
//! attempts at the same transition both read the same pre-state, exactly
//! one update affects a row, and the loser simply drops its trigger. This
//! survives process restarts and multiple engine instances.
//!
//! Every placement follows the same three-step shape: short transition into
//! `PLACING_*`, the gateway call with no transaction held, then a short
//! transition recording the outcome (or a revert plus an ERROR audit row).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};

use crate::db::{GridLevelRepository, TransactionRepository};
use crate::error::TradingResult;
use crate::models::{
    GridLevel, GridState, OrderRequest, OrderResponse, OrderSide, OrderState, OrderStatusInfo,
    Transaction,
};

/// How long a level may sit in `PLACING_*` before the sweeper treats it as
/// stuck and re-drives the placement.
pub const PLACING_STUCK_TIMEOUT_MINUTES: i64 = 5;

/// The gateway seam. The HTTP client implements this in production; tests
/// substitute a mock. Both paths get the gateway's assurance contract: a
/// `place_order` either returns an existing open order matching the
/// parameters or causes exactly one new order on the venue.
#[async_trait]
pub trait OrderAssurance: Send + Sync {
    async fn place_order(&self, req: &OrderRequest) -> TradingResult<OrderResponse>;

    /// `Ok(None)` means the venue does not know the order.
    async fn order_status(&self, symbol: &str, order_id: &str)
        -> TradingResult<Option<OrderStatusInfo>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceTick {
    pub price: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GridInitSummary {
    pub created: usize,
    pub skipped: usize,
}

pub struct GridService {
    repo: GridLevelRepository,
    tx_repo: TransactionRepository,
    assurance: Arc<dyn OrderAssurance>,
    trading_fee_pct: Decimal,
    last_prices: RwLock<HashMap<String, PriceTick>>,
}

impl GridService {
    pub fn new(
        repo: GridLevelRepository,
        tx_repo: TransactionRepository,
        assurance: Arc<dyn OrderAssurance>,
        trading_fee_pct: Decimal,
    ) -> Self {
        Self {
            repo,
            tx_repo,
            assurance,
            trading_fee_pct,
            last_prices: RwLock::new(HashMap::new()),
        }
    }

    pub fn check_health(&self) -> TradingResult<()> {
        self.repo.get_level_counts()?;
        Ok(())
    }

    /// React to a price tick: reconcile outstanding orders for this symbol,
    /// then attempt a placement for every level the price qualifies.
    pub async fn process_price_trigger(&self, symbol: &str, price: Decimal) -> TradingResult<()> {
        {
            let mut prices = self.last_prices.write().unwrap();
            prices.insert(
                symbol.to_string(),
                PriceTick {
                    price,
                    updated_at: Utc::now(),
                },
            );
        }

        let levels = self.repo.get_by_symbol(symbol)?;

        // Best-effort on-tick reconciliation of outstanding orders; the
        // sweeper covers anything missed here.
        for level in &levels {
            match level.state {
                GridState::BuyActive => {
                    if let Some(order_id) = level.buy_order_id.clone() {
                        self.reconcile_order(level, &order_id, OrderSide::Buy).await;
                    }
                }
                GridState::SellActive => {
                    if let Some(order_id) = level.sell_order_id.clone() {
                        self.reconcile_order(level, &order_id, OrderSide::Sell).await;
                    }
                }
                _ => {}
            }
        }

        // Levels are independent: one failed placement must not stop the
        // others, but the failure still propagates so the caller retries on
        // its next cycle.
        let mut activated = 0;
        let mut failure = None;
        for level in &levels {
            if level.can_place_buy(price) {
                info!(
                    "Price {} triggered BUY level {} (target {})",
                    price, level.id, level.buy_price
                );
                match self.try_place_buy_order(level).await {
                    Ok(true) => activated += 1,
                    Ok(false) => {}
                    Err(e) => {
                        error!("Failed to place buy order for level {}: {}", level.id, e);
                        failure = Some(e);
                    }
                }
            } else if level.can_place_sell(price) {
                info!(
                    "Price {} triggered SELL level {} (target {})",
                    price, level.id, level.sell_price
                );
                match self.try_place_sell_order(level).await {
                    Ok(true) => activated += 1,
                    Ok(false) => {}
                    Err(e) => {
                        error!("Failed to place sell order for level {}: {}", level.id, e);
                        failure = Some(e);
                    }
                }
            }
        }

        if activated > 0 {
            info!("Activated {} orders for {}", activated, symbol);
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Attempt READY -> PLACING_BUY -> BUY_ACTIVE. Returns whether an order
    /// was placed; a lost guard is a benign `false`.
    async fn try_place_buy_order(&self, level: &GridLevel) -> TradingResult<bool> {
        if !self.repo.try_start_buy_order(level.id)? {
            return Ok(false);
        }

        let req = OrderRequest {
            symbol: level.symbol.clone(),
            price: level.buy_price,
            side: OrderSide::Buy,
            amount: level.buy_amount,
        };

        info!(
            "Placing buy order for level {} - {} @ {} for {} USDT",
            level.id, req.symbol, req.price, req.amount
        );

        match self.assurance.place_order(&req).await {
            Ok(resp) => {
                if self.repo.update_buy_order_placed(level.id, &resp.order_id)? {
                    if let Err(e) = self.tx_repo.record_buy_placed(
                        level.id,
                        &level.symbol,
                        &resp.order_id,
                        level.buy_price,
                        level.buy_amount,
                    ) {
                        warn!("Failed to record buy placed transaction: {}", e);
                    }
                    Ok(true)
                } else {
                    // The level left PLACING_BUY under us; abandon without
                    // an audit row. The sweeper will reconcile the order.
                    Ok(false)
                }
            }
            Err(e) => {
                error!("Buy order placement failed for level {}: {}", level.id, e);
                self.repo.update_state(level.id, GridState::Ready)?;
                if let Err(audit_err) = self.tx_repo.record_buy_error(
                    level.id,
                    &level.symbol,
                    level.buy_price,
                    "order_placement_failed",
                    &e.to_string(),
                ) {
                    warn!("Failed to record buy error transaction: {}", audit_err);
                }
                Err(e)
            }
        }
    }

    /// Attempt HOLDING -> PLACING_SELL -> SELL_ACTIVE with the exact held
    /// amount.
    async fn try_place_sell_order(&self, level: &GridLevel) -> TradingResult<bool> {
        if !self.repo.try_start_sell_order(level.id)? {
            return Ok(false);
        }

        let filled_amount = match level.filled_amount {
            Some(amount) if amount > Decimal::ZERO => amount,
            _ => {
                // Unreachable through the guard, which requires a filled
                // amount; tolerate a stale in-memory copy.
                warn!("Level {} has no filled amount, reverting to HOLDING", level.id);
                self.repo.update_state(level.id, GridState::Holding)?;
                return Ok(false);
            }
        };

        let req = OrderRequest {
            symbol: level.symbol.clone(),
            price: level.sell_price,
            side: OrderSide::Sell,
            amount: filled_amount,
        };

        info!(
            "Placing sell order for level {} - {} @ {} for {} coins",
            level.id, req.symbol, req.price, req.amount
        );

        match self.assurance.place_order(&req).await {
            Ok(resp) => {
                if self.repo.update_sell_order_placed(level.id, &resp.order_id)? {
                    if let Err(e) = self.tx_repo.record_sell_placed(
                        level.id,
                        &level.symbol,
                        &resp.order_id,
                        level.sell_price,
                        filled_amount,
                    ) {
                        warn!("Failed to record sell placed transaction: {}", e);
                    }
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Err(e) => {
                error!("Sell order placement failed for level {}: {}", level.id, e);
                self.repo.update_state(level.id, GridState::Holding)?;
                if let Err(audit_err) = self.tx_repo.record_sell_error(
                    level.id,
                    &level.symbol,
                    level.sell_price,
                    "order_placement_failed",
                    &e.to_string(),
                ) {
                    warn!("Failed to record sell error transaction: {}", audit_err);
                }
                Err(e)
            }
        }
    }

    /// Process a confirmed buy fill, from the webhook or the sweeper. The
    /// state guard makes duplicate and concurrent deliveries no-ops.
    pub async fn process_buy_fill(
        &self,
        order_id: &str,
        filled_amount: Decimal,
        fill_price: Decimal,
    ) -> TradingResult<()> {
        let level = match self.repo.get_by_buy_order_id(order_id)? {
            Some(level) => level,
            None => {
                info!("No level found for buy order {}, ignoring fill", order_id);
                return Ok(());
            }
        };

        if level.state != GridState::BuyActive {
            info!(
                "Level {} not in BUY_ACTIVE (current {}), skipping buy fill",
                level.id, level.state
            );
            return Ok(());
        }

        if !self.repo.process_buy_fill(level.id, filled_amount)? {
            return Ok(());
        }

        let amount_usdt = filled_amount * fill_price;
        if let Err(e) = self.tx_repo.record_buy_filled(
            level.id,
            &level.symbol,
            order_id,
            level.buy_price,
            fill_price,
            filled_amount,
            amount_usdt,
        ) {
            error!("Failed to record buy fill transaction for level {}: {}", level.id, e);
        }

        info!("Processed buy fill for level {}, filled amount {}", level.id, filled_amount);

        // Eagerly place the sell now that the level holds a position. On
        // failure the level reverts to HOLDING and the next qualifying
        // trigger retries.
        match self.repo.get_by_id(level.id)? {
            Some(updated) if updated.state == GridState::Holding => {
                if let Err(e) = self.try_place_sell_order(&updated).await {
                    error!("Failed to place sell order for level {}: {}", level.id, e);
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Process a confirmed sell fill: close the cycle and write the
    /// SELL/FILLED audit row with profit against the opening buy.
    pub async fn process_sell_fill(
        &self,
        order_id: &str,
        filled_amount: Decimal,
        fill_price: Decimal,
    ) -> TradingResult<()> {
        let level = match self.repo.get_by_sell_order_id(order_id)? {
            Some(level) => level,
            None => {
                info!("No level found for sell order {}, ignoring fill", order_id);
                return Ok(());
            }
        };

        if level.state != GridState::SellActive {
            info!(
                "Level {} not in SELL_ACTIVE (current {}), skipping sell fill",
                level.id, level.state
            );
            return Ok(());
        }

        let buy_tx = match self.tx_repo.get_last_buy_for_level(level.id) {
            Ok(tx) => tx,
            Err(e) => {
                error!("Failed to load last buy transaction for level {}: {}", level.id, e);
                None
            }
        };
        if buy_tx.is_none() {
            warn!("No buy transaction found for level {}, profit unavailable", level.id);
        }

        if !self.repo.process_sell_fill(level.id)? {
            return Ok(());
        }

        let sell_usdt = filled_amount * fill_price;
        let (related_buy_id, profit_usdt, profit_pct) = match &buy_tx {
            Some(tx) => match tx.amount_usdt {
                Some(buy_usdt) if buy_usdt > Decimal::ZERO => {
                    let (profit, pct) = compute_profit(buy_usdt, sell_usdt, self.trading_fee_pct);
                    info!(
                        "Cycle complete for level {}: profit {} USDT ({}%)",
                        level.id, profit, pct
                    );
                    (Some(tx.id), Some(profit), Some(pct))
                }
                _ => (None, None, None),
            },
            None => (None, None, None),
        };

        if let Err(e) = self.tx_repo.record_sell_filled(
            level.id,
            &level.symbol,
            order_id,
            level.sell_price,
            fill_price,
            filled_amount,
            sell_usdt,
            related_buy_id,
            profit_usdt,
            profit_pct,
        ) {
            error!("Failed to record sell fill transaction for level {}: {}", level.id, e);
        }

        Ok(())
    }

    /// An explicit order lifecycle error moves the level to the terminal
    /// ERROR state; only operator intervention resets it.
    pub async fn process_error_notification(
        &self,
        order_id: &str,
        side: OrderSide,
        error_msg: &str,
    ) -> TradingResult<()> {
        let level = match side {
            OrderSide::Buy => self.repo.get_by_buy_order_id(order_id)?,
            OrderSide::Sell => self.repo.get_by_sell_order_id(order_id)?,
        };

        let level = match level {
            Some(level) => level,
            None => {
                info!("No level found for {} order {}, ignoring error", side, order_id);
                return Ok(());
            }
        };

        self.repo.update_state(level.id, GridState::Error)?;

        let result = match side {
            OrderSide::Buy => self.tx_repo.record_buy_error(
                level.id,
                &level.symbol,
                level.buy_price,
                "order_error",
                error_msg,
            ),
            OrderSide::Sell => self.tx_repo.record_sell_error(
                level.id,
                &level.symbol,
                level.sell_price,
                "order_error",
                error_msg,
            ),
        };
        if let Err(e) = result {
            warn!("Failed to record error transaction for level {}: {}", level.id, e);
        }

        warn!("Level {} set to ERROR: {}", level.id, error_msg);
        Ok(())
    }

    /// Reconcile one level's outstanding order against the gateway. Fills
    /// funnel into the same processing as the webhook path; a cancelled or
    /// unknown order releases the level back to its resting state.
    async fn reconcile_order(&self, level: &GridLevel, order_id: &str, side: OrderSide) {
        let status = match self.assurance.order_status(&level.symbol, order_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to get status for order {}: {}", order_id, e);
                return;
            }
        };

        let status = match status {
            Some(status) => status,
            None => {
                info!("Order {} not found on venue, releasing level {}", order_id, level.id);
                let released = match side {
                    OrderSide::Buy => self.repo.release_buy_order(level.id),
                    OrderSide::Sell => self.repo.release_sell_order(level.id),
                };
                if let Err(e) = released {
                    error!("Failed to release level {}: {}", level.id, e);
                }
                return;
            }
        };

        match status.status {
            OrderState::Open => {}
            OrderState::Filled => {
                let (filled_amount, fill_price) = match (status.filled_amount, status.fill_price) {
                    (Some(amount), Some(price)) => (amount, price),
                    _ => {
                        warn!("Order {} reported filled without fill details", order_id);
                        return;
                    }
                };
                let result = match side {
                    OrderSide::Buy => self.process_buy_fill(order_id, filled_amount, fill_price).await,
                    OrderSide::Sell => {
                        self.process_sell_fill(order_id, filled_amount, fill_price).await
                    }
                };
                if let Err(e) = result {
                    error!("Failed to process fill for order {}: {}", order_id, e);
                }
            }
            OrderState::Cancelled => {
                info!("Order {} cancelled on venue, releasing level {}", order_id, level.id);
                let released = match side {
                    OrderSide::Buy => self.repo.release_buy_order(level.id),
                    OrderSide::Sell => self.repo.release_sell_order(level.id),
                };
                if let Err(e) = released {
                    error!("Failed to release level {}: {}", level.id, e);
                }
            }
            OrderState::Unknown => {
                warn!("Order {} has unrecognized status, leaving level {} untouched", order_id, level.id);
            }
        }
    }

    /// The recovery sweep: re-drive stuck `PLACING_*` levels and sanity-check
    /// every outstanding active order against the venue.
    pub async fn sync_orders(&self) -> TradingResult<()> {
        let stuck = self
            .repo
            .get_stuck_in_placing(Duration::minutes(PLACING_STUCK_TIMEOUT_MINUTES))?;

        for level in stuck {
            info!("Recovering stuck level {} in state {}", level.id, level.state);
            match level.state {
                GridState::PlacingBuy => {
                    if let Some(order_id) = level.buy_order_id.clone() {
                        self.reconcile_order(&level, &order_id, OrderSide::Buy).await;
                    } else {
                        self.recover_buy_placement(&level).await;
                    }
                }
                GridState::PlacingSell => {
                    if let Some(order_id) = level.sell_order_id.clone() {
                        self.reconcile_order(&level, &order_id, OrderSide::Sell).await;
                    } else if level.filled_amount.is_some() {
                        self.recover_sell_placement(&level).await;
                    } else {
                        warn!("Level {} stuck in PLACING_SELL without a position", level.id);
                        self.repo.update_state(level.id, GridState::Holding)?;
                    }
                }
                _ => {}
            }
        }

        for level in self.repo.get_all_active()? {
            match level.state {
                GridState::BuyActive => {
                    if let Some(order_id) = level.buy_order_id.clone() {
                        self.reconcile_order(&level, &order_id, OrderSide::Buy).await;
                    }
                }
                GridState::SellActive => {
                    if let Some(order_id) = level.sell_order_id.clone() {
                        self.reconcile_order(&level, &order_id, OrderSide::Sell).await;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Re-invoke placement for a level stuck in PLACING_BUY with no order
    /// id. The gateway's idempotency makes the retry safe: it either
    /// returns the already-placed order or places exactly one new one.
    async fn recover_buy_placement(&self, level: &GridLevel) {
        let req = OrderRequest {
            symbol: level.symbol.clone(),
            price: level.buy_price,
            side: OrderSide::Buy,
            amount: level.buy_amount,
        };
        match self.assurance.place_order(&req).await {
            Ok(resp) => {
                match self.repo.update_buy_order_placed(level.id, &resp.order_id) {
                    Ok(true) => info!("Recovered buy order {} for level {}", resp.order_id, level.id),
                    Ok(false) => {}
                    Err(e) => error!("Failed to record recovered buy order: {}", e),
                }
            }
            Err(e) => {
                warn!("Failed to recover buy order for level {}: {}", level.id, e);
                if let Err(db_err) = self.repo.update_state(level.id, GridState::Ready) {
                    error!("Failed to revert level {}: {}", level.id, db_err);
                }
                if let Err(audit_err) = self.tx_repo.record_buy_error(
                    level.id,
                    &level.symbol,
                    level.buy_price,
                    "order_placement_failed",
                    &e.to_string(),
                ) {
                    warn!("Failed to record recovery error: {}", audit_err);
                }
            }
        }
    }

    async fn recover_sell_placement(&self, level: &GridLevel) {
        let amount = match level.filled_amount {
            Some(amount) => amount,
            None => return,
        };
        let req = OrderRequest {
            symbol: level.symbol.clone(),
            price: level.sell_price,
            side: OrderSide::Sell,
            amount,
        };
        match self.assurance.place_order(&req).await {
            Ok(resp) => {
                match self.repo.update_sell_order_placed(level.id, &resp.order_id) {
                    Ok(true) => info!("Recovered sell order {} for level {}", resp.order_id, level.id),
                    Ok(false) => {}
                    Err(e) => error!("Failed to record recovered sell order: {}", e),
                }
            }
            Err(e) => {
                warn!("Failed to recover sell order for level {}: {}", level.id, e);
                if let Err(db_err) = self.repo.update_state(level.id, GridState::Holding) {
                    error!("Failed to revert level {}: {}", level.id, db_err);
                }
                if let Err(audit_err) = self.tx_repo.record_sell_error(
                    level.id,
                    &level.symbol,
                    level.sell_price,
                    "order_placement_failed",
                    &e.to_string(),
                ) {
                    warn!("Failed to record recovery error: {}", audit_err);
                }
            }
        }
    }

    /// Create the missing levels for a price range. Buys sit at
    /// `min + k * step`, each paired with a sell one step above, while the
    /// sell stays within `max`. Existing triples are skipped.
    pub async fn create_grid(
        &self,
        symbol: &str,
        min_price: Decimal,
        max_price: Decimal,
        grid_step: Decimal,
        buy_amount: Decimal,
    ) -> TradingResult<GridInitSummary> {
        if grid_step <= Decimal::ZERO {
            return Err(crate::error::TradingError::Validation(
                "grid step must be positive".to_string(),
            ));
        }
        if min_price >= max_price {
            return Err(crate::error::TradingError::Validation(
                "min price must be less than max price".to_string(),
            ));
        }

        let mut summary = GridInitSummary::default();
        let mut k: i64 = 0;
        loop {
            let buy_price = min_price + grid_step * Decimal::from(k);
            let sell_price = buy_price + grid_step;
            if sell_price > max_price {
                break;
            }

            match self.repo.create(symbol, buy_price, sell_price, buy_amount) {
                Ok(Some(_)) => summary.created += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    warn!(
                        "Failed to create level at buy={} sell={}: {}",
                        buy_price, sell_price, e
                    );
                }
            }
            k += 1;
        }

        info!(
            "Grid creation for {}: created {} new levels, skipped {} existing",
            symbol, summary.created, summary.skipped
        );
        Ok(summary)
    }

    pub fn get_grid_levels(&self, symbol: &str) -> TradingResult<Vec<GridLevel>> {
        self.repo.get_by_symbol(symbol)
    }

    pub fn get_all_grid_levels(&self) -> TradingResult<Vec<GridLevel>> {
        self.repo.get_all()
    }

    pub fn get_grid_symbols(&self) -> TradingResult<Vec<String>> {
        self.repo.get_distinct_symbols()
    }

    pub fn get_status(&self) -> TradingResult<StatusResponse> {
        let counts = self.tx_repo.get_daily_counts()?;
        let profit = self.tx_repo.get_profit_stats()?;
        let last_buy = self.tx_repo.get_last_buy()?;
        let last_sell = self.tx_repo.get_last_sell()?;
        let last_error = self.tx_repo.get_last_error()?;
        let (holding, ready) = self.repo.get_level_counts()?;

        let last_prices = self.last_prices.read().unwrap().clone();

        Ok(StatusResponse {
            date: Utc::now().format("%Y-%m-%d").to_string(),
            buys_today: counts.buys,
            sells_today: counts.sells,
            errors_today: counts.errors,
            profit_today: profit.today,
            profit_this_week: profit.week,
            profit_this_month: profit.month,
            profit_all_time: profit.all_time,
            last_buy: last_buy.as_ref().map(TransactionInfo::from_tx),
            last_sell: last_sell.as_ref().map(TransactionInfo::from_tx),
            last_error: last_error.as_ref().map(ErrorInfo::from_tx),
            last_prices,
            levels_holding: holding,
            levels_ready: ready,
        })
    }
}

/// Net profit of one cycle after fees on both sides.
/// `fee_pct` is the per-side fee in percent (0.1 means 0.1%).
pub fn compute_profit(buy_usdt: Decimal, sell_usdt: Decimal, fee_pct: Decimal) -> (Decimal, Decimal) {
    let fee_rate = fee_pct / dec!(100);
    let total_fees = (buy_usdt + sell_usdt) * fee_rate;
    let profit = sell_usdt - buy_usdt - total_fees;
    let pct = profit / buy_usdt * dec!(100);
    (profit, pct)
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub date: String,
    pub buys_today: i64,
    pub sells_today: i64,
    pub errors_today: i64,
    pub profit_today: Decimal,
    pub profit_this_week: Decimal,
    pub profit_this_month: Decimal,
    pub profit_all_time: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_buy: Option<TransactionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sell: Option<TransactionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorInfo>,
    pub last_prices: HashMap<String, PriceTick>,
    pub levels_holding: i64,
    pub levels_ready: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionInfo {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_usdt: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_pct: Option<Decimal>,
}

impl TransactionInfo {
    fn from_tx(tx: &Transaction) -> Self {
        Self {
            symbol: tx.symbol.clone(),
            price: tx.executed_price,
            amount: tx.amount_coin,
            time: tx.created_at.to_rfc3339(),
            profit_usdt: tx.profit_usdt,
            profit_pct: tx.profit_pct,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    pub time: String,
}

impl ErrorInfo {
    fn from_tx(tx: &Transaction) -> Self {
        Self {
            symbol: tx.symbol.clone(),
            error_code: tx.error_code.clone(),
            error_msg: tx.error_msg.clone(),
            time: tx.created_at.to_rfc3339(),
        }
    }
}
