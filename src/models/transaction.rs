//! Append-only audit rows. A transaction is never updated or deleted;
//! FILLED rows carry the executed price and ERROR rows carry an error code.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxSide {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl TxSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxSide::Buy => "BUY",
            TxSide::Sell => "SELL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(TxSide::Buy),
            "SELL" => Some(TxSide::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    #[serde(rename = "PLACED")]
    Placed,
    #[serde(rename = "FILLED")]
    Filled,
    #[serde(rename = "ERROR")]
    Error,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Placed => "PLACED",
            TxStatus::Filled => "FILLED",
            TxStatus::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PLACED" => Some(TxStatus::Placed),
            "FILLED" => Some(TxStatus::Filled),
            "ERROR" => Some(TxStatus::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub grid_level_id: i64,
    pub symbol: String,
    pub side: TxSide,
    pub status: TxStatus,
    pub order_id: Option<String>,
    pub target_price: Decimal,
    pub executed_price: Option<Decimal>,
    pub amount_coin: Option<Decimal>,
    pub amount_usdt: Option<Decimal>,
    pub related_buy_id: Option<i64>,
    pub profit_usdt: Option<Decimal>,
    pub profit_pct: Option<Decimal>,
    pub error_code: Option<String>,
    pub error_msg: Option<String>,
    pub created_at: DateTime<Utc>,
}
