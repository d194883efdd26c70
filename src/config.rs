//! Environment-backed configuration for the three services.
//!
//! Each service loads only its own section; values are validated once at
//! startup so a bad deployment fails fast instead of mid-trade.

use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::assurance::exchange::BINANCE_API_URL;
use crate::monitor::ticker::BINANCE_REST_URL;
use crate::monitor::ws::BINANCE_WS_URL;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("configuration validation error: {0}")]
    Validation(String),
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.is_empty() => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        _ => Ok(default),
    }
}

fn env_bool(key: &str) -> bool {
    matches!(
        env::var(key).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Trading engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub server_port: u16,
    pub db_path: String,
    pub order_assurance_url: String,
    pub sync_job_enabled: bool,
    /// Six-field cron expression (seconds first); default is hourly.
    pub sync_job_cron: String,
    /// Per-side trading fee in percent.
    pub trading_fee_pct: Decimal,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            server_port: env_parse("SERVER_PORT", 8080)?,
            db_path: env_or("DB_PATH", "data/grid_bot.db"),
            order_assurance_url: env_or("ORDER_ASSURANCE_URL", "http://localhost:9090"),
            sync_job_enabled: env_bool("SYNC_JOB_ENABLED"),
            sync_job_cron: env_or("SYNC_JOB_CRON", "0 0 * * * *"),
            trading_fee_pct: env_parse("TRADING_FEE", Decimal::new(1, 1))?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.is_empty() {
            return Err(ConfigError::Validation("DB_PATH must not be empty".to_string()));
        }
        if self.trading_fee_pct < Decimal::ZERO {
            return Err(ConfigError::Validation("TRADING_FEE must be non-negative".to_string()));
        }
        if self.sync_job_enabled && self.sync_job_cron.split_whitespace().count() < 6 {
            return Err(ConfigError::Validation(
                "SYNC_JOB_CRON must be a six-field cron expression".to_string(),
            ));
        }
        Ok(())
    }
}

/// Order-assurance gateway configuration.
#[derive(Debug, Clone)]
pub struct AssuranceConfig {
    pub server_port: u16,
    pub grid_trading_url: String,
    pub binance_api_key: String,
    pub binance_api_secret: String,
    pub binance_api_url: String,
}

impl AssuranceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server_port: env_parse("SERVER_PORT", 9090)?,
            grid_trading_url: env_or("GRID_TRADING_URL", "http://localhost:8080"),
            binance_api_key: env::var("BINANCE_API_KEY").unwrap_or_default(),
            binance_api_secret: env::var("BINANCE_API_SECRET").unwrap_or_default(),
            binance_api_url: env_or("BINANCE_API_URL", BINANCE_API_URL),
        })
    }

    pub fn has_credentials(&self) -> bool {
        !self.binance_api_key.is_empty() && !self.binance_api_secret.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Ws,
    Rest,
}

impl FromStr for PriceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ws" | "websocket" => Ok(PriceSource::Ws),
            "rest" | "poll" => Ok(PriceSource::Rest),
            other => Err(format!("unknown price source: {}", other)),
        }
    }
}

/// Price monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub server_port: u16,
    pub grid_trading_url: String,
    /// Static symbol list; empty means "follow the engine's grids".
    pub monitored_symbols: Vec<String>,
    pub price_source: PriceSource,
    pub ws_url: String,
    pub rest_url: String,
    pub price_check_interval_ms: u64,
    pub trigger_interval_ms: i64,
    /// Minimum relative change between forwarded ticks, in percent.
    pub min_price_change_pct: Decimal,
    pub symbol_refresh_interval_ms: u64,
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let monitored_symbols: Vec<String> = env::var("MONITORED_SYMBOLS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Self {
            server_port: env_parse("SERVER_PORT", 8081)?,
            grid_trading_url: env_or("GRID_TRADING_URL", "http://localhost:8080"),
            monitored_symbols,
            price_source: env_parse("PRICE_SOURCE", PriceSource::Ws)?,
            ws_url: env_or("BINANCE_WS_URL", BINANCE_WS_URL),
            rest_url: env_or("BINANCE_API_URL", BINANCE_REST_URL),
            price_check_interval_ms: env_parse("PRICE_CHECK_INTERVAL_MS", 5000)?,
            trigger_interval_ms: env_parse("TRIGGER_INTERVAL_MS", 1000)?,
            min_price_change_pct: env_parse("MIN_PRICE_CHANGE_PCT", Decimal::new(1, 2))?,
            symbol_refresh_interval_ms: env_parse("SYMBOL_REFRESH_INTERVAL_MS", 60000)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.trigger_interval_ms <= 0 {
            return Err(ConfigError::Validation(
                "TRIGGER_INTERVAL_MS must be positive".to_string(),
            ));
        }
        if self.price_check_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "PRICE_CHECK_INTERVAL_MS must be positive".to_string(),
            ));
        }
        if self.min_price_change_pct < Decimal::ZERO {
            return Err(ConfigError::Validation(
                "MIN_PRICE_CHANGE_PCT must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_engine_validation() {
        let mut config = EngineConfig {
            server_port: 8080,
            db_path: "data/test.db".to_string(),
            order_assurance_url: "http://localhost:9090".to_string(),
            sync_job_enabled: true,
            sync_job_cron: "0 0 * * * *".to_string(),
            trading_fee_pct: dec!(0.1),
        };
        assert!(config.validate().is_ok());

        config.trading_fee_pct = dec!(-0.1);
        assert!(config.validate().is_err());

        config.trading_fee_pct = dec!(0.1);
        config.sync_job_cron = "0 * * * *".to_string();
        assert!(config.validate().is_err(), "five-field cron must be rejected");

        config.sync_job_enabled = false;
        assert!(config.validate().is_ok(), "cron is not validated when the job is disabled");
    }

    #[test]
    fn test_monitor_validation() {
        let mut config = MonitorConfig {
            server_port: 8081,
            grid_trading_url: "http://localhost:8080".to_string(),
            monitored_symbols: vec!["ETHUSDT".to_string()],
            price_source: PriceSource::Ws,
            ws_url: BINANCE_WS_URL.to_string(),
            rest_url: BINANCE_REST_URL.to_string(),
            price_check_interval_ms: 5000,
            trigger_interval_ms: 1000,
            min_price_change_pct: dec!(0.01),
            symbol_refresh_interval_ms: 60000,
        };
        assert!(config.validate().is_ok());

        config.trigger_interval_ms = 0;
        assert!(config.validate().is_err());

        config.trigger_interval_ms = 1000;
        config.min_price_change_pct = dec!(-1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_price_source_parsing() {
        assert_eq!("ws".parse::<PriceSource>().unwrap(), PriceSource::Ws);
        assert_eq!("REST".parse::<PriceSource>().unwrap(), PriceSource::Rest);
        assert!("carrier-pigeon".parse::<PriceSource>().is_err());
    }
}
