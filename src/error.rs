//! Unified error type for all three services.
//!
//! Gateway errors that the engine must react to (rate limits, insufficient
//! funds, orders below the venue minimum) get their own variants so callers
//! can match on them instead of parsing message strings.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TradingError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("database constraint violation: {0}")]
    DatabaseConstraint(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("API connection error: {0}")]
    ApiConnection(String),

    #[error("API authentication failed: {0}")]
    ApiAuthentication(String),

    #[error("API timeout: {0}")]
    ApiTimeout(String),

    #[error("API response error: {0}")]
    ApiResponse(String),

    #[error("venue rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("order value below venue minimum: {0}")]
    OrderTooSmall(String),

    #[error("unknown symbol: {0}")]
    InvalidSymbol(String),

    #[error("order failed: {0}")]
    OrderFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TradingError {
    /// Error category for logging and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            TradingError::Config(_) => "config",
            TradingError::Database(_) | TradingError::DatabaseConstraint(_) => "database",
            TradingError::Validation(_) => "validation",
            TradingError::ApiConnection(_)
            | TradingError::ApiAuthentication(_)
            | TradingError::ApiTimeout(_)
            | TradingError::ApiResponse(_)
            | TradingError::RateLimited(_) => "api",
            TradingError::InsufficientFunds(_)
            | TradingError::OrderTooSmall(_)
            | TradingError::InvalidSymbol(_)
            | TradingError::OrderFailed(_) => "trading",
            TradingError::Internal(_) => "internal",
        }
    }

    /// Whether a caller may reasonably retry on the next cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TradingError::ApiConnection(_)
                | TradingError::ApiTimeout(_)
                | TradingError::ApiResponse(_)
                | TradingError::RateLimited(_)
        )
    }

    /// Machine-readable code used in gateway responses and audit rows.
    pub fn error_code(&self) -> &'static str {
        match self {
            TradingError::RateLimited(_) => "rate_limited",
            TradingError::InsufficientFunds(_) => "insufficient_funds",
            TradingError::OrderTooSmall(_) => "order_too_small",
            TradingError::InvalidSymbol(_) => "invalid_symbol",
            TradingError::Validation(_) => "invalid_request",
            _ => "order_placement_failed",
        }
    }
}

impl From<rusqlite::Error> for TradingError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(_, Some(msg))
                if msg.contains("UNIQUE constraint")
                    || msg.contains("FOREIGN KEY constraint")
                    || msg.contains("CHECK constraint") =>
            {
                TradingError::DatabaseConstraint(msg.clone())
            }
            _ => TradingError::Database(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for TradingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TradingError::ApiTimeout(err.to_string())
        } else if err.is_connect() {
            TradingError::ApiConnection(err.to_string())
        } else {
            TradingError::ApiResponse(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(err: serde_json::Error) -> Self {
        TradingError::ApiResponse(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for TradingError {
    fn from(err: std::io::Error) -> Self {
        TradingError::Internal(format!("IO error: {}", err))
    }
}

impl From<rust_decimal::Error> for TradingError {
    fn from(err: rust_decimal::Error) -> Self {
        TradingError::Validation(format!("invalid decimal: {}", err))
    }
}

/// Result type alias used throughout the crate.
pub type TradingResult<T> = Result<T, TradingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        assert_eq!(TradingError::Config("x".into()).category(), "config");
        assert_eq!(TradingError::Database("x".into()).category(), "database");
        assert_eq!(TradingError::RateLimited("x".into()).category(), "api");
        assert_eq!(TradingError::OrderTooSmall("x".into()).category(), "trading");
    }

    #[test]
    fn test_retryable() {
        assert!(TradingError::ApiTimeout("t".into()).is_retryable());
        assert!(TradingError::RateLimited("t".into()).is_retryable());
        assert!(!TradingError::InsufficientFunds("t".into()).is_retryable());
        assert!(!TradingError::Config("t".into()).is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(TradingError::InsufficientFunds("x".into()).error_code(), "insufficient_funds");
        assert_eq!(TradingError::OrderTooSmall("x".into()).error_code(), "order_too_small");
        assert_eq!(TradingError::ApiTimeout("x".into()).error_code(), "order_placement_failed");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TradingError = io_err.into();
        assert!(matches!(err, TradingError::Internal(_)));
    }
}
