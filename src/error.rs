//! Error types for the trading engine

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the trading engine
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Execution gateway errors
    #[error("Quote failed: {0}")]
    Quote(String),

    #[error("Transaction build failed: {0}")]
    TransactionBuild(String),

    #[error("Transaction send failed: {0}")]
    TransactionSend(String),

    #[error("Transaction not confirmed: {0}")]
    TransactionUnconfirmed(String),

    #[error("Price impact too high: {impact_pct:.2}% > {max_pct:.2}%")]
    PriceImpactTooHigh { impact_pct: f64, max_pct: f64 },

    #[error("Insufficient balance: {available}SOL available, {required}SOL required")]
    InsufficientBalance { available: f64, required: f64 },

    // Market data errors
    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    // Position management errors
    #[error("Position not found: {0}")]
    PositionNotFound(String),

    // Auxiliary collaborators
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Trade journal error: {0}")]
    Journal(String),

    #[error("Burn failed: {0}")]
    Burn(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient external-call failure)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Quote(_)
                | Error::TransactionBuild(_)
                | Error::TransactionSend(_)
                | Error::TransactionUnconfirmed(_)
                | Error::MarketData(_)
                | Error::Http(_)
                | Error::Rpc(_)
        )
    }

    /// Check if this error should stop the engine from running at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::MissingEnvVar(_))
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

// Conversion from config errors
impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
