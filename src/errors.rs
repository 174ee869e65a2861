//! Crate-wide error types

use thiserror::Error;

/// Coarse classification of an [`Error`], used by the driver when logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Price read failed or returned unusable data; retry next tick
    TransientFeed,
    /// Trade attempt aborted before anything was sent to the relay
    AbortedTrade,
    /// Relay refused the bundle
    Rejected,
    /// Startup / configuration problem
    Setup,
}

/// Errors that can occur while observing the pool or executing a trade
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Price feed unavailable: {0}")]
    TransientFeed(String),

    #[error("Invalid price observed: {0}")]
    InvalidPrice(f64),

    #[error("No token account for input mint {0}")]
    MissingAccount(String),

    #[error("Nothing to sell: zero balance of {0}")]
    EmptyBalance(String),

    #[error("Quote/build service failure: {0}")]
    QuoteBuild(String),

    #[error("Relay rejected bundle: {0}")]
    RelayRejection(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify this error for the driver's error boundary
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TransientFeed(_) | Error::InvalidPrice(_) | Error::Rpc(_) => {
                ErrorKind::TransientFeed
            }
            Error::MissingAccount(_)
            | Error::EmptyBalance(_)
            | Error::QuoteBuild(_)
            | Error::Http(_)
            | Error::Signing(_)
            | Error::Decode(_) => ErrorKind::AbortedTrade,
            Error::RelayRejection(_) => ErrorKind::Rejected,
            Error::Config(_) => ErrorKind::Setup,
        }
    }

    /// True for failures that simply mean "try again next tick"
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::TransientFeed
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<solana_client::client_error::ClientError> for Error {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        Error::Rpc(err.to_string())
    }
}

impl From<solana_sdk::signer::SignerError> for Error {
    fn from(err: solana_sdk::signer::SignerError) -> Self {
        Error::Signing(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, Error>;
