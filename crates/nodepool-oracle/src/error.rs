//! Busy oracle client errors.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for oracle client operations.
pub type OracleClientResult<T> = Result<T, OracleClientError>;

/// Errors raised while talking to the busy-node oracle.
#[derive(Debug, Error)]
pub enum OracleClientError {
    #[error("invalid oracle address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("oracle config error: {0}")]
    Config(#[from] nodepool_core::ConfigError),

    #[error("failed to connect to oracle at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build oracle request: {0}")]
    Request(#[from] http::Error),

    #[error("oracle http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("oracle response body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("failed to read oracle response body: {0}")]
    Body(String),

    #[error("unexpected response code: {status} ({body})")]
    Status { status: u16, body: String },

    #[error("failed to decode oracle response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("oracle request timed out after {0:?}")]
    Timeout(Duration),
}
