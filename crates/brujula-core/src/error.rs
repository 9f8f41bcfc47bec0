//! Error types for the planner core.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the document client, sync engine, identity, and config.
/// State mutations never produce errors; invalid commands are no-ops.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("document store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("local cache error: {0}")]
    Cache(#[from] sled::Error),

    #[error("identity error: {0}")]
    Identity(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
