//! Error type shared by the thirdparty crates
//!
//! Storage and bootstrap failures only. Pipeline stages define their own
//! error enums and wrap this one for persistence.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap file, root folder or API key problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller asked for something the store cannot do
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Stored row does not decode (bad uuid, timestamp or enum text)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// UNIQUE constraint violation reported by SQLite
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
