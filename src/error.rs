use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid membership operation: {0}")]
    InvalidOperation(String),

    #[error("operation timed out")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
