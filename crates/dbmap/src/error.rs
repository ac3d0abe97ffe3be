//! Error types for dbmap

use thiserror::Error;

/// Result type alias for dbmap operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for mapping and database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// The record shape cannot be mapped, or a keyed operation found no key
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// A single-row query matched no rows
    #[error("No rows: {0}")]
    NoRows(String),

    /// The engine rejected or failed a statement (non-postgres collaborators)
    #[error("Execution error: {0}")]
    Execution(String),

    /// Error reported by tokio-postgres, passed through unchanged
    #[cfg(feature = "postgres")]
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a mapping error
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping(message.into())
    }

    /// Create a no-rows error
    pub fn no_rows(message: impl Into<String>) -> Self {
        Self::NoRows(message.into())
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Check if a single-row query found nothing
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows(_))
    }

    /// Check if this is a mapping error
    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for DbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
