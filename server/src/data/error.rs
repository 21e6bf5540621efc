//! Unified error type for the data layer

use thiserror::Error;

use super::cache::CacheError;
use super::sqlite::SqliteError;

/// Error type for domain store and counter store operations
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error (domain store)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] SqliteError),

    /// Cache backend error (counter store, snapshots)
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl From<sqlx::Error> for DataError {
    fn from(e: sqlx::Error) -> Self {
        Self::Sqlite(SqliteError::Database(e))
    }
}
