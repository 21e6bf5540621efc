//! Data storage layer
//!
//! - `cache` - In-memory and Redis counter store, snapshots and rate limiting
//! - `sqlite` - Domain records (tracking state, manual UV adjustment)
//! - `traits` - `DomainStore` collaborator trait
//! - `types` - Shared row types
//! - `error` - Unified error type

pub mod cache;
pub mod error;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::DataError;
pub use sqlite::{SqliteDomainStore, SqliteService};
pub use traits::DomainStore;
pub use types::DomainRow;
