//! Repository traits for database backends

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::types::DomainRow;

/// Domain/account collaborator consumed by the counting engine
///
/// The engine only asks whether a host is tracked and reads or writes the
/// manual UV adjustment. Registration is an administrative concern.
#[async_trait]
pub trait DomainStore: Send + Sync {
    async fn get_domain(&self, host: &str) -> Result<Option<DomainRow>, DataError>;

    /// Create or update the tracking flags of a host
    async fn upsert_domain(
        &self,
        host: &str,
        verified: bool,
        tracked: bool,
    ) -> Result<DomainRow, DataError>;

    /// Whether the host is verified and tracked
    async fn is_tracked(&self, host: &str) -> Result<bool, DataError> {
        Ok(self
            .get_domain(host)
            .await?
            .is_some_and(|domain| domain.is_counted()))
    }

    /// Manual UV adjustment for a host (0 when unknown)
    async fn uv_adjustment(&self, host: &str) -> Result<i64, DataError> {
        Ok(self
            .get_domain(host)
            .await?
            .map(|domain| domain.uv_adjustment)
            .unwrap_or(0))
    }

    /// Overwrite the manual UV adjustment for a host
    async fn set_uv_adjustment(&self, host: &str, delta: i64) -> Result<(), DataError>;
}
