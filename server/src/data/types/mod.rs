//! Shared row types for the data layer

use serde::{Deserialize, Serialize};

/// Domain record from the domain store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRow {
    /// Normalized host
    pub host: String,
    /// Ownership proven through the dashboard
    pub verified: bool,
    /// Counting enabled by the owner
    pub tracked: bool,
    /// Manual UV offset, last write wins
    pub uv_adjustment: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DomainRow {
    /// Whether events for this host should be counted under strict tracking
    pub fn is_counted(&self) -> bool {
        self.verified && self.tracked
    }
}
