//! Page view and visitor counting
//!
//! - `normalize` - host/path keying rules
//! - `snapshot` - legacy baselines (get-or-backfill)
//! - `store` - atomic live counters and visitor sets
//! - `service` - aggregation of baselines and live counts

pub mod normalize;
pub mod service;
pub mod snapshot;
pub mod store;

pub use normalize::{PageTarget, UrlError, normalize_host, normalize_path};
pub use service::{
    CounterError, CounterOverwrite, CounterService, DomainReport, PageOverwrite, Totals,
};
pub use snapshot::SnapshotCache;
pub use store::CounterStore;
