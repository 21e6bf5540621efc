//! Domain logic for page view counting
//!
//! - `counter` - normalization, snapshots, live counters and aggregation
//! - `legacy` - legacy provider backfill and sync-back

pub mod counter;
pub mod legacy;

pub use counter::{CounterError, CounterService, Totals};
pub use legacy::{BaselineSource, LegacyClient, LegacySync};
