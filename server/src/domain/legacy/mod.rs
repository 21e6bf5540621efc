//! Legacy counting provider
//!
//! - `client` - baseline backfill with bounded retries
//! - `payload` - JSONP framing and decoding
//! - `sync` - detached replication of counted events

mod client;
mod error;
mod payload;
mod sync;

pub use client::{BaselineSource, LegacyClient};
pub use error::LegacyError;
pub use payload::{Framing, LegacyCounts};
pub use sync::LegacySync;
