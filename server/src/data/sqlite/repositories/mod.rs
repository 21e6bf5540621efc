//! SQLite repositories
//!
//! Row types are imported from `crate::data::types`.

pub mod domain;

pub use domain::{get_domain, set_uv_adjustment, upsert_domain};
