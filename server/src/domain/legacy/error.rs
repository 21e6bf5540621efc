//! Legacy provider error types

use thiserror::Error;

/// A single failed exchange with the legacy provider
///
/// These never reach a caller of the counting endpoint: the backfill path
/// retries them and then degrades to zero.
#[derive(Error, Debug)]
pub enum LegacyError {
    #[error("Legacy request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Legacy provider returned HTTP {0}")]
    Status(u16),

    #[error("Legacy payload rejected: {0}")]
    Payload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            LegacyError::Status(503).to_string(),
            "Legacy provider returned HTTP 503"
        );
        assert_eq!(
            LegacyError::Payload("too short".into()).to_string(),
            "Legacy payload rejected: too short"
        );
    }
}
