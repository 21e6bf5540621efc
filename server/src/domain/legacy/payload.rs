//! Legacy provider response framing
//!
//! The provider answers with a JSONP callback:
//! `try{BusuanziCallback_777487655111({...});}catch(e){}`. The wrapper is
//! stripped at fixed byte offsets and the remainder must decode as the counts
//! object. Anything else is rejected.

use serde::Deserialize;

use super::LegacyError;
use crate::core::constants::{DEFAULT_LEGACY_PREFIX_LEN, DEFAULT_LEGACY_SUFFIX_LEN};

/// Counts reported by the legacy provider for one referer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct LegacyCounts {
    pub site_uv: u64,
    pub site_pv: u64,
    pub page_pv: u64,
}

/// Fixed-width wrapper around the JSON body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    pub prefix_len: usize,
    pub suffix_len: usize,
}

impl Default for Framing {
    fn default() -> Self {
        Self {
            prefix_len: DEFAULT_LEGACY_PREFIX_LEN,
            suffix_len: DEFAULT_LEGACY_SUFFIX_LEN,
        }
    }
}

impl Framing {
    /// Strip the wrapper and decode the counts
    pub fn parse(&self, body: &[u8]) -> Result<LegacyCounts, LegacyError> {
        let end = body
            .len()
            .checked_sub(self.suffix_len)
            .filter(|end| *end >= self.prefix_len)
            .ok_or_else(|| {
                LegacyError::Payload(format!("response too short ({} bytes)", body.len()))
            })?;

        let inner = body
            .get(self.prefix_len..end)
            .ok_or_else(|| LegacyError::Payload("framing out of range".into()))?;

        serde_json::from_slice(inner).map_err(|e| LegacyError::Payload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::LEGACY_PAYLOAD_TRAILER;

    fn wrap(json: &str) -> String {
        format!("try{{BusuanziCallback_777487655111({}{}", json, LEGACY_PAYLOAD_TRAILER)
    }

    #[test]
    fn test_default_framing_matches_provider() {
        assert_eq!(
            "try{BusuanziCallback_777487655111(".len(),
            DEFAULT_LEGACY_PREFIX_LEN
        );
        assert_eq!(LEGACY_PAYLOAD_TRAILER.len(), DEFAULT_LEGACY_SUFFIX_LEN);
    }

    #[test]
    fn test_parse_valid_payload() {
        let body = wrap(r#"{"site_uv":10,"page_pv":5,"version":2.4,"site_pv":20}"#);
        let counts = Framing::default().parse(body.as_bytes()).unwrap();
        assert_eq!(
            counts,
            LegacyCounts {
                site_uv: 10,
                site_pv: 20,
                page_pv: 5
            }
        );
    }

    #[test]
    fn test_parse_rejects_short_body() {
        let result = Framing::default().parse(b"try{}");
        assert!(matches!(result, Err(LegacyError::Payload(_))));

        let result = Framing::default().parse(b"");
        assert!(matches!(result, Err(LegacyError::Payload(_))));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let body = wrap(r#"{"site_uv":10,"site_pv":20}"#);
        assert!(Framing::default().parse(body.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_rejects_negative_or_text_counts() {
        let body = wrap(r#"{"site_uv":-1,"site_pv":20,"page_pv":5}"#);
        assert!(Framing::default().parse(body.as_bytes()).is_err());

        let body = wrap(r#"{"site_uv":"10","site_pv":20,"page_pv":5}"#);
        assert!(Framing::default().parse(body.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_rejects_shifted_framing() {
        // Plain JSON without the callback wrapper
        let body = r#"{"site_uv":10,"site_pv":20,"page_pv":5,"padding":"xxxxxxxxxxxxxxxxxxxxxxxxxxxxxx"}"#;
        assert!(Framing::default().parse(body.as_bytes()).is_err());
    }

    #[test]
    fn test_custom_framing() {
        let framing = Framing {
            prefix_len: 3,
            suffix_len: 2,
        };
        let counts = framing
            .parse(br#"cb({"site_uv":1,"site_pv":2,"page_pv":3});"#)
            .unwrap();
        assert_eq!(counts.page_pv, 3);
    }
}
