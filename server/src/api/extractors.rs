//! Request extractors for API routes
//!
//! Validation rejections render as the standard `{error, code, message}`
//! body; the v2 routes re-wrap them into their envelope through `ApiError`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::ops::Deref;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{ConnectInfo, FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::types::ApiError;
use crate::core::constants::{HEADER_FORWARDED_FOR, HEADER_REAL_IP};

/// Maximum length of a host path segment on admin routes
pub const MAX_HOST_LENGTH: usize = 253;

/// Validate a host path segment: 1-253 chars, no whitespace or slashes
pub fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= MAX_HOST_LENGTH
        && !host.chars().any(|c| c.is_whitespace() || c == '/')
}

// ============================================================================
// Path Extractors
// ============================================================================

/// Validated `{host}` path extractor for admin routes.
#[derive(Debug)]
pub struct HostPath(pub String);

impl<S> FromRequestParts<S> for HostPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(host) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_host(&host) {
            return Err(ValidationRejection::InvalidHost);
        }

        Ok(Self(host))
    }
}

// ============================================================================
// Client Identity
// ============================================================================

/// Client identifier used for visitor sets and rate limiting.
///
/// Precedence: `X-Real-IP`, then the socket peer address, then the first
/// `X-Forwarded-For` entry, then `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        if let Some(ip) = header(HEADER_REAL_IP) {
            return Self(ip.to_string());
        }
        if let Some(peer) = peer {
            return Self(peer.ip().to_string());
        }
        if let Some(ip) = header(HEADER_FORWARDED_FOR)
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return Self(ip.to_string());
        }
        Self("unknown".to_string())
    }

    pub fn from_parts(parts: &Parts) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self::resolve(&parts.headers, peer)
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Validation rejection with structured error response
#[derive(Debug)]
pub enum ValidationRejection {
    /// Failed to parse path parameters
    Path(PathRejection),
    /// Invalid host path segment
    InvalidHost,
    /// Failed to parse query string
    Query(QueryRejection),
    /// Failed to parse JSON body
    Json(JsonRejection),
    /// Validation constraints not satisfied
    Validation(validator::ValidationErrors),
}

impl From<ValidationRejection> for ApiError {
    fn from(rejection: ValidationRejection) -> Self {
        match rejection {
            ValidationRejection::Path(rejection) => {
                ApiError::bad_request("PATH_PARSE_ERROR", rejection.body_text())
            }
            ValidationRejection::InvalidHost => ApiError::bad_request(
                "INVALID_HOST",
                format!("Invalid host: must be 1-{} characters", MAX_HOST_LENGTH),
            ),
            ValidationRejection::Query(rejection) => {
                ApiError::bad_request("QUERY_PARSE_ERROR", rejection.body_text())
            }
            ValidationRejection::Json(rejection) => {
                ApiError::bad_request("JSON_PARSE_ERROR", rejection.body_text())
            }
            ValidationRejection::Validation(errors) => {
                ApiError::bad_request("VALIDATION_ERROR", format_validation_errors(&errors))
            }
        }
    }
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: validation failed", field))
            })
        })
        .collect::<Vec<_>>();
    messages.sort();
    messages.join("; ")
}

/// Query extractor with automatic validation.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T> Deref for ValidatedQuery<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Query)?;
        value.validate().map_err(ValidationRejection::Validation)?;
        Ok(Self(value))
    }
}

/// JSON body extractor with automatic validation.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T> Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidationRejection::Json)?;
        value.validate().map_err(ValidationRejection::Validation)?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    fn peer() -> Option<SocketAddr> {
        Some("198.51.100.7:52311".parse().unwrap())
    }

    #[test]
    fn test_client_ip_prefers_real_ip() {
        let h = headers(&[("x-real-ip", "203.0.113.9"), ("x-forwarded-for", "192.0.2.1")]);
        assert_eq!(ClientIp::resolve(&h, peer()).0, "203.0.113.9");
    }

    #[test]
    fn test_client_ip_peer_before_forwarded_for() {
        let h = headers(&[("x-forwarded-for", "192.0.2.1, 10.0.0.1")]);
        assert_eq!(ClientIp::resolve(&h, peer()).0, "198.51.100.7");
    }

    #[test]
    fn test_client_ip_forwarded_for_first_entry() {
        let h = headers(&[("x-forwarded-for", " 192.0.2.1 , 10.0.0.1")]);
        assert_eq!(ClientIp::resolve(&h, None).0, "192.0.2.1");
    }

    #[test]
    fn test_client_ip_unknown() {
        assert_eq!(ClientIp::resolve(&HeaderMap::new(), None).0, "unknown");
        let h = headers(&[("x-real-ip", "  ")]);
        assert_eq!(ClientIp::resolve(&h, None).0, "unknown");
    }

    #[test]
    fn test_is_valid_host() {
        assert!(is_valid_host("a.com"));
        assert!(!is_valid_host(""));
        assert!(!is_valid_host("a b.com"));
        assert!(!is_valid_host(&"a".repeat(MAX_HOST_LENGTH + 1)));
    }
}
