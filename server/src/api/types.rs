//! Shared API types
//!
//! Error responses and the v2 response envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use validator::ValidationError;

use crate::domain::CounterError;

/// Maximum accepted length of a reported page URL
pub const MAX_URL_LENGTH: usize = 2048;

/// Validator function for page URL fields
pub fn validate_page_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::new("url_empty").with_message("url is required".into()));
    }
    if url.len() > MAX_URL_LENGTH {
        return Err(ValidationError::new("url_too_long")
            .with_message(format!("url too long (max {} chars)", MAX_URL_LENGTH).into()));
    }
    Ok(())
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Unauthorized { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, &str, &str) {
        match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", code, message)
            }
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL",
                message,
            ),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }

    pub fn message(&self) -> &str {
        self.parts().3
    }
}

impl From<CounterError> for ApiError {
    fn from(e: CounterError) -> Self {
        match e {
            CounterError::InvalidUrl(e) => Self::bad_request("INVALID_URL", e.to_string()),
            CounterError::Data(e) => {
                tracing::error!(error = %e, "Counter storage error");
                Self::internal("Counter storage failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = self.parts();
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// v2 response envelope: `{status, message, data}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: "success",
            message: String::new(),
            data: Some(data),
        }
    }

    /// Wrap an error in the envelope, keeping the error's status code
    pub fn error(err: &ApiError) -> (StatusCode, Json<Self>) {
        (
            err.status(),
            Json(Self {
                status: "error",
                message: err.message().to_string(),
                data: None,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::counter::UrlError;

    #[test]
    fn test_validate_page_url() {
        assert!(validate_page_url("https://a.com/").is_ok());
        assert!(validate_page_url("   ").is_err());
        assert!(validate_page_url(&"a".repeat(MAX_URL_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_counter_error_mapping() {
        let err: ApiError = CounterError::InvalidUrl(UrlError::Unparseable("x".into())).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = CounterError::Data(crate::data::DataError::Cache(
            crate::data::cache::CacheError::Connection("down".into()),
        ))
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Counter storage failed");
    }

    #[test]
    fn test_envelope_error_keeps_status() {
        let (status, Json(body)) =
            Envelope::<()>::error(&ApiError::bad_request("MISSING_URL", "url is required"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.status, "error");
        assert_eq!(body.message, "url is required");
    }
}
