//! Counter API types

use serde::Deserialize;
use validator::Validate;

use crate::api::types::validate_page_url;

/// Body of `POST /api/v{1,2}/log`
#[derive(Debug, Deserialize, Validate)]
pub struct LogRequest {
    /// Full URL of the page being viewed
    #[serde(default)]
    #[validate(custom(function = "validate_page_url"))]
    pub url: String,

    /// Client token issued by the embed script
    #[serde(default)]
    #[validate(length(min = 1, max = 256, message = "token is required (max 256 chars)"))]
    pub token: String,
}

/// Query of `GET /api/v{1,2}/log`
#[derive(Debug, Deserialize, Validate)]
pub struct LogQuery {
    #[serde(default)]
    #[validate(custom(function = "validate_page_url"))]
    pub url: String,
}
