//! Admin API endpoints
//!
//! Mounted only when an admin token is configured. Every request must carry
//! `Authorization: Bearer <token>`.

pub mod types;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{get, put};
use axum::{Json, Router};
use subtle::ConstantTimeEq;

use types::{OverwriteCountersRequest, TrackDomainRequest};

use crate::api::extractors::{HostPath, ValidatedJson};
use crate::api::types::ApiError;
use crate::data::DomainRow;
use crate::domain::CounterService;
use crate::domain::counter::DomainReport;

/// Shared state for admin endpoints
#[derive(Clone)]
pub struct AdminApiState {
    pub counter: Arc<CounterService>,
}

/// Bearer token guard state
#[derive(Clone)]
pub struct AdminAuthState {
    pub token: Arc<str>,
}

/// Build admin routes (mounted under `/api/v1/admin`)
pub fn routes(counter: Arc<CounterService>, token: &str) -> Router<()> {
    let state = AdminApiState { counter };
    let auth = AdminAuthState {
        token: Arc::from(token),
    };

    Router::new()
        .route("/domains/{host}", get(get_domain).put(track_domain))
        .route("/domains/{host}/counters", put(overwrite_counters))
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(auth, require_admin))
}

/// Constant-time token comparison
fn token_matches(expected: &str, presented: &str) -> bool {
    expected.len() == presented.len()
        && bool::from(expected.as_bytes().ct_eq(presented.as_bytes()))
}

/// Reject requests without the admin bearer token
pub async fn require_admin(
    State(state): State<AdminAuthState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token_matches(&state.token, token.trim()));

    match authorized {
        Some(true) => Ok(next.run(request).await),
        Some(false) => {
            tracing::warn!(uri = %request.uri(), "Rejected admin request with invalid token");
            Err(ApiError::unauthorized("TOKEN_INVALID", "Invalid admin token"))
        }
        None => Err(ApiError::unauthorized(
            "AUTH_REQUIRED",
            "Authentication required",
        )),
    }
}

/// Counters and tracking state for a host
pub async fn get_domain(
    State(state): State<AdminApiState>,
    HostPath(host): HostPath,
) -> Result<Json<DomainReport>, ApiError> {
    let report = state.counter.report(&host).await?;
    Ok(Json(report))
}

/// Register or update a host's tracking flags
pub async fn track_domain(
    State(state): State<AdminApiState>,
    HostPath(host): HostPath,
    ValidatedJson(body): ValidatedJson<TrackDomainRequest>,
) -> Result<Json<DomainRow>, ApiError> {
    let row = state
        .counter
        .track(&host, body.verified, body.tracked)
        .await?;
    Ok(Json(row))
}

/// Overwrite live counters, the UV adjustment or cached legacy baselines
pub async fn overwrite_counters(
    State(state): State<AdminApiState>,
    HostPath(host): HostPath,
    ValidatedJson(body): ValidatedJson<OverwriteCountersRequest>,
) -> Result<Json<DomainReport>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request(
            "NOTHING_TO_UPDATE",
            "Provide at least one counter or baseline to overwrite",
        ));
    }

    state.counter.overwrite(&host, body.into()).await?;
    let report = state.counter.report(&host).await?;
    Ok(Json(report))
}
