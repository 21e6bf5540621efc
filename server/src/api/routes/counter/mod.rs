//! Counting API endpoints
//!
//! v1 returns the bare totals; v2 wraps every response, errors included, in
//! `{status, message, data}`.

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use types::{LogQuery, LogRequest};

use crate::api::extractors::{ClientIp, ValidatedJson, ValidatedQuery, ValidationRejection};
use crate::api::types::{ApiError, Envelope};
use crate::domain::{CounterService, Totals};

/// Shared state for counting endpoints
#[derive(Clone)]
pub struct CounterApiState {
    pub counter: Arc<CounterService>,
}

/// Build counting routes
pub fn routes(counter: Arc<CounterService>) -> Router<()> {
    let state = CounterApiState { counter };

    Router::new()
        .route("/api/v1/log", get(read_v1).post(record_v1))
        .route("/api/v2/log", get(read_v2).post(record_v2))
        .with_state(state)
}

async fn record(
    state: &CounterApiState,
    client: &str,
    body: &LogRequest,
) -> Result<Totals, ApiError> {
    tracing::debug!(client, url = %body.url, "Recording page view");
    state
        .counter
        .record(&body.url, client)
        .await
        .map_err(|e| {
            tracing::warn!(client, url = %body.url, error = %e, "Failed to record page view");
            ApiError::from(e)
        })
}

async fn read(state: &CounterApiState, query: &LogQuery) -> Result<Totals, ApiError> {
    state.counter.read(&query.url).await.map_err(|e| {
        tracing::warn!(url = %query.url, error = %e, "Failed to read counters");
        ApiError::from(e)
    })
}

fn enveloped(result: Result<Totals, ApiError>) -> Response {
    match result {
        Ok(totals) => Json(Envelope::ok(totals)).into_response(),
        Err(e) => Envelope::<Totals>::error(&e).into_response(),
    }
}

/// Count a page view and return the totals
pub async fn record_v1(
    State(state): State<CounterApiState>,
    ClientIp(client): ClientIp,
    ValidatedJson(body): ValidatedJson<LogRequest>,
) -> Result<Json<Totals>, ApiError> {
    record(&state, &client, &body).await.map(Json)
}

/// Current totals without counting
pub async fn read_v1(
    State(state): State<CounterApiState>,
    ValidatedQuery(query): ValidatedQuery<LogQuery>,
) -> Result<Json<Totals>, ApiError> {
    read(&state, &query).await.map(Json)
}

/// Enveloped variant of [`record_v1`]
pub async fn record_v2(
    State(state): State<CounterApiState>,
    ClientIp(client): ClientIp,
    body: Result<ValidatedJson<LogRequest>, ValidationRejection>,
) -> Response {
    let result = match body {
        Ok(ValidatedJson(body)) => record(&state, &client, &body).await,
        Err(rejection) => Err(rejection.into()),
    };
    enveloped(result)
}

/// Enveloped variant of [`read_v1`]
pub async fn read_v2(
    State(state): State<CounterApiState>,
    query: Result<ValidatedQuery<LogQuery>, ValidationRejection>,
) -> Response {
    let result = match query {
        Ok(ValidatedQuery(query)) => read(&state, &query).await,
        Err(rejection) => Err(rejection.into()),
    };
    enveloped(result)
}
