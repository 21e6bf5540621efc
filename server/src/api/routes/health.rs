//! Health check endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::data::cache::CacheService;

#[derive(Clone)]
pub struct HealthApiState {
    pub cache: Arc<CacheService>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub cache: CacheHealth,
}

#[derive(Serialize)]
pub struct CacheHealth {
    pub backend: &'static str,
    pub healthy: bool,
}

/// Build health routes
pub fn routes(cache: Arc<CacheService>) -> Router<()> {
    Router::new()
        .route("/api/v1/health", get(health))
        .with_state(HealthApiState { cache })
}

/// Liveness plus cache reachability; 503 when the cache is down
pub async fn health(State(state): State<HealthApiState>) -> impl IntoResponse {
    let healthy = match state.cache.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Cache health check failed");
            false
        }
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            cache: CacheHealth {
                backend: state.cache.backend_name(),
                healthy,
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::core::config::CacheConfig;

    #[tokio::test]
    async fn test_health_ok() {
        let cache = Arc::new(CacheService::new(&CacheConfig::memory()).await.unwrap());
        let response = routes(cache)
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cache"]["backend"], "memory");
    }
}
