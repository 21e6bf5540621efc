//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::middleware;
use super::rate_limit::{RateLimitState, rate_limit_middleware};
use super::routes::{admin, counter, health};
use crate::core::CoreApp;
use crate::core::config::RateLimitConfig;
use crate::core::constants::DEFAULT_BODY_LIMIT;
use crate::data::cache::{CacheService, RateLimitBucket, RateLimiter};
use crate::domain::CounterService;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let router = build_router(
            app.counter.clone(),
            app.cache.clone(),
            app.rate_limiter.clone(),
            &app.config.rate_limit,
            app.config.admin.token.as_deref(),
        );

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "Listening");
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}

/// Assemble every route with its middleware stack
pub fn build_router(
    counter: Arc<CounterService>,
    cache: Arc<CacheService>,
    rate_limiter: Arc<RateLimiter>,
    rate_limit: &RateLimitConfig,
    admin_token: Option<&str>,
) -> Router {
    // Counting routes are the only ones exposed to embedding pages
    let counter_routes = counter::routes(counter.clone());
    let counter_routes = if rate_limit.enabled {
        counter_routes.layer(axum::middleware::from_fn_with_state(
            RateLimitState {
                limiter: rate_limiter,
                bucket: RateLimitBucket::counting(rate_limit.requests, rate_limit.window_secs),
                bypass_header: rate_limit.bypass_header.clone(),
            },
            rate_limit_middleware,
        ))
    } else {
        counter_routes
    };

    let router = Router::new()
        .merge(health::routes(cache))
        .merge(counter_routes);

    let router = match admin_token {
        Some(token) => router.nest("/api/v1/admin", admin::routes(counter, token)),
        None => {
            tracing::debug!("No admin token configured, admin routes disabled");
            router
        }
    };

    router
        .fallback(middleware::handle_404)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(middleware::cors())
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}
