//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::banner;
use crate::core::cli::{self, CliConfig};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG, ENV_LOG_FORMAT};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::cache::{CacheService, RateLimiter};
use crate::data::{SqliteDomainStore, SqliteService};
use crate::domain::counter::{CounterStore, SnapshotCache};
use crate::domain::{CounterService, LegacyClient, LegacySync};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: AppStorage,
    pub cache: Arc<CacheService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub counter: Arc<CounterService>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        // `start` is the only command and also the default
        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        if config.debug {
            tracing::info!("Debug mode enabled");
        }
        let storage = AppStorage::init().await?;

        let cache = Arc::new(
            CacheService::new(&config.cache)
                .await
                .context("Failed to initialize cache service")?,
        );
        tracing::debug!(backend = cache.backend_name(), "Cache initialized");

        let rate_limiter = Arc::new(RateLimiter::new(cache.clone()));

        let database = Arc::new(
            SqliteService::init(&storage)
                .await
                .context("Failed to initialize domain database")?,
        );
        let domains = Arc::new(SqliteDomainStore::new(database.clone(), Some(cache.clone())));

        let legacy = LegacyClient::new(&config.legacy)
            .context("Failed to initialize legacy provider client")?;
        let sync = LegacySync::new(&legacy, &config.legacy.url, config.legacy.sync_back);
        let sync = sync.is_enabled().then_some(sync);
        tracing::debug!(
            backfill = legacy.is_enabled(),
            sync_back = sync.is_some(),
            "Legacy provider configured"
        );

        let snapshots = SnapshotCache::new(cache.clone(), Arc::new(legacy), config.counter.key_ttl);
        let store = CounterStore::new(cache.clone(), domains, config.counter.key_ttl);
        let counter = Arc::new(CounterService::new(
            snapshots,
            store,
            sync,
            &config.counter,
        ));

        let shutdown = ShutdownService::new(database);

        Ok(Self {
            shutdown,
            config,
            storage,
            cache,
            rate_limiter,
            counter,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        let json = std::env::var(ENV_LOG_FORMAT)
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if json {
            tracing_subscriber::fmt()
                .json()
                .with_target(false)
                .with_env_filter(filter)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_thread_ids(false)
                .with_level(true)
                .with_ansi(true)
                .compact()
                .with_env_filter(filter)
                .init();
        }
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        banner::print_banner(
            &app.config.server.host,
            app.config.server.port,
            app.config.legacy.enabled,
            app.config.admin.token.is_some(),
            &app.storage.data_dir().display().to_string(),
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }
}
