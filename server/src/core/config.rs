use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_HOST,
    DEFAULT_LEGACY_MAX_ATTEMPTS, DEFAULT_LEGACY_PREFIX_LEN, DEFAULT_LEGACY_RETRY_DELAY_MS,
    DEFAULT_LEGACY_SUFFIX_LEN, DEFAULT_LEGACY_TIMEOUT_SECS, DEFAULT_LEGACY_URL,
    DEFAULT_PATH_MAX_LEN, DEFAULT_PORT, DEFAULT_RATE_LIMIT_REQUESTS,
    DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_SNAPSHOT_TTL_DAYS,
};
use crate::utils::file::expand_path;

// =============================================================================
// Cache Backend Enum
// =============================================================================

/// Cache backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendType {
    #[default]
    Memory,
    Redis,
}

impl fmt::Display for CacheBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackendType::Memory => write!(f, "memory"),
            CacheBackendType::Redis => write!(f, "redis"),
        }
    }
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Counter engine configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CounterFileConfig {
    pub snapshot_ttl_days: Option<u64>,
    pub path_max_len: Option<usize>,
    pub require_tracked_domain: Option<bool>,
}

/// Legacy provider configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LegacyFileConfig {
    pub enabled: Option<bool>,
    pub url: Option<String>,
    pub max_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub sync_back: Option<bool>,
    pub prefix_len: Option<usize>,
    pub suffix_len: Option<usize>,
}

/// Rate limit configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RateLimitFileConfig {
    pub enabled: Option<bool>,
    pub requests: Option<u32>,
    pub window_secs: Option<u64>,
    pub bypass_header: Option<String>,
}

/// Redis cache configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RedisFileConfig {
    /// Connection URL for Redis-compatible backends
    pub url: Option<String>,
}

/// Memory cache configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MemoryCacheFileConfig {
    /// Maximum number of cache entries
    pub max_entries: Option<u64>,
}

/// Database configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    /// Cache backend: memory (default) or redis
    pub cache: Option<CacheBackendType>,
    /// Redis cache configuration
    pub redis: Option<RedisFileConfig>,
    /// Memory cache configuration
    pub memory_cache: Option<MemoryCacheFileConfig>,
}

/// Admin surface configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AdminFileConfig {
    pub token: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub counter: Option<CounterFileConfig>,
    pub legacy: Option<LegacyFileConfig>,
    pub rate_limit: Option<RateLimitFileConfig>,
    pub database: Option<DatabaseFileConfig>,
    pub admin: Option<AdminFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Overwrite `$dst.$field` with `$src.$field` when the latter is set
macro_rules! merge_fields {
    ($dst:expr, $src:expr, $section:literal, [$($field:ident),+ $(,)?]) => {
        $(
            if $src.$field.is_some() {
                tracing::trace!(value = ?$src.$field, "Merging {}.{}", $section, stringify!($field));
                $dst.$field = $src.$field;
            }
        )+
    };
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            merge_fields!(current, server, "server", [host, port]);
        }

        if let Some(counter) = other.counter {
            let current = self.counter.get_or_insert_with(CounterFileConfig::default);
            merge_fields!(
                current,
                counter,
                "counter",
                [snapshot_ttl_days, path_max_len, require_tracked_domain]
            );
        }

        if let Some(legacy) = other.legacy {
            let current = self.legacy.get_or_insert_with(LegacyFileConfig::default);
            merge_fields!(
                current,
                legacy,
                "legacy",
                [
                    enabled,
                    url,
                    max_attempts,
                    retry_delay_ms,
                    timeout_secs,
                    sync_back,
                    prefix_len,
                    suffix_len
                ]
            );
        }

        if let Some(rate_limit) = other.rate_limit {
            let current = self
                .rate_limit
                .get_or_insert_with(RateLimitFileConfig::default);
            merge_fields!(
                current,
                rate_limit,
                "rate_limit",
                [enabled, requests, window_secs, bypass_header]
            );
        }

        if let Some(database) = other.database {
            let current = self.database.get_or_insert_with(DatabaseFileConfig::default);
            merge_fields!(current, database, "database", [cache]);
            if let Some(redis) = database.redis {
                let current_redis = current.redis.get_or_insert_with(RedisFileConfig::default);
                merge_fields!(current_redis, redis, "database.redis", [url]);
            }
            if let Some(memory) = database.memory_cache {
                let current_memory = current
                    .memory_cache
                    .get_or_insert_with(MemoryCacheFileConfig::default);
                merge_fields!(current_memory, memory, "database.memory_cache", [max_entries]);
            }
        }

        if let Some(admin) = other.admin {
            let current = self.admin.get_or_insert_with(AdminFileConfig::default);
            merge_fields!(current, admin, "admin", [token]);
        }

        if other.debug.is_some() {
            self.debug = other.debug;
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Counter engine configuration (final/runtime)
#[derive(Debug, Clone)]
pub struct CounterConfig {
    /// TTL applied to counters, visitor sets and snapshots
    pub key_ttl: Duration,
    /// Paths longer than this are truncated
    pub path_max_len: usize,
    /// Ignore events for hosts not registered as verified and tracked
    pub require_tracked_domain: bool,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            key_ttl: Duration::from_secs(DEFAULT_SNAPSHOT_TTL_DAYS * 24 * 60 * 60),
            path_max_len: DEFAULT_PATH_MAX_LEN,
            require_tracked_domain: false,
        }
    }
}

/// Legacy provider configuration (final/runtime)
#[derive(Debug, Clone)]
pub struct LegacyConfig {
    pub enabled: bool,
    pub url: String,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    pub sync_back: bool,
    pub prefix_len: usize,
    pub suffix_len: usize,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_LEGACY_URL.to_string(),
            max_attempts: DEFAULT_LEGACY_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_LEGACY_RETRY_DELAY_MS),
            timeout: Duration::from_secs(DEFAULT_LEGACY_TIMEOUT_SECS),
            sync_back: true,
            prefix_len: DEFAULT_LEGACY_PREFIX_LEN,
            suffix_len: DEFAULT_LEGACY_SUFFIX_LEN,
        }
    }
}

/// Rate limit configuration (final/runtime)
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u32,
    pub window_secs: u64,
    pub bypass_header: Option<String>,
}

/// Cache configuration (used internally by CacheService)
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache backend type
    pub backend: CacheBackendType,
    /// Maximum entries (memory backend)
    pub max_entries: u64,
    /// Redis URL (redis backend)
    pub redis_url: Option<String>,
}

impl CacheConfig {
    /// In-memory backend with default sizing
    pub fn memory() -> Self {
        Self {
            backend: CacheBackendType::Memory,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            redis_url: None,
        }
    }
}

/// Admin surface configuration (final/runtime)
#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    pub token: Option<String>,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub counter: CounterConfig,
    pub legacy: LegacyConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub admin: AdminConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.pagetally/pagetally.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::from_layers(cli, file_config);
        config.validate()?;
        Ok(config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn from_layers(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_counter = file_config.counter.unwrap_or_default();
        let file_legacy = file_config.legacy.unwrap_or_default();
        let file_rate_limit = file_config.rate_limit.unwrap_or_default();
        let file_database = file_config.database.unwrap_or_default();
        let file_admin = file_config.admin.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let counter_defaults = CounterConfig::default();
        let counter = CounterConfig {
            key_ttl: cli
                .snapshot_ttl_days
                .or(file_counter.snapshot_ttl_days)
                .map(|days| Duration::from_secs(days * 24 * 60 * 60))
                .unwrap_or(counter_defaults.key_ttl),
            path_max_len: file_counter
                .path_max_len
                .unwrap_or(counter_defaults.path_max_len),
            require_tracked_domain: cli
                .require_tracked_domain
                .or(file_counter.require_tracked_domain)
                .unwrap_or(counter_defaults.require_tracked_domain),
        };

        let legacy_defaults = LegacyConfig::default();
        let legacy = LegacyConfig {
            enabled: cli
                .legacy_enabled
                .or(file_legacy.enabled)
                .unwrap_or(legacy_defaults.enabled),
            url: cli
                .legacy_url
                .clone()
                .or(file_legacy.url)
                .unwrap_or(legacy_defaults.url),
            max_attempts: file_legacy
                .max_attempts
                .unwrap_or(legacy_defaults.max_attempts),
            retry_delay: file_legacy
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(legacy_defaults.retry_delay),
            timeout: file_legacy
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(legacy_defaults.timeout),
            sync_back: cli
                .legacy_sync_back
                .or(file_legacy.sync_back)
                .unwrap_or(legacy_defaults.sync_back),
            prefix_len: file_legacy
                .prefix_len
                .unwrap_or(legacy_defaults.prefix_len),
            suffix_len: file_legacy
                .suffix_len
                .unwrap_or(legacy_defaults.suffix_len),
        };

        let rate_limit = RateLimitConfig {
            enabled: cli
                .rate_limit_enabled
                .or(file_rate_limit.enabled)
                .unwrap_or(true),
            requests: cli
                .rate_limit_requests
                .or(file_rate_limit.requests)
                .unwrap_or(DEFAULT_RATE_LIMIT_REQUESTS),
            window_secs: cli
                .rate_limit_window_secs
                .or(file_rate_limit.window_secs)
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            bypass_header: cli
                .rate_limit_bypass_header
                .clone()
                .or(file_rate_limit.bypass_header),
        };

        let cache_backend = cli
            .cache_backend
            .or(file_database.cache)
            .unwrap_or_default();
        let cache = CacheConfig {
            backend: cache_backend,
            max_entries: cli
                .cache_max_entries
                .or(file_database.memory_cache.and_then(|m| m.max_entries))
                .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
            redis_url: if cache_backend == CacheBackendType::Redis {
                cli.cache_redis_url
                    .clone()
                    .or(file_database.redis.and_then(|r| r.url))
            } else {
                None
            },
        };

        let admin = AdminConfig {
            token: cli
                .admin_token
                .clone()
                .or(file_admin.token)
                .filter(|t| !t.is_empty()),
        };

        Self {
            server,
            counter,
            legacy,
            rate_limit,
            cache,
            admin,
            debug: cli.debug || file_config.debug.unwrap_or(false),
        }
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.cache.backend == CacheBackendType::Redis
            && self.cache.redis_url.as_ref().is_none_or(|u| u.is_empty())
        {
            anyhow::bail!(
                "Configuration error: database.redis.url is required when database.cache is 'redis'"
            );
        }

        if self.legacy.enabled && self.legacy.url.is_empty() {
            anyhow::bail!("Configuration error: legacy.url must not be empty when legacy is enabled");
        }

        if self.legacy.max_attempts == 0 {
            anyhow::bail!("Configuration error: legacy.max_attempts must be greater than 0");
        }

        if self.rate_limit.enabled && self.rate_limit.window_secs == 0 {
            anyhow::bail!("Configuration error: rate_limit.window_secs must be greater than 0");
        }

        if self.rate_limit.enabled && self.rate_limit.requests == 0 {
            tracing::warn!("rate_limit.requests is 0, all counting requests will be rejected");
        }

        if self.counter.key_ttl.is_zero() {
            anyhow::bail!("Configuration error: counter.snapshot_ttl_days must be greater than 0");
        }

        if self.admin.token.is_none() {
            tracing::debug!("No admin token configured, admin routes disabled");
        }

        Ok(())
    }
}

fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_backend_serde() {
        let backend: CacheBackendType = serde_json::from_str(r#""redis""#).unwrap();
        assert_eq!(backend, CacheBackendType::Redis);
        assert_eq!(CacheBackendType::Memory.to_string(), "memory");
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "server": { "host": "0.0.0.0", "port": 8080 },
            "counter": { "snapshot_ttl_days": 30, "require_tracked_domain": true },
            "legacy": { "enabled": false, "max_attempts": 5 },
            "rate_limit": { "requests": 10, "window_secs": 5 },
            "database": { "cache": "redis", "redis": { "url": "redis://localhost:6379" } },
            "admin": { "token": "s3cret" }
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("0.0.0.0".to_string())
        );
        assert_eq!(config.counter.as_ref().unwrap().snapshot_ttl_days, Some(30));
        assert_eq!(config.legacy.as_ref().unwrap().max_attempts, Some(5));
        assert_eq!(config.rate_limit.as_ref().unwrap().window_secs, Some(5));
        assert_eq!(
            config.database.as_ref().unwrap().cache,
            Some(CacheBackendType::Redis)
        );
        assert_eq!(
            config.admin.as_ref().unwrap().token.as_deref(),
            Some("s3cret")
        );
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "server": { "host": "localhost" }, "unknown_field": 123 }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extra.get("unknown_field").unwrap(), 123);
    }

    #[test]
    fn test_file_config_merge_overlay_wins() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{ "server": { "host": "base.host", "port": 1000 },
                 "legacy": { "url": "http://base", "sync_back": true } }"#,
        )
        .unwrap();
        let overlay: FileConfig = serde_json::from_str(
            r#"{ "server": { "port": 2000 }, "legacy": { "sync_back": false }, "debug": true }"#,
        )
        .unwrap();

        base.merge(overlay);

        let server = base.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("base.host"));
        assert_eq!(server.port, Some(2000));
        let legacy = base.legacy.unwrap();
        assert_eq!(legacy.url.as_deref(), Some("http://base"));
        assert_eq!(legacy.sync_back, Some(false));
        assert_eq!(base.debug, Some(true));
    }

    #[test]
    fn test_defaults_from_empty_layers() {
        let config = AppConfig::from_layers(&CliConfig::default(), FileConfig::default());
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.legacy.enabled);
        assert_eq!(config.legacy.max_attempts, DEFAULT_LEGACY_MAX_ATTEMPTS);
        assert_eq!(config.rate_limit.requests, DEFAULT_RATE_LIMIT_REQUESTS);
        assert_eq!(config.cache.backend, CacheBackendType::Memory);
        assert!(config.admin.token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: FileConfig = serde_json::from_str(
            r#"{ "server": { "port": 9000 }, "rate_limit": { "requests": 5 } }"#,
        )
        .unwrap();
        let cli = CliConfig {
            port: Some(9100),
            ..Default::default()
        };
        let config = AppConfig::from_layers(&cli, file);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.rate_limit.requests, 5);
    }

    #[test]
    fn test_validate_rejects_redis_without_url() {
        let cli = CliConfig {
            cache_backend: Some(CacheBackendType::Redis),
            ..Default::default()
        };
        let config = AppConfig::from_layers(&cli, FileConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let file: FileConfig =
            serde_json::from_str(r#"{ "legacy": { "max_attempts": 0 } }"#).unwrap();
        let config = AppConfig::from_layers(&CliConfig::default(), file);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_cli_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, r#"{ "server": { "port": 7777 } }"#).unwrap();

        let cli = CliConfig {
            config: Some(path),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.server.port, 7777);
    }

    #[test]
    fn test_load_missing_cli_path_fails() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/definitely/not/here.json")),
            ..Default::default()
        };
        assert!(AppConfig::load(&cli).is_err());
    }
}
