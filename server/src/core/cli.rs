use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::CacheBackendType;
use super::constants::{
    ENV_ADMIN_TOKEN, ENV_CACHE_BACKEND, ENV_CACHE_MAX_ENTRIES, ENV_CACHE_REDIS_URL, ENV_CONFIG,
    ENV_DEBUG, ENV_HOST, ENV_LEGACY_ENABLED, ENV_LEGACY_SYNC_BACK, ENV_LEGACY_URL, ENV_PORT,
    ENV_RATE_LIMIT_BYPASS_HEADER, ENV_RATE_LIMIT_ENABLED, ENV_RATE_LIMIT_REQUESTS,
    ENV_RATE_LIMIT_WINDOW_SECS, ENV_REQUIRE_TRACKED_DOMAIN, ENV_SNAPSHOT_TTL_DAYS,
};

#[derive(Parser)]
#[command(name = "pagetally")]
#[command(version, about = "Self-hosted page view and visitor counter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Enable debug mode (verbose request logging)
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    // Counter options
    /// Lifetime of counter and snapshot keys in days
    #[arg(long, global = true, env = ENV_SNAPSHOT_TTL_DAYS)]
    pub snapshot_ttl_days: Option<u64>,

    /// Only count events for hosts registered as verified and tracked
    #[arg(long, global = true, env = ENV_REQUIRE_TRACKED_DOMAIN)]
    pub require_tracked_domain: Option<bool>,

    // Legacy provider options
    /// Enable or disable backfill from the legacy provider
    #[arg(long, global = true, env = ENV_LEGACY_ENABLED)]
    pub legacy_enabled: Option<bool>,

    /// Legacy provider JSONP endpoint
    #[arg(long, global = true, env = ENV_LEGACY_URL)]
    pub legacy_url: Option<String>,

    /// Keep notifying the legacy provider of every admitted event
    #[arg(long, global = true, env = ENV_LEGACY_SYNC_BACK)]
    pub legacy_sync_back: Option<bool>,

    // Cache options
    /// Cache backend (memory or redis)
    #[arg(long, global = true, env = ENV_CACHE_BACKEND, value_parser = parse_cache_backend_type)]
    pub cache_backend: Option<CacheBackendType>,

    /// Maximum number of cache entries
    #[arg(long, global = true, env = ENV_CACHE_MAX_ENTRIES)]
    pub cache_max_entries: Option<u64>,

    /// Redis-compatible cache URL. Supports Redis, Sentinel, Valkey, Dragonfly.
    /// Formats: redis://host:port/db, redis+sentinel://s1:port,s2:port/master/db
    #[arg(long, global = true, env = ENV_CACHE_REDIS_URL)]
    pub cache_redis_url: Option<String>,

    // Rate limit options
    /// Enable or disable rate limiting
    #[arg(long, global = true, env = ENV_RATE_LIMIT_ENABLED)]
    pub rate_limit_enabled: Option<bool>,

    /// Admitted requests per client per window
    #[arg(long, global = true, env = ENV_RATE_LIMIT_REQUESTS)]
    pub rate_limit_requests: Option<u32>,

    /// Sliding window length in seconds
    #[arg(long, global = true, env = ENV_RATE_LIMIT_WINDOW_SECS)]
    pub rate_limit_window_secs: Option<u64>,

    /// Rate limit bypass header secret
    #[arg(long, global = true, env = ENV_RATE_LIMIT_BYPASS_HEADER)]
    pub rate_limit_bypass_header: Option<String>,

    /// Bearer token for the admin routes (admin routes are disabled without it)
    #[arg(long, global = true, env = ENV_ADMIN_TOKEN)]
    pub admin_token: Option<String>,
}

/// Parse cache backend type from CLI/env string
fn parse_cache_backend_type(s: &str) -> Result<CacheBackendType, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(CacheBackendType::Memory),
        "redis" => Ok(CacheBackendType::Redis),
        _ => Err(format!(
            "Invalid cache backend '{}'. Valid options: memory, redis",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub snapshot_ttl_days: Option<u64>,
    pub require_tracked_domain: Option<bool>,
    pub legacy_enabled: Option<bool>,
    pub legacy_url: Option<String>,
    pub legacy_sync_back: Option<bool>,
    pub cache_backend: Option<CacheBackendType>,
    pub cache_max_entries: Option<u64>,
    pub cache_redis_url: Option<String>,
    pub rate_limit_enabled: Option<bool>,
    pub rate_limit_requests: Option<u32>,
    pub rate_limit_window_secs: Option<u64>,
    pub rate_limit_bypass_header: Option<String>,
    pub admin_token: Option<String>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        debug: cli.debug,
        config: cli.config,
        snapshot_ttl_days: cli.snapshot_ttl_days,
        require_tracked_domain: cli.require_tracked_domain,
        legacy_enabled: cli.legacy_enabled,
        legacy_url: cli.legacy_url,
        legacy_sync_back: cli.legacy_sync_back,
        cache_backend: cli.cache_backend,
        cache_max_entries: cli.cache_max_entries,
        cache_redis_url: cli.cache_redis_url,
        rate_limit_enabled: cli.rate_limit_enabled,
        rate_limit_requests: cli.rate_limit_requests,
        rate_limit_window_secs: cli.rate_limit_window_secs,
        rate_limit_bypass_header: cli.rate_limit_bypass_header,
        admin_token: cli.admin_token,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cache_backend_type() {
        assert_eq!(
            parse_cache_backend_type("Redis").unwrap(),
            CacheBackendType::Redis
        );
        assert_eq!(
            parse_cache_backend_type("memory").unwrap(),
            CacheBackendType::Memory
        );
        assert!(parse_cache_backend_type("memcached").is_err());
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "pagetally",
            "--port",
            "8080",
            "--rate-limit-requests",
            "10",
            "--legacy-enabled",
            "false",
        ])
        .unwrap();
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.rate_limit_requests, Some(10));
        assert_eq!(cli.legacy_enabled, Some(false));
        assert!(cli.command.is_none());
    }
}
