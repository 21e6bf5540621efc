// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "PageTally";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "pagetally";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".pagetally";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "pagetally.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "PAGETALLY_CONFIG";

// =============================================================================
// Environment Variables - Debug / Logging
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "PAGETALLY_DEBUG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "PAGETALLY_LOG";

/// Environment variable for log output format (`compact` or `json`)
pub const ENV_LOG_FORMAT: &str = "PAGETALLY_LOG_FORMAT";

// =============================================================================
// Environment Variables - Server
// =============================================================================

pub const ENV_HOST: &str = "PAGETALLY_HOST";
pub const ENV_PORT: &str = "PAGETALLY_PORT";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5390;

/// Default request body limit (the ingestion body is a tiny JSON object)
pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024;

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "PAGETALLY_DATA_DIR";

// =============================================================================
// SQLite Database (domain records)
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "pagetally.db";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Cache
// =============================================================================

/// Default maximum entries for in-memory cache
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 100_000;

pub const ENV_CACHE_BACKEND: &str = "PAGETALLY_CACHE_BACKEND";
pub const ENV_CACHE_MAX_ENTRIES: &str = "PAGETALLY_CACHE_MAX_ENTRIES";
pub const ENV_CACHE_REDIS_URL: &str = "PAGETALLY_REDIS_URL";

/// Cache TTL for domain records (1 min)
pub const CACHE_TTL_DOMAIN: u64 = 60;

// =============================================================================
// Counters
// =============================================================================

/// Lifetime of counter, visitor-set and snapshot keys (refreshed on every write)
pub const DEFAULT_SNAPSHOT_TTL_DAYS: u64 = 90;

/// Paths longer than this are truncated before keying
pub const DEFAULT_PATH_MAX_LEN: usize = 200;

/// Sentinel bucket for hosts that normalize to nothing
pub const INVALID_HOST: &str = "invalid-host";

/// Sentinel bucket for local filesystem-style paths
pub const INVALID_PATH: &str = "invalid-path";

pub const ENV_SNAPSHOT_TTL_DAYS: &str = "PAGETALLY_SNAPSHOT_TTL_DAYS";
pub const ENV_REQUIRE_TRACKED_DOMAIN: &str = "PAGETALLY_REQUIRE_TRACKED_DOMAIN";

// =============================================================================
// Legacy Provider
// =============================================================================

/// Legacy counting endpoint (JSONP)
pub const DEFAULT_LEGACY_URL: &str =
    "https://busuanzi.ibruce.info/busuanzi?jsonpCallback=BusuanziCallback_777487655111";

/// Width of `try{BusuanziCallback_777487655111(`
pub const DEFAULT_LEGACY_PREFIX_LEN: usize = 34;

/// Width of `);}catch(e){}`
pub const DEFAULT_LEGACY_SUFFIX_LEN: usize = 13;

/// Literal trailer every legacy payload ends with
pub const LEGACY_PAYLOAD_TRAILER: &str = ");}catch(e){}";

/// Attempts per legacy fetch before degrading to zero
pub const DEFAULT_LEGACY_MAX_ATTEMPTS: u32 = 3;

/// Fixed delay between legacy fetch attempts
pub const DEFAULT_LEGACY_RETRY_DELAY_MS: u64 = 1000;

/// Per-request timeout for legacy fetches
pub const DEFAULT_LEGACY_TIMEOUT_SECS: u64 = 10;

/// Browser-like user agent; the legacy provider rejects obvious scripts
pub const LEGACY_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub const ENV_LEGACY_ENABLED: &str = "PAGETALLY_LEGACY_ENABLED";
pub const ENV_LEGACY_URL: &str = "PAGETALLY_LEGACY_URL";
pub const ENV_LEGACY_SYNC_BACK: &str = "PAGETALLY_LEGACY_SYNC_BACK";

// =============================================================================
// Rate Limiting
// =============================================================================

/// Default admitted requests per window per client
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 60;

/// Default sliding window length in seconds
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

pub const ENV_RATE_LIMIT_ENABLED: &str = "PAGETALLY_RATE_LIMIT_ENABLED";
pub const ENV_RATE_LIMIT_REQUESTS: &str = "PAGETALLY_RATE_LIMIT_REQUESTS";
pub const ENV_RATE_LIMIT_WINDOW_SECS: &str = "PAGETALLY_RATE_LIMIT_WINDOW_SECS";
pub const ENV_RATE_LIMIT_BYPASS_HEADER: &str = "PAGETALLY_RATE_LIMIT_BYPASS_HEADER";

/// Explicit client IP header set by trusted proxies
pub const HEADER_REAL_IP: &str = "X-Real-IP";

/// Comma-separated proxy chain header
pub const HEADER_FORWARDED_FOR: &str = "X-Forwarded-For";

// =============================================================================
// Admin
// =============================================================================

pub const ENV_ADMIN_TOKEN: &str = "PAGETALLY_ADMIN_TOKEN";
