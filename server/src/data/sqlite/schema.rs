//! SQLite schema definitions

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    execution_time_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1
);

-- =============================================================================
-- Domains: tracking state and manual UV adjustment per normalized host
-- =============================================================================
CREATE TABLE IF NOT EXISTS domains (
    host TEXT PRIMARY KEY CHECK(length(host) >= 1 AND length(host) <= 253),
    verified INTEGER NOT NULL DEFAULT 0 CHECK(verified IN (0, 1)),
    tracked INTEGER NOT NULL DEFAULT 0 CHECK(tracked IN (0, 1)),
    uv_adjustment INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_domains_tracked ON domains(verified, tracked);
"#;
