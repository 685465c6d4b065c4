pub const SCHEMA: &str = r#"
-- Discovered machines ("metadata" in agent payloads)
CREATE TABLE IF NOT EXISTS metadata (
    id TEXT PRIMARY KEY,
    hostname TEXT NOT NULL DEFAULT '',
    os TEXT NOT NULL DEFAULT '',
    arch TEXT NOT NULL DEFAULT '',
    num_cpu INTEGER NOT NULL DEFAULT 0,
    kernel TEXT NOT NULL DEFAULT '',
    uptime TEXT NOT NULL DEFAULT '',
    total_memory_mb INTEGER NOT NULL DEFAULT 0,
    total_disk_size_gb TEXT NOT NULL DEFAULT '',
    mounted_count INTEGER NOT NULL DEFAULT 0,
    timestamp_utc TEXT NOT NULL DEFAULT '',
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Logical groupings of servers
CREATE TABLE IF NOT EXISTS apps (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    identifier TEXT NOT NULL UNIQUE,   -- slug form
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Many-to-many relationship between apps and servers
CREATE TABLE IF NOT EXISTS app_servers (
    app_id TEXT NOT NULL REFERENCES apps(id) ON UPDATE CASCADE ON DELETE CASCADE,
    metadata_id TEXT NOT NULL REFERENCES metadata(id) ON UPDATE CASCADE ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (app_id, metadata_id)
);

CREATE INDEX IF NOT EXISTS idx_metadata_timestamp_utc ON metadata(timestamp_utc);
CREATE INDEX IF NOT EXISTS idx_app_servers_metadata ON app_servers(metadata_id);
"#;
