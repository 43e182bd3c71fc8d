//! Database schema definitions
//!
//! This module contains the SQL schema for the discovery snapshot database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per discovery run
CREATE TABLE IF NOT EXISTS discovery_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    generated_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    total_urls INTEGER NOT NULL DEFAULT 0,
    sitemaps_found INTEGER NOT NULL DEFAULT 0,
    sitemaps_failed INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_discovery_runs_domain ON discovery_runs(domain);

-- Every sitemap document seen by a run
CREATE TABLE IF NOT EXISTS sitemap_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES discovery_runs(id),
    url TEXT NOT NULL,
    depth INTEGER NOT NULL,
    sitemap_type TEXT,
    accessible INTEGER NOT NULL,
    http_status INTEGER,
    content_hash TEXT,
    previous_hash TEXT,
    change_status TEXT NOT NULL,
    changed INTEGER NOT NULL DEFAULT 0,
    url_count INTEGER NOT NULL DEFAULT 0,
    child_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE(run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_sitemap_snapshots_url ON sitemap_snapshots(url);

-- Ranked URLs of a run
CREATE TABLE IF NOT EXISTS discovered_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES discovery_runs(id),
    url TEXT NOT NULL,
    rank INTEGER NOT NULL,
    calculated_priority REAL NOT NULL,
    declared_priority REAL,
    changefreq TEXT,
    lastmod TEXT,
    source_sitemap TEXT,
    sources TEXT NOT NULL,
    depth INTEGER NOT NULL,
    UNIQUE(run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_discovered_urls_run ON discovered_urls(run_id);
"#;

/// Initializes the database schema
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
