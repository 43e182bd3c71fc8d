//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::discovery::{DiscoveredUrl, DiscoveryReport};
use crate::sitemap::SitemapDocument;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ChangeStatus, RunRecord, RunStatus, SnapshotRecord};
use crate::DiscoveryError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, domain, started_at, finished_at, config_hash, status, total_urls";

const SNAPSHOT_COLUMNS: &str =
    "run_id, url, content_hash, previous_hash, change_status, url_count";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(DiscoveryError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, DiscoveryError> {
        let conn = init_database(path)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, DiscoveryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        domain: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Failed),
        total_urls: row.get::<_, i64>(6)? as u64,
    })
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRecord> {
    Ok(SnapshotRecord {
        run_id: row.get(0)?,
        url: row.get(1)?,
        content_hash: row.get(2)?,
        previous_hash: row.get(3)?,
        status: ChangeStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(ChangeStatus::Unavailable),
        url_count: row.get::<_, i64>(5)? as u64,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, domain: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO discovery_runs (domain, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![domain, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM discovery_runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self, domain: &str) -> StorageResult<Option<RunRecord>> {
        let sql = format!(
            "SELECT {} FROM discovery_runs WHERE domain = ?1 ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        );
        let run = self
            .conn
            .query_row(&sql, params![domain], run_from_row)
            .optional()?;
        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE discovery_runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64, report: &DiscoveryReport) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE discovery_runs
             SET status = ?1, finished_at = ?2, generated_at = ?3, total_urls = ?4,
                 sitemaps_found = ?5, sitemaps_failed = ?6
             WHERE id = ?7",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                report.generated_at.to_rfc3339(),
                report.total_urls as i64,
                report.statistics.resolver.sitemaps_found as i64,
                report.statistics.resolver.sitemaps_failed as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Sitemap Snapshots =====

    fn record_snapshot(
        &mut self,
        run_id: i64,
        document: &SitemapDocument,
    ) -> StorageResult<SnapshotRecord> {
        record_snapshot_with(&self.conn, run_id, document)
    }

    fn latest_snapshot(&self, url: &str) -> StorageResult<Option<SnapshotRecord>> {
        let sql = format!(
            "SELECT {} FROM sitemap_snapshots WHERE url = ?1 ORDER BY run_id DESC LIMIT 1",
            SNAPSHOT_COLUMNS
        );
        let snapshot = self
            .conn
            .query_row(&sql, params![url], snapshot_from_row)
            .optional()?;
        Ok(snapshot)
    }

    fn get_snapshots(&self, run_id: i64) -> StorageResult<Vec<SnapshotRecord>> {
        let sql = format!(
            "SELECT {} FROM sitemap_snapshots WHERE run_id = ?1 ORDER BY id",
            SNAPSHOT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let snapshots = stmt
            .query_map(params![run_id], snapshot_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(snapshots)
    }

    // ===== Discovered URLs =====

    fn insert_urls(&mut self, run_id: i64, urls: &[DiscoveredUrl]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let written = insert_urls_with(&tx, run_id, urls)?;
        tx.commit()?;
        Ok(written)
    }

    fn get_run_urls(&self, run_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM discovered_urls WHERE run_id = ?1 ORDER BY rank")?;
        let urls = stmt
            .query_map(params![run_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    fn count_urls(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM discovered_urls WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Whole runs =====

    fn write_run(
        &mut self,
        run_id: i64,
        report: &DiscoveryReport,
    ) -> StorageResult<(Vec<SnapshotRecord>, usize)> {
        // Dropping the transaction on error rolls every row back
        let tx = self.conn.transaction()?;
        let mut snapshots = Vec::with_capacity(report.sitemaps.len());
        for document in &report.sitemaps {
            snapshots.push(record_snapshot_with(&tx, run_id, document)?);
        }
        let urls_written = insert_urls_with(&tx, run_id, &report.urls)?;
        tx.commit()?;
        Ok((snapshots, urls_written))
    }
}

fn record_snapshot_with(
    conn: &Connection,
    run_id: i64,
    document: &SitemapDocument,
) -> StorageResult<SnapshotRecord> {
    // Last known content, skipping runs where the sitemap was unavailable
    let previous_hash: Option<String> = conn
        .query_row(
            "SELECT content_hash FROM sitemap_snapshots
             WHERE url = ?1 AND run_id < ?2 AND content_hash IS NOT NULL
             ORDER BY run_id DESC LIMIT 1",
            params![document.url, run_id],
            |row| row.get(0),
        )
        .optional()?;

    let status = ChangeStatus::compare(
        previous_hash.as_deref(),
        document.content_hash.as_deref(),
    );

    conn.execute(
        "INSERT INTO sitemap_snapshots
         (run_id, url, depth, sitemap_type, accessible, http_status, content_hash,
          previous_hash, change_status, changed, url_count, child_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            run_id,
            document.url,
            document.depth as i64,
            document.sitemap_type.map(|t| t.as_str()),
            document.accessible,
            document.http_status,
            document.content_hash,
            previous_hash,
            status.to_db_string(),
            status.is_changed(),
            document.url_count as i64,
            document.child_count as i64
        ],
    )?;

    if status == ChangeStatus::Modified {
        tracing::debug!("Sitemap {} changed since the previous run", document.url);
    }

    Ok(SnapshotRecord {
        run_id,
        url: document.url.clone(),
        content_hash: document.content_hash.clone(),
        previous_hash,
        status,
        url_count: document.url_count as u64,
    })
}

fn insert_urls_with(conn: &Connection, run_id: i64, urls: &[DiscoveredUrl]) -> StorageResult<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO discovered_urls
         (run_id, url, rank, calculated_priority, declared_priority, changefreq,
          lastmod, source_sitemap, sources, depth)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;

    for (rank, url) in urls.iter().enumerate() {
        let sources = serde_json::to_string(&url.sources)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        stmt.execute(params![
            run_id,
            url.url,
            rank as i64,
            url.calculated_priority,
            url.priority,
            url.changefreq.map(|c| c.as_str()),
            url.lastmod.map(|t| t.to_rfc3339()),
            url.source_sitemap,
            sources,
            url.depth as i64
        ])?;
    }
    Ok(urls.len())
}

/// Initializes the database at the given path
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(Connection)` - Successfully opened/created database
/// * `Err(rusqlite::Error)` - Failed to open database
pub fn init_database(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}
