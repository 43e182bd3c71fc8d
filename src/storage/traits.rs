//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::discovery::{DiscoveredUrl, DiscoveryReport};
use crate::sitemap::SitemapDocument;
use crate::storage::{RunRecord, RunStatus, SnapshotRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new discovery run for `domain`
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, domain: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run for `domain`
    fn get_latest_run(&self, domain: &str) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed and records its totals
    fn complete_run(&mut self, run_id: i64, report: &DiscoveryReport) -> StorageResult<()>;

    // ===== Sitemap Snapshots =====

    /// Records a sitemap document for a run
    ///
    /// The previous hash is taken from the most recent snapshot of the same
    /// URL written by an earlier run.
    fn record_snapshot(
        &mut self,
        run_id: i64,
        document: &SitemapDocument,
    ) -> StorageResult<SnapshotRecord>;

    /// Gets the most recent snapshot of a sitemap URL
    fn latest_snapshot(&self, url: &str) -> StorageResult<Option<SnapshotRecord>>;

    /// Gets all snapshots of a run
    fn get_snapshots(&self, run_id: i64) -> StorageResult<Vec<SnapshotRecord>>;

    // ===== Discovered URLs =====

    /// Stores the ranked URLs of a run
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn insert_urls(&mut self, run_id: i64, urls: &[DiscoveredUrl]) -> StorageResult<usize>;

    /// Gets the stored URLs of a run in rank order
    fn get_run_urls(&self, run_id: i64) -> StorageResult<Vec<String>>;

    /// Counts the stored URLs of a run
    fn count_urls(&self, run_id: i64) -> StorageResult<u64>;

    // ===== Whole runs =====

    /// Writes every sitemap snapshot and ranked URL of a report atomically
    ///
    /// Either all rows land or none do.
    ///
    /// # Returns
    ///
    /// The snapshot records and the number of URL rows written
    fn write_run(
        &mut self,
        run_id: i64,
        report: &DiscoveryReport,
    ) -> StorageResult<(Vec<SnapshotRecord>, usize)>;
}
