//! Storage module for persisting discovery runs
//!
//! This module keeps a history of discovery runs in SQLite:
//! - One row per run with its outcome
//! - A snapshot of every sitemap document, with the content hash of the
//!   previous snapshot of the same URL for change detection
//! - The ranked URL list of each run

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{init_database, SqliteStorage};
pub use traits::{Storage, StorageError, StorageResult};

use crate::discovery::DiscoveryReport;
use crate::DiscoveryError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(DiscoveryError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, DiscoveryError> {
    SqliteStorage::new(path)
}

/// Represents a discovery run in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub domain: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub total_urls: u64,
}

/// Status of a discovery run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// How a sitemap compares to its previous snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// First snapshot with content for this URL
    New,
    /// Content hash differs from the previous snapshot
    Modified,
    /// Content hash matches the previous snapshot
    Unchanged,
    /// The sitemap could not be fetched in this run
    Unavailable,
}

impl ChangeStatus {
    /// Compares the content hash of this run with the previous one
    pub fn compare(previous_hash: Option<&str>, content_hash: Option<&str>) -> Self {
        match (previous_hash, content_hash) {
            (_, None) => Self::Unavailable,
            (None, Some(_)) => Self::New,
            (Some(prev), Some(curr)) if prev == curr => Self::Unchanged,
            (Some(_), Some(_)) => Self::Modified,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Self::New | Self::Modified)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Modified => "modified",
            Self::Unchanged => "unchanged",
            Self::Unavailable => "unavailable",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "modified" => Some(Self::Modified),
            "unchanged" => Some(Self::Unchanged),
            "unavailable" => Some(Self::Unavailable),
            _ => None,
        }
    }
}

/// A stored sitemap snapshot
#[derive(Debug, Clone)]
pub struct SnapshotRecord {
    pub run_id: i64,
    pub url: String,
    pub content_hash: Option<String>,
    pub previous_hash: Option<String>,
    pub status: ChangeStatus,
    pub url_count: u64,
}

/// Outcome of persisting one report
#[derive(Debug, Clone)]
pub struct PersistedRun {
    pub run_id: i64,
    pub snapshots: Vec<SnapshotRecord>,
    pub urls_written: usize,
}

impl PersistedRun {
    /// Snapshots whose content is new or modified
    pub fn changed(&self) -> impl Iterator<Item = &SnapshotRecord> {
        self.snapshots.iter().filter(|s| s.status.is_changed())
    }
}

/// Writes a finished report as one run
///
/// The run row is created first; the sitemap snapshots and ranked URLs are
/// then written in one transaction. If that write fails, none of its rows
/// are kept and the run is marked failed before the error is returned.
///
/// # Arguments
///
/// * `storage` - The storage backend
/// * `report` - The finished discovery report
/// * `config_hash` - Hash of the configuration the run used
pub fn persist_report<S: Storage + ?Sized>(
    storage: &mut S,
    report: &DiscoveryReport,
    config_hash: &str,
) -> StorageResult<PersistedRun> {
    let run_id = storage.create_run(&report.domain, config_hash)?;

    match storage.write_run(run_id, report) {
        Ok((snapshots, urls_written)) => {
            storage.complete_run(run_id, report)?;
            tracing::info!(
                "Stored run {}: {} snapshot(s), {} URL(s)",
                run_id,
                snapshots.len(),
                urls_written
            );
            Ok(PersistedRun {
                run_id,
                snapshots,
                urls_written,
            })
        }
        Err(e) => {
            tracing::warn!("Failed to store run {}: {}", run_id, e);
            storage.update_run_status(run_id, RunStatus::Failed)?;
            Err(e)
        }
    }
}
