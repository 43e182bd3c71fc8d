//! Output module for discovery reports
//!
//! This module handles:
//! - Writing the JSON report consumed by the scan pipeline
//! - Generating markdown summaries of a run
//! - Printing run statistics to the console

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{format_statistics, print_statistics};

use crate::discovery::DiscoveryReport;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Serializes a report as pretty-printed JSON
pub fn report_to_json(report: &DiscoveryReport) -> OutputResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Writes a report as pretty-printed JSON
///
/// Missing parent directories are created.
///
/// # Arguments
///
/// * `report` - The discovery report
/// * `output_path` - Path of the JSON file
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to serialize or write the report
pub fn write_json_report(report: &DiscoveryReport, output_path: &Path) -> OutputResult<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!("Wrote report to {}", output_path.display());
    Ok(())
}

/// Reads a report written by [`write_json_report`]
pub fn read_json_report(path: &Path) -> OutputResult<DiscoveryReport> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
