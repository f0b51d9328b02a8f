//! Output handler traits and types
//!
//! This module defines the trait interface for output handlers and the
//! errors they report.

use crate::crawler::PageRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for output handlers
///
/// An output handler persists the page records of a finished (or cancelled)
/// session to one destination.
pub trait OutputHandler {
    /// Short description used in logs, e.g. `JSON pages.json`
    fn describe(&self) -> String;

    /// Writes all records, replacing any earlier content of the destination
    ///
    /// # Arguments
    ///
    /// * `pages` - The collected page records, in collection order
    fn write_pages(&self, pages: &[PageRecord]) -> OutputResult<()>;
}
