//! Output module for persisting crawl results
//!
//! This module handles:
//! - Exporting full page records as JSON
//! - Exporting per-page summaries as CSV
//! - Displaying session statistics

mod csv_output;
mod json;
pub mod stats;
mod traits;

pub use csv_output::{write_csv, CsvOutputHandler};
pub use json::{write_json, JsonOutputHandler};
pub use stats::{format_statistics, print_statistics};
pub use traits::{OutputError, OutputHandler, OutputResult};

use crate::config::OutputConfig;
use crate::crawler::PageRecord;

/// Builds one handler per destination named in the output configuration
pub fn handlers_for(config: &OutputConfig) -> Vec<Box<dyn OutputHandler>> {
    let mut handlers: Vec<Box<dyn OutputHandler>> = Vec::new();
    if let Some(path) = &config.json_path {
        handlers.push(Box::new(JsonOutputHandler::new(path)));
    }
    if let Some(path) = &config.csv_path {
        handlers.push(Box::new(CsvOutputHandler::new(path)));
    }
    handlers
}

/// Writes `pages` to every configured destination
///
/// Every destination is attempted even if an earlier one fails, so one bad
/// path does not cost the other outputs.
///
/// # Returns
///
/// * `Ok(n)` - Number of destinations written
/// * `Err(OutputError)` - The first destination that could not be written
pub fn persist(pages: &[PageRecord], config: &OutputConfig) -> OutputResult<usize> {
    let handlers = handlers_for(config);
    let mut first_error = None;

    for handler in &handlers {
        match handler.write_pages(pages) {
            Ok(()) => tracing::info!(
                destination = %handler.describe(),
                pages = pages.len(),
                "Wrote crawl output"
            ),
            Err(e) => {
                tracing::error!(
                    destination = %handler.describe(),
                    "Failed to write crawl output: {}",
                    e
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(handlers.len()),
    }
}
