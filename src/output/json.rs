//! JSON export of page records

use crate::crawler::PageRecord;
use crate::output::traits::{OutputHandler, OutputResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes `pages` as a pretty-printed JSON array of full records
///
/// # Arguments
///
/// * `pages` - The page records to write
/// * `output_path` - Destination file, created or truncated
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the file
/// * `Err(OutputError)` - Failed to create or write the file
pub fn write_json(pages: &[PageRecord], output_path: &Path) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, pages)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Output handler writing a JSON file
pub struct JsonOutputHandler {
    path: PathBuf,
}

impl JsonOutputHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputHandler for JsonOutputHandler {
    fn describe(&self) -> String {
        format!("JSON {}", self.path.display())
    }

    fn write_pages(&self, pages: &[PageRecord]) -> OutputResult<()> {
        write_json(pages, &self.path)
    }
}
