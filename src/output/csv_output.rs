//! CSV export of page summaries

use crate::crawler::PageRecord;
use crate::output::traits::{OutputHandler, OutputResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One CSV line per page
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    url: &'a str,
    title: &'a str,
    timestamp: String,
    status_code: u16,
    link_count: usize,
    image_count: usize,
}

impl<'a> From<&'a PageRecord> for CsvRow<'a> {
    fn from(page: &'a PageRecord) -> Self {
        Self {
            url: &page.url,
            title: &page.title,
            timestamp: page.timestamp.to_rfc3339(),
            status_code: page.status_code,
            link_count: page.link_count(),
            image_count: page.image_count(),
        }
    }
}

/// Writes one summary row per page
///
/// Columns: `url,title,timestamp,status_code,link_count,image_count`. The
/// header row is written even when `pages` is empty.
pub fn write_csv(pages: &[PageRecord], output_path: &Path) -> OutputResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(output_path)?;

    writer.write_record([
        "url",
        "title",
        "timestamp",
        "status_code",
        "link_count",
        "image_count",
    ])?;
    for page in pages {
        writer.serialize(CsvRow::from(page))?;
    }
    writer.flush()?;
    Ok(())
}

/// Output handler writing a CSV file
pub struct CsvOutputHandler {
    path: PathBuf,
}

impl CsvOutputHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputHandler for CsvOutputHandler {
    fn describe(&self) -> String {
        format!("CSV {}", self.path.display())
    }

    fn write_pages(&self, pages: &[PageRecord]) -> OutputResult<()> {
        write_csv(pages, &self.path)
    }
}
