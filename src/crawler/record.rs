//! Structured results of a crawl

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Metadata keys every [`PageRecord`] carries, present even when empty
pub const METADATA_KEYS: [&str; 5] = ["description", "keywords", "author", "viewport", "charset"];

/// The structured result of extracting one fetched document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub title: String,

    /// URL the page was requested as (normalized frontier form)
    pub url: String,

    pub timestamp: DateTime<Utc>,

    /// Visible body text, whitespace collapsed
    pub text: String,

    /// Unmodified document body; dropped unless `keep-raw-html` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,

    /// Anchors in document order, one entry per resolvable anchor
    pub links: Vec<LinkRecord>,

    pub images: Vec<ImageRecord>,

    /// Always holds every key of [`METADATA_KEYS`]
    pub metadata: BTreeMap<String, String>,

    pub status_code: u16,
    pub content_type: String,
}

/// One anchor element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub text: String,
    pub absolute_url: String,
    pub title: String,
    pub target: String,
}

/// One image element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub absolute_src: String,
    pub alt: String,
    pub title: String,
    pub width: String,
    pub height: String,
}

impl PageRecord {
    /// Number of extracted links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Number of extracted images
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Metadata value for `key`, empty if unknown
    pub fn meta(&self, key: &str) -> &str {
        self.metadata.get(key).map(String::as_str).unwrap_or("")
    }
}
