//! Per-origin robots.txt cache entries

use crate::robots::ParsedRobots;
use chrono::{DateTime, Utc};

/// Cached robots.txt rules for one origin
///
/// Entries live for the whole session; they are never refreshed.
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// Origin the rules apply to (`scheme://host[:port]`)
    pub origin: String,

    /// The parsed robots.txt content
    pub rules: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a cache entry stamped with the current time
    pub fn new(origin: impl Into<String>, rules: ParsedRobots) -> Self {
        Self {
            origin: origin.into(),
            rules,
            fetched_at: Utc::now(),
        }
    }

    /// Creates the permissive entry used when robots.txt is unavailable
    pub fn permissive(origin: impl Into<String>) -> Self {
        Self::new(origin, ParsedRobots::allow_all())
    }

    /// Checks if a URL is allowed according to the cached rules
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.rules.is_allowed(url, user_agent)
    }
}
