//! Crawl engine
//!
//! This module contains the core crawling logic, including:
//! - Frontier and visited-set bookkeeping
//! - Retry with linear backoff around fetch attempts
//! - HTML extraction into page records
//! - Session orchestration and the event stream

mod events;
mod extract;
mod frontier;
mod record;
mod retry;
mod session;

pub use events::CrawlEvent;
pub use extract::{extract, extract_at, UNTITLED};
pub use frontier::{Frontier, FrontierEntry};
pub use record::{ImageRecord, LinkRecord, PageRecord, METADATA_KEYS};
pub use retry::{with_retry, Attempted, RetryPolicy};
pub use session::{CrawlOutcome, CrawlSession, CrawlStats, FailedUrl};

use crate::config::CrawlConfig;

/// Runs a complete crawl from `seed`
///
/// This is the main entry point for a one-shot crawl. It will:
/// 1. Build the fetch strategy named in the config
/// 2. Resolve authentication
/// 3. Fetch, extract and follow links breadth-first within the bounds
/// 4. Return the collected records and failures
///
/// Use [`CrawlSession`] directly to attach an event channel or a
/// cancellation token.
///
/// # Errors
///
/// Fails only on session preconditions: an invalid seed, client construction,
/// or authentication.
pub async fn crawl(config: CrawlConfig, seed: &str) -> crate::Result<CrawlOutcome> {
    CrawlSession::new(config)?.run(seed).await
}
