//! Crawl session orchestration
//!
//! A [`CrawlSession`] owns everything one crawl needs:
//! - The frontier and visited set
//! - The fetch strategy, robots gate and auth resolver
//! - The cancellation token and optional event channel
//!
//! Traversal is breadth-first. Each depth level is processed by up to
//! `concurrency` workers; a worker runs the whole per-URL pipeline (robots
//! check, fetch with retry, extraction, child admission, politeness delay).

use crate::auth::{build_login_client, AuthContext, AuthResolver};
use crate::config::CrawlConfig;
use crate::crawler::events::{CrawlEvent, EventSink};
use crate::crawler::extract::extract;
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::record::PageRecord;
use crate::crawler::retry::{with_retry, RetryPolicy};
use crate::fetch::{build_strategy, FetchStrategy};
use crate::robots::{build_robots_client, RobotsGate};
use crate::state::PageState;
use crate::url::normalize_url;
use crate::{FetchError, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A URL whose fetch never succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUrl {
    pub url: String,
    pub depth: u32,
    pub error: FetchError,
    pub attempts: u32,
}

/// Summary counts of a finished session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub total_pages: usize,
    pub total_links: usize,
    pub total_images: usize,
    /// URLs a worker started on (fetched, blocked or failed)
    pub visited_count: usize,
    pub failed_count: usize,
    pub blocked_count: usize,
}

/// Everything a session produced, including partial results of a
/// cancelled session
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub pages: Vec<PageRecord>,
    pub failures: Vec<FailedUrl>,
    /// URLs denied by robots.txt
    pub blocked: Vec<String>,
    pub stats: CrawlStats,
    pub cancelled: bool,
}

enum JobOutcome {
    Page(PageRecord),
    Blocked(String),
    Failed(FailedUrl),
    /// Not started because the session was cancelled
    Skipped,
}

/// One bounded crawl
pub struct CrawlSession {
    config: Arc<CrawlConfig>,
    strategy: Arc<dyn FetchStrategy>,
    robots: Option<RobotsGate>,
    auth: AuthResolver,
    frontier: Frontier,
    cancel: CancellationToken,
    events: EventSink,
}

impl CrawlSession {
    /// Creates a session using the fetch strategy named in the config
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::Http` if an HTTP client cannot be built.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let strategy = build_strategy(&config)?;
        Self::with_strategy(config, strategy)
    }

    /// Creates a session with an explicit fetch strategy
    pub fn with_strategy(config: CrawlConfig, strategy: Arc<dyn FetchStrategy>) -> Result<Self> {
        let crawler = &config.crawler;
        let timeout = Duration::from_millis(crawler.timeout_ms);

        let robots = if crawler.respect_robots {
            Some(RobotsGate::new(
                build_robots_client(&crawler.user_agent, timeout)?,
                crawler.user_agent.clone(),
            ))
        } else {
            None
        };

        let auth = AuthResolver::new(
            config.auth.clone(),
            build_login_client(&crawler.user_agent, timeout)?,
        );
        let frontier = Frontier::new(crawler.max_depth, crawler.max_pages as usize);

        Ok(Self {
            config: Arc::new(config),
            strategy,
            robots,
            auth,
            frontier,
            cancel: CancellationToken::new(),
            events: EventSink::default(),
        })
    }

    /// Streams [`CrawlEvent`]s of this session to `sender`
    pub fn with_events(mut self, sender: UnboundedSender<CrawlEvent>) -> Self {
        self.events = EventSink::new(sender);
        self
    }

    /// Token that stops the session when cancelled
    ///
    /// In-flight fetches abort, no new work starts, and `run` returns the
    /// partial outcome with `cancelled` set.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawls from `seed` until the frontier is exhausted or the session is
    /// cancelled
    ///
    /// # Errors
    ///
    /// * `HarvestError::Url` - the seed is not a valid http(s) URL
    /// * `HarvestError::Auth` - credentials are missing or the login failed;
    ///   no page fetch has been issued in that case
    ///
    /// Per-URL failures never surface here; they are listed in the outcome.
    pub async fn run(self, seed: &str) -> Result<CrawlOutcome> {
        let seed_url = normalize_url(seed)?;
        let crawler = &self.config.crawler;

        tracing::info!(
            "Starting crawl of {} (max depth {}, max pages {}, {} workers)",
            seed_url,
            crawler.max_depth,
            crawler.max_pages,
            crawler.concurrency
        );
        self.events.emit(CrawlEvent::SessionStarted {
            seed: seed_url.to_string(),
            max_depth: crawler.max_depth,
            max_pages: crawler.max_pages,
        });

        let mode = self.config.auth.mode_name();
        if self.auth.requires_login() {
            tracing::info!("Logging in before the first fetch");
        }
        let resolved = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            resolved = self.auth.context() => Some(resolved),
        };
        let auth = match resolved {
            None => {
                tracing::info!("Crawl cancelled before authentication completed");
                return Ok(self.finish(Vec::new()));
            }
            Some(Ok(context)) => {
                tracing::info!("Authentication resolved ({} mode)", mode);
                self.events.emit(CrawlEvent::AuthResolved { mode });
                context
            }
            Some(Err(e)) => {
                tracing::error!("Authentication failed ({} mode): {}", mode, e);
                self.events.emit(CrawlEvent::AuthFailed {
                    mode,
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        self.frontier.admit(seed_url.as_str(), 0, None);

        let concurrency = crawler.concurrency.max(1) as usize;
        let mut outcomes = Vec::new();

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Crawl cancelled, stopping");
                break;
            }

            let level = self.frontier.take_level();
            let Some(first) = level.first() else {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            };
            tracing::info!("Crawling depth {} ({} URLs)", first.depth, level.len());

            let mut jobs = stream::iter(level)
                .map(|entry| self.process(entry, &auth))
                .buffer_unordered(concurrency);
            while let Some(outcome) = jobs.next().await {
                outcomes.push(outcome);
            }
        }

        Ok(self.finish(outcomes))
    }

    /// Runs the per-URL pipeline for one frontier entry
    async fn process(&self, entry: FrontierEntry, auth: &AuthContext) -> JobOutcome {
        if self.cancel.is_cancelled() {
            return JobOutcome::Skipped;
        }

        if let Err(e) = self.frontier.start(&entry.url) {
            tracing::warn!("Skipping {}: {}", entry.url, e);
            return JobOutcome::Skipped;
        }

        tracing::info!("Fetching {} (depth {})", entry.url, entry.depth);
        self.events.emit(CrawlEvent::JobStarted {
            url: entry.url.to_string(),
            depth: entry.depth,
        });

        if let Some(robots) = &self.robots {
            let allowed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                allowed = robots.is_allowed(&entry.url) => Some(allowed),
            };
            match allowed {
                None => return self.fail(&entry, FetchError::Cancelled, 0),
                Some(false) => return self.block(&entry),
                Some(true) => {}
            }
        }

        let crawler = &self.config.crawler;
        let policy = RetryPolicy::new(
            crawler.max_retries,
            Duration::from_millis(crawler.retry_delay_ms),
        );

        let strategy = &self.strategy;
        let cancel = &self.cancel;
        let url = &entry.url;
        let attempted = with_retry(policy, cancel, move |attempt| {
            tracing::debug!("Fetching {} (attempt {})", url, attempt);
            strategy.fetch(url, auth, cancel)
        })
        .await;

        let outcome = match attempted.result {
            Ok(document) => {
                let mut record = extract(&document, &entry.url);
                if !crawler.keep_raw_html {
                    record.raw_html = None;
                }
                self.succeed(&entry, record)
            }
            Err(FetchError::Cancelled) => {
                return self.fail(&entry, FetchError::Cancelled, attempted.attempts)
            }
            Err(error) => self.fail(&entry, error, attempted.attempts),
        };

        self.politeness_delay(&entry.url).await;
        outcome
    }

    fn succeed(&self, entry: &FrontierEntry, record: PageRecord) -> JobOutcome {
        if let Err(e) = self.frontier.finish(&entry.url, PageState::Succeeded) {
            tracing::warn!("{}", e);
        }

        let child_depth = entry.depth + 1;
        let admitted = record
            .links
            .iter()
            .filter(|link| {
                self.frontier
                    .admit(&link.absolute_url, child_depth, Some(&entry.url))
            })
            .count();

        tracing::info!(
            "Fetched {} ({}, {} links, {} new)",
            entry.url,
            record.status_code,
            record.link_count(),
            admitted
        );
        self.events.emit(CrawlEvent::JobSucceeded {
            url: entry.url.to_string(),
            status_code: record.status_code,
            links: record.link_count(),
            admitted,
        });

        JobOutcome::Page(record)
    }

    fn block(&self, entry: &FrontierEntry) -> JobOutcome {
        if let Err(e) = self.frontier.finish(&entry.url, PageState::Blocked) {
            tracing::warn!("{}", e);
        }
        tracing::warn!("Blocked by robots.txt: {}", entry.url);
        self.events.emit(CrawlEvent::JobBlocked {
            url: entry.url.to_string(),
        });
        JobOutcome::Blocked(entry.url.to_string())
    }

    fn fail(&self, entry: &FrontierEntry, error: FetchError, attempts: u32) -> JobOutcome {
        if let Err(e) = self.frontier.finish(&entry.url, PageState::Failed) {
            tracing::warn!("{}", e);
        }

        if error == FetchError::Cancelled {
            tracing::info!("Fetch of {} cancelled", entry.url);
        } else {
            tracing::warn!(
                "Failed to fetch {} after {} attempt(s): {}",
                entry.url,
                attempts,
                error
            );
        }
        self.events.emit(CrawlEvent::JobFailed {
            url: entry.url.to_string(),
            attempts,
            error: error.clone(),
        });

        JobOutcome::Failed(FailedUrl {
            url: entry.url.to_string(),
            depth: entry.depth,
            error,
            attempts,
        })
    }

    /// Waits `max(delay-ms, robots Crawl-delay)` unless cancelled
    async fn politeness_delay(&self, url: &Url) {
        let mut delay = Duration::from_millis(self.config.crawler.delay_ms);
        if let Some(robots) = &self.robots {
            if let Some(crawl_delay) = robots.crawl_delay(url).await {
                delay = delay.max(crawl_delay);
            }
        }

        if delay.is_zero() {
            return;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }

    fn finish(&self, outcomes: Vec<JobOutcome>) -> CrawlOutcome {
        let mut pages = Vec::new();
        let mut failures = Vec::new();
        let mut blocked = Vec::new();

        for outcome in outcomes {
            match outcome {
                JobOutcome::Page(record) => pages.push(record),
                JobOutcome::Blocked(url) => blocked.push(url),
                JobOutcome::Failed(failed) => failures.push(failed),
                JobOutcome::Skipped => {}
            }
        }

        let stats = CrawlStats {
            total_pages: pages.len(),
            total_links: pages.iter().map(PageRecord::link_count).sum(),
            total_images: pages.iter().map(PageRecord::image_count).sum(),
            visited_count: self.frontier.visited_count(),
            failed_count: failures.len(),
            blocked_count: blocked.len(),
        };
        let cancelled = self.cancel.is_cancelled();

        let mut states: Vec<_> = self.frontier.state_counts().into_iter().collect();
        states.sort_by(|a, b| b.1.cmp(&a.1));
        tracing::debug!("Frontier states at finish: {:?}", states);

        tracing::info!(
            "Crawl finished: {} pages, {} failed, {} blocked{}",
            stats.total_pages,
            stats.failed_count,
            stats.blocked_count,
            if cancelled { " (cancelled)" } else { "" }
        );
        self.events.emit(CrawlEvent::SessionFinished {
            pages: stats.total_pages,
            failed: stats.failed_count,
            blocked: stats.blocked_count,
            cancelled,
        });

        CrawlOutcome {
            pages,
            failures,
            blocked,
            stats,
            cancelled,
        }
    }
}
