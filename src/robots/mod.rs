//! Robots.txt handling module
//!
//! The [`RobotsGate`] answers allow/deny for URLs. It fetches
//! `{scheme}://{host}/robots.txt` the first time an origin is seen and caches
//! the result for the rest of the session. Any failure to obtain or read the
//! file caches a permissive entry: robots.txt trouble never blocks a crawl.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use crate::url::{origin_key, robots_url};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use url::Url;

/// Upper bound applied to any `Crawl-delay` a site requests
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60);

/// Session-scoped robots.txt compliance gate
pub struct RobotsGate {
    client: Client,
    user_agent: String,
    entries: Mutex<HashMap<String, Arc<OnceCell<CachedRobots>>>>,
    fetches: AtomicUsize,
}

impl RobotsGate {
    /// Creates a gate that fetches robots.txt with `client`
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            entries: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Checks whether `url` may be fetched
    ///
    /// URLs without a host cannot be attributed to any robots.txt and are allowed.
    pub async fn is_allowed(&self, url: &Url) -> bool {
        match self.rules_for(url).await {
            Some(cached) => cached.is_allowed(url.as_str(), &self.user_agent),
            None => true,
        }
    }

    /// Returns the `Crawl-delay` the origin of `url` requests from us, if any
    ///
    /// Values are capped at [`MAX_CRAWL_DELAY`]; values too large to be a
    /// `Duration` at all are capped the same way.
    pub async fn crawl_delay(&self, url: &Url) -> Option<Duration> {
        let cached = self.rules_for(url).await?;
        let secs = cached
            .rules
            .crawl_delay(&self.user_agent)
            .filter(|secs| secs.is_finite() && *secs > 0.0)?;

        let delay = Duration::try_from_secs_f64(secs).unwrap_or(MAX_CRAWL_DELAY);
        if delay > MAX_CRAWL_DELAY {
            tracing::debug!(
                "Crawl-delay of {}s for {} capped at {}s",
                secs,
                cached.origin,
                MAX_CRAWL_DELAY.as_secs()
            );
        }
        Some(delay.min(MAX_CRAWL_DELAY))
    }

    /// Number of robots.txt requests issued so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Returns the cached rules for the origin of `url`, fetching them once
    ///
    /// Concurrent first lookups for the same origin wait on one shared cell,
    /// so only a single request goes out.
    pub async fn rules_for(&self, url: &Url) -> Option<CachedRobots> {
        let origin = origin_key(url)?;

        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(origin.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let cached = cell
            .get_or_init(|| async {
                match robots_url(url) {
                    Some(location) => self.fetch(&origin, &location).await,
                    None => CachedRobots::permissive(origin.clone()),
                }
            })
            .await;

        Some(cached.clone())
    }

    async fn fetch(&self, origin: &str, location: &Url) -> CachedRobots {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Fetching robots.txt from {}", location);

        let response = match self.client.get(location.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("robots.txt unavailable for {}: {}; allowing all", origin, e);
                return CachedRobots::permissive(origin);
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(
                "robots.txt for {} returned HTTP {}; allowing all",
                origin,
                status.as_u16()
            );
            return CachedRobots::permissive(origin);
        }

        match response.text().await {
            Ok(body) => CachedRobots::new(origin, ParsedRobots::from_content(&body)),
            Err(e) => {
                tracing::debug!("robots.txt body unreadable for {}: {}; allowing all", origin, e);
                CachedRobots::permissive(origin)
            }
        }
    }
}

/// Builds the HTTP client used for robots.txt requests
pub fn build_robots_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
}
