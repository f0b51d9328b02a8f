//! Fetch strategies
//!
//! A [`FetchStrategy`] retrieves one document for a URL. Three implementations
//! exist:
//! - [`DirectHttp`] - plain HTTP GET through `reqwest`
//! - [`HeadlessBrowser`] - renders the page in Chrome via the DevTools protocol
//! - [`ExternalProcess`] - shells out to a curl-compatible HTTP client
//!
//! The retry controller and the crawl session only depend on the trait.

mod browser;
mod http;
mod process;

pub use browser::{sanitize_title, screenshot_file_name, HeadlessBrowser};
pub use http::{build_http_client, DirectHttp};
pub use process::{parse_process_output, ExternalProcess, ProcessOutput};

use crate::auth::AuthContext;
use crate::config::{CrawlConfig, FetchConfig};
use crate::FetchError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// `Accept` header sent by every strategy
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// `Accept-Language` header sent by every strategy
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// A retrieved document plus its transport metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Response body (or rendered DOM for the browser strategy)
    pub body: String,

    /// HTTP status code
    pub status_code: u16,

    /// Response headers, names lowercased
    pub headers: BTreeMap<String, String>,

    /// URL the document was finally served from, after redirects
    pub final_url: Url,
}

impl Document {
    /// Creates a 200 text/html document, mostly useful for tests and stubs
    pub fn html(url: Url, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            status_code: 200,
            headers: BTreeMap::from([("content-type".to_string(), "text/html".to_string())]),
            final_url: url,
        }
    }

    /// Value of the `Content-Type` header, or an empty string
    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or("")
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A substitutable way of retrieving a document
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Fetches `url` with the session's auth headers/cookies attached
    ///
    /// One call is one attempt; retries are the caller's business. A fetch must
    /// return `FetchError::Cancelled` promptly once `cancel` fires and release
    /// whatever it holds (connections, browser processes, child processes).
    async fn fetch(
        &self,
        url: &Url,
        auth: &AuthContext,
        cancel: &CancellationToken,
    ) -> Result<Document, FetchError>;
}

/// Builds the strategy selected in `config.fetch`
///
/// # Errors
///
/// Returns an error if the HTTP client for the direct strategy cannot be built.
pub fn build_strategy(config: &CrawlConfig) -> Result<Arc<dyn FetchStrategy>, reqwest::Error> {
    let crawler = &config.crawler;
    let timeout = Duration::from_millis(crawler.timeout_ms);

    let strategy: Arc<dyn FetchStrategy> = match &config.fetch {
        FetchConfig::DirectHttp => Arc::new(DirectHttp::new(build_http_client(
            &crawler.user_agent,
            timeout,
            crawler.max_redirects,
        )?)),
        FetchConfig::HeadlessBrowser {
            screenshot_dir,
            settle_ms,
            chrome_executable,
        } => Arc::new(HeadlessBrowser {
            screenshot_dir: screenshot_dir.into(),
            settle: Duration::from_millis(*settle_ms),
            timeout,
            user_agent: crawler.user_agent.clone(),
            chrome_executable: chrome_executable.clone(),
            profile_root: std::env::temp_dir(),
        }),
        FetchConfig::ExternalProcess { program } => Arc::new(ExternalProcess {
            program: program.clone(),
            timeout,
            user_agent: crawler.user_agent.clone(),
            max_redirects: crawler.max_redirects,
        }),
    };

    tracing::debug!("Using {} fetch strategy", strategy.name());
    Ok(strategy)
}

/// Headers every strategy sends besides the user agent
pub(crate) fn request_headers(auth: &AuthContext) -> Vec<(String, String)> {
    let mut headers = vec![
        ("Accept".to_string(), ACCEPT_HTML.to_string()),
        ("Accept-Language".to_string(), ACCEPT_LANGUAGE.to_string()),
    ];
    headers.extend(auth.header_pairs());
    headers
}
