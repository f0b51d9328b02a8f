use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for a crawl session
///
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum depth to crawl from the seed URL (seed is depth 0)
    pub max_depth: u32,

    /// Maximum number of URLs admitted to the session (visited + pending)
    pub max_pages: u32,

    /// Delay each worker waits after a fetch (milliseconds)
    #[serde(default)]
    pub delay_ms: u64,

    /// Timeout for a single fetch attempt (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first failed attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base of the linear retry backoff (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Number of concurrent fetch workers
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Whether robots.txt is consulted before each fetch
    #[serde(default = "default_true")]
    pub respect_robots: bool,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum redirect hops followed by the direct HTTP strategy
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Keep the fetched HTML on each page record
    #[serde(default)]
    pub keep_raw_html: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_pages: 50,
            delay_ms: 0,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            concurrency: default_concurrency(),
            respect_robots: true,
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            keep_raw_html: false,
        }
    }
}

/// Authentication mode with its mode-specific credentials
///
/// Credentials are optional at parse time; the resolver reports which one is
/// missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum AuthConfig {
    #[default]
    None,
    Basic {
        username: Option<String>,
        password: Option<String>,
    },
    Bearer {
        token: Option<String>,
    },
    Cookie {
        cookies: CookieSpec,
    },
    #[serde(rename_all = "kebab-case")]
    FormLogin {
        login_url: String,
        #[serde(default)]
        login_data: BTreeMap<String, String>,
    },
}

impl AuthConfig {
    /// Name of the mode, for logging
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
            Self::Cookie { .. } => "cookie",
            Self::FormLogin { .. } => "form-login",
        }
    }
}

/// Cookies given either as structured pairs or as one `a=1; b=2` string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CookieSpec {
    Pairs(Vec<CookiePair>),
    Raw(String),
}

/// A single cookie
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CookiePair {
    pub name: String,
    pub value: String,
}

/// Fetch strategy selection
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum FetchConfig {
    #[default]
    DirectHttp,
    #[serde(rename_all = "kebab-case")]
    HeadlessBrowser {
        /// Directory full-page screenshots are written to
        #[serde(default = "default_screenshot_dir")]
        screenshot_dir: String,

        /// Fixed wait after navigation for deferred rendering (milliseconds)
        #[serde(default = "default_settle_ms")]
        settle_ms: u64,

        /// Chrome/Chromium binary; detected automatically when absent
        #[serde(default)]
        chrome_executable: Option<String>,
    },
    ExternalProcess {
        /// HTTP client program, invoked with curl-compatible arguments
        #[serde(default = "default_program")]
        program: String,
    },
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the JSON file receiving full page records
    pub json_path: Option<String>,

    /// Path of the CSV summary file
    pub csv_path: Option<String>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_concurrency() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("PageHarvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_redirects() -> u32 {
    10
}

fn default_screenshot_dir() -> String {
    "screenshots".to_string()
}

fn default_settle_ms() -> u64 {
    2_000
}

fn default_program() -> String {
    "curl".to_string()
}
