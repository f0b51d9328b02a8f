//! Page-Harvest: a bounded crawl engine
//!
//! This crate fetches web pages, extracts structured page records from them and
//! follows discovered links breadth-first within configured depth and page bounds,
//! respecting robots.txt and an optional authentication mode.

pub mod auth;
pub mod config;
pub mod crawler;
pub mod fetch;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Page-Harvest operations
///
/// Only session-level preconditions (configuration, client construction,
/// authentication) surface through this type; per-URL failures are recorded
/// in the crawl outcome instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Invalid state transition for {url}: {from:?} -> {to:?}")]
    InvalidTransition {
        url: String,
        from: state::PageState,
        to: state::PageState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
///
/// Any of these means the link is unusable; callers skip it rather than
/// abandoning the page it came from.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors produced by a fetch strategy
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("HTTP status {0}")]
    HttpError(u16),

    #[error("{0}")]
    Other(String),

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns true if another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Authentication errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("login failed: {0}")]
    LoginFailed(String),
}

/// Result type alias for Page-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use auth::AuthContext;
pub use config::CrawlConfig;
pub use crawler::{crawl, CrawlOutcome, CrawlSession, CrawlStats, ImageRecord, LinkRecord, PageRecord};
pub use fetch::{Document, FetchStrategy};
pub use state::PageState;
pub use url::{absolutize, normalize_url};
