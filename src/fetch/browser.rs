//! Headless browser fetcher
//!
//! Every fetch launches its own Chrome process with a throwaway profile
//! directory, renders the page, captures a full-page screenshot and tears the
//! browser down again on every exit path (success, error, timeout, cancel).

use crate::auth::AuthContext;
use crate::fetch::{request_headers, Document, FetchStrategy};
use crate::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, Headers, SetExtraHttpHeadersParams,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Longest title fragment kept in a screenshot file name
const MAX_TITLE_CHARS: usize = 60;

static PROFILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Renders pages in headless Chrome
#[derive(Debug, Clone)]
pub struct HeadlessBrowser {
    pub screenshot_dir: PathBuf,
    /// Fixed wait after navigation for deferred rendering
    pub settle: Duration,
    /// Budget for launch + navigation + rendering of one fetch
    pub timeout: Duration,
    pub user_agent: String,
    pub chrome_executable: Option<String>,
    /// Parent directory of the per-fetch browser profiles
    pub profile_root: PathBuf,
}

#[async_trait]
impl FetchStrategy for HeadlessBrowser {
    fn name(&self) -> &'static str {
        "headless-browser"
    }

    async fn fetch(
        &self,
        url: &Url,
        auth: &AuthContext,
        cancel: &CancellationToken,
    ) -> Result<Document, FetchError> {
        // Removed when this fetch ends, whether or not the launch succeeded
        let profile = ProfileDir::create_in(&self.profile_root).await?;

        // A launch abandoned by cancel or timeout drops the half-started
        // browser, which kills its process
        let session = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            launched = tokio::time::timeout(self.timeout, BrowserSession::launch(self, profile.path())) => {
                launched.map_err(|_| FetchError::Timeout)??
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            rendered = tokio::time::timeout(self.timeout, self.render(&session, url, auth)) => {
                rendered.unwrap_or(Err(FetchError::Timeout))
            }
        };

        session.close().await;
        result
    }
}

impl HeadlessBrowser {
    async fn render(
        &self,
        session: &BrowserSession,
        url: &Url,
        auth: &AuthContext,
    ) -> Result<Document, FetchError> {
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Other(format!("failed to open page: {}", e)))?;

        let rendered = self.navigate_and_capture(&page, url, auth).await;

        if let Err(e) = page.close().await {
            tracing::debug!("Page close error for {}: {}", url, e);
        }
        rendered
    }

    async fn navigate_and_capture(
        &self,
        page: &Page,
        url: &Url,
        auth: &AuthContext,
    ) -> Result<Document, FetchError> {
        let headers: serde_json::Map<String, serde_json::Value> = request_headers(auth)
            .into_iter()
            .map(|(name, value)| (name, serde_json::Value::String(value)))
            .collect();

        page.execute(EnableParams::default())
            .await
            .map_err(|e| FetchError::Other(format!("network domain unavailable: {}", e)))?;
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            serde_json::Value::Object(headers),
        )))
        .await
        .map_err(|e| FetchError::Other(format!("failed to set headers: {}", e)))?;

        page.goto(url.as_str())
            .await
            .map_err(|e| classify_navigation_error(&e.to_string()))?;

        // Best effort: single-page apps may never report a finished navigation
        if let Err(e) = page.wait_for_navigation().await {
            tracing::debug!("Navigation wait for {} ended early: {}", url, e);
        }

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let body = page
            .content()
            .await
            .map_err(|e| FetchError::Other(format!("failed to read DOM: {}", e)))?;
        let title = page.get_title().await.ok().flatten();

        self.capture_screenshot(page, url, title.as_deref()).await;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        Ok(Document {
            body,
            // The DevTools page API does not surface the main response status
            status_code: 200,
            headers: BTreeMap::from([("content-type".to_string(), "text/html".to_string())]),
            final_url,
        })
    }

    /// Screenshot failures are logged and never fail the fetch
    async fn capture_screenshot(&self, page: &Page, url: &Url, title: Option<&str>) {
        if let Err(e) = tokio::fs::create_dir_all(&self.screenshot_dir).await {
            tracing::warn!(
                "Cannot create screenshot directory {}: {}",
                self.screenshot_dir.display(),
                e
            );
            return;
        }

        let path = self
            .screenshot_dir
            .join(screenshot_file_name(title.unwrap_or(""), Utc::now()));
        let params = ScreenshotParams::builder().full_page(true).build();

        match page.save_screenshot(params, &path).await {
            Ok(_) => tracing::debug!("Saved screenshot of {} to {}", url, path.display()),
            Err(e) => tracing::warn!("Screenshot of {} failed: {}", url, e),
        }
    }
}

/// Throwaway Chrome profile directory, deleted on drop
struct ProfileDir {
    path: PathBuf,
}

impl ProfileDir {
    async fn create_in(root: &Path) -> Result<Self, FetchError> {
        let path = root.join(format!(
            "page-harvest-{}-{}",
            std::process::id(),
            PROFILE_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::create_dir_all(&path).await.map_err(|e| {
            FetchError::Other(format!(
                "cannot create browser profile {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            tracing::debug!(
                "Could not remove browser profile {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// One launched browser process plus its event-handler task
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(options: &HeadlessBrowser, profile_dir: &Path) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .request_timeout(options.timeout)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--user-agent={}", options.user_agent));
        if let Some(executable) = &options.chrome_executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder
            .build()
            .map_err(|e| FetchError::Other(format!("browser config error: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Other(format!("browser launch failed: {}", e)))?;

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self { browser, handler })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser close error: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Browser wait error: {}", e);
        }
        self.handler.abort();
    }
}

fn classify_navigation_error(message: &str) -> FetchError {
    if message.contains("ERR_CONNECTION_REFUSED") {
        FetchError::ConnectionRefused
    } else if message.contains("ERR_TIMED_OUT") || message.contains("Timeout") {
        FetchError::Timeout
    } else {
        FetchError::Other(format!("navigation failed: {}", message))
    }
}

/// Reduces a page title to characters safe in a file name
///
/// Runs of anything other than ASCII alphanumerics, `-` and `_` become a
/// single `_`; an empty result becomes `untitled`.
pub fn sanitize_title(title: &str) -> String {
    let mut sanitized = String::new();
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            sanitized.push(c);
        } else if !sanitized.ends_with('_') {
            sanitized.push('_');
        }
        if sanitized.len() >= MAX_TITLE_CHARS {
            break;
        }
    }

    let sanitized = sanitized.trim_matches('_');
    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized.to_string()
    }
}

/// Screenshot file name: `{timestamp}_{sanitized title}.png`
pub fn screenshot_file_name(title: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}.png", at.format("%Y%m%dT%H%M%S%3fZ"), sanitize_title(title))
}
