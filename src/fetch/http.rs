//! Direct HTTP fetcher
//!
//! This module handles plain HTTP retrieval, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - GET requests with auth headers attached
//! - Redirect following (bounded by `max-redirects`)
//! - Error classification

use crate::auth::AuthContext;
use crate::fetch::{request_headers, Document, FetchStrategy};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Builds an HTTP client for page fetches
///
/// # Arguments
///
/// * `user_agent` - Value of the `User-Agent` header
/// * `timeout` - Per-request timeout, covering connect and body
/// * `max_redirects` - Redirect hops to follow; 0 disables redirects
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
    max_redirects: u32,
) -> Result<Client, reqwest::Error> {
    let redirect = if max_redirects == 0 {
        Policy::none()
    } else {
        Policy::limited(max_redirects as usize)
    };

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages with a plain GET request
pub struct DirectHttp {
    client: Client,
}

impl DirectHttp {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &Url, auth: &AuthContext) -> Result<Document, FetchError> {
        let mut request = self.client.get(url.clone());
        for (name, value) in request_headers(auth) {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpError(status.as_u16()));
        }

        let final_url = response.url().clone();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(classify_error)?;

        Ok(Document {
            body,
            status_code: status.as_u16(),
            headers,
            final_url,
        })
    }
}

#[async_trait]
impl FetchStrategy for DirectHttp {
    fn name(&self) -> &'static str {
        "direct-http"
    }

    async fn fetch(
        &self,
        url: &Url,
        auth: &AuthContext,
        cancel: &CancellationToken,
    ) -> Result<Document, FetchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.get(url, auth) => result,
        }
    }
}

/// Maps a transport error onto the fetch error taxonomy
fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::ConnectionRefused
    } else if e.is_redirect() {
        FetchError::Other(format!("redirect error: {}", e))
    } else {
        FetchError::Other(e.to_string())
    }
}
