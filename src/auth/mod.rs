//! Authentication resolution
//!
//! Turns the configured [`AuthConfig`] into an [`AuthContext`]: the headers and
//! cookies attached to every fetch. Basic, bearer and cookie modes resolve
//! without I/O; form login performs one POST exchange and is memoized so a
//! session logs in at most once.

mod login;

pub use login::perform_form_login;

use crate::config::{AuthConfig, CookieSpec};
use crate::AuthError;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::OnceCell;
use url::Url;

/// Redirect hops followed during a form login exchange
pub const LOGIN_MAX_REDIRECTS: usize = 5;

/// Resolved request augmentation for one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    /// Extra request headers, e.g. `Authorization`
    pub headers: BTreeMap<String, String>,

    /// Session cookies in the order they were received
    pub cookies: Vec<(String, String)>,
}

impl AuthContext {
    /// An empty context (no authentication)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if the context adds nothing to requests
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.cookies.is_empty()
    }

    /// Sets a cookie, replacing any earlier cookie with the same name
    pub fn insert_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.cookies.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.cookies.push((name, value)),
        }
    }

    /// Looks up a cookie value by name
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    /// The single `Cookie` header value, `name=value` pairs joined with `; `
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Every header to attach to a request, including the folded `Cookie` header
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(cookie) = self.cookie_header() {
            pairs.push(("Cookie".to_string(), cookie));
        }
        pairs
    }
}

/// Resolves every mode that needs no network exchange
///
/// Returns `Ok(None)` for form login, which must go through [`AuthResolver`].
pub fn resolve_static(config: &AuthConfig) -> Result<Option<AuthContext>, AuthError> {
    let mut context = AuthContext::empty();

    match config {
        AuthConfig::None => {}
        AuthConfig::Basic { username, password } => {
            let username = required(username.as_deref(), "username")?;
            let password = required(password.as_deref(), "password")?;
            let encoded = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", username, password));
            context
                .headers
                .insert("Authorization".to_string(), format!("Basic {}", encoded));
        }
        AuthConfig::Bearer { token } => {
            let token = required(token.as_deref(), "token")?;
            context
                .headers
                .insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        AuthConfig::Cookie { cookies } => {
            for (name, value) in cookie_pairs(cookies) {
                context.insert_cookie(name, value);
            }
        }
        AuthConfig::FormLogin { .. } => return Ok(None),
    }

    Ok(Some(context))
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, AuthError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AuthError::MissingCredentials(name)),
    }
}

/// Flattens either cookie representation into ordered `(name, value)` pairs
fn cookie_pairs(spec: &CookieSpec) -> Vec<(String, String)> {
    match spec {
        CookieSpec::Pairs(pairs) => pairs
            .iter()
            .filter(|pair| !pair.name.trim().is_empty())
            .map(|pair| (pair.name.trim().to_string(), pair.value.clone()))
            .collect(),
        CookieSpec::Raw(raw) => parse_cookie_string(raw),
    }
}

/// Parses `a=1; b=2` into pairs, skipping fragments without a name
pub fn parse_cookie_string(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Session-scoped resolver that yields the same context to every caller
///
/// The first call performs the resolution (including a form login exchange);
/// concurrent callers wait for it and later callers reuse the result.
pub struct AuthResolver {
    config: AuthConfig,
    client: Client,
    context: OnceCell<AuthContext>,
}

impl AuthResolver {
    /// Creates a resolver; `client` is only used for form login and must not
    /// follow redirects on its own
    pub fn new(config: AuthConfig, client: Client) -> Self {
        Self {
            config,
            client,
            context: OnceCell::new(),
        }
    }

    /// Returns true if the configured mode needs a network exchange
    pub fn requires_login(&self) -> bool {
        matches!(self.config, AuthConfig::FormLogin { .. })
    }

    /// Resolves (once) and returns the session's auth context
    pub async fn context(&self) -> Result<AuthContext, AuthError> {
        let context = self
            .context
            .get_or_try_init(|| async { self.resolve().await })
            .await?;
        Ok(context.clone())
    }

    async fn resolve(&self) -> Result<AuthContext, AuthError> {
        if let Some(context) = resolve_static(&self.config)? {
            return Ok(context);
        }

        match &self.config {
            AuthConfig::FormLogin {
                login_url,
                login_data,
            } => {
                let url = Url::parse(login_url)
                    .map_err(|e| AuthError::LoginFailed(format!("invalid login URL: {}", e)))?;
                perform_form_login(&self.client, &url, login_data, LOGIN_MAX_REDIRECTS).await
            }
            _ => Ok(AuthContext::empty()),
        }
    }
}

/// Builds the client used for login exchanges
///
/// Redirects are followed by hand so that cookies set on intermediate hops
/// are kept.
pub fn build_login_client(
    user_agent: &str,
    timeout: std::time::Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}
