//! Form login exchange
//!
//! Submits the configured login form and turns the cookies the site sets
//! into an [`AuthContext`] for the rest of the session.

use crate::auth::AuthContext;
use crate::AuthError;
use reqwest::header::{LOCATION, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};
use std::collections::BTreeMap;
use url::Url;

/// Performs a form login and returns the session cookies it yields
///
/// # Request Flow
///
/// 1. POST `login_data` form-encoded to `login_url`
/// 2. Collect every `Set-Cookie` of the response
/// 3. While the response is a redirect with a `Location` and hops remain,
///    follow it (303 and older redirects switch to GET, 307/308 re-POST)
///    and keep collecting cookies
/// 4. The final status must be 2xx or 3xx
///
/// `client` must have automatic redirects disabled, otherwise cookies set on
/// intermediate hops are lost.
///
/// # Errors
///
/// `AuthError::LoginFailed` on a transport error or a final status outside 200..=399.
pub async fn perform_form_login(
    client: &Client,
    login_url: &Url,
    login_data: &BTreeMap<String, String>,
    max_redirects: usize,
) -> Result<AuthContext, AuthError> {
    let mut context = AuthContext::empty();
    let mut current = login_url.clone();
    let mut resend_form = true;
    let mut hops = 0;

    tracing::info!("Submitting login form to {}", login_url);

    loop {
        let request = if resend_form {
            client.post(current.clone()).form(login_data)
        } else {
            client.get(current.clone())
        };

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::LoginFailed(format!("{}: {}", current, e)))?;

        collect_cookies(&response, &mut context);

        let status = response.status();
        if status.is_redirection() && hops < max_redirects {
            if let Some(next) = redirect_target(&response, &current) {
                hops += 1;
                resend_form = matches!(
                    status,
                    StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
                );
                tracing::debug!("Login redirect {} -> {} ({})", current, next, status.as_u16());
                current = next;
                continue;
            }
        }

        if status.is_success() || status.is_redirection() {
            if context.cookies.is_empty() {
                tracing::warn!("Login to {} succeeded but set no cookies", login_url);
            } else {
                tracing::info!(
                    "Login to {} succeeded with {} session cookie(s)",
                    login_url,
                    context.cookies.len()
                );
            }
            return Ok(context);
        }

        return Err(AuthError::LoginFailed(format!(
            "{} answered HTTP {}",
            current,
            status.as_u16()
        )));
    }
}

/// Copies `name=value` of each `Set-Cookie` header into the context
fn collect_cookies(response: &Response, context: &mut AuthContext) {
    for header in response.headers().get_all(SET_COOKIE) {
        let Ok(raw) = header.to_str() else {
            continue;
        };
        if let Some((name, value)) = parse_set_cookie(raw) {
            context.insert_cookie(name, value);
        }
    }
}

/// Extracts the leading `name=value` pair of a `Set-Cookie` header
pub(crate) fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

fn redirect_target(response: &Response, current: &Url) -> Option<Url> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}
