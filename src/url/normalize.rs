use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Hrefs with these prefixes never point at a fetchable document
const NON_NAVIGABLE_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Resolves `href` against `base` into an absolute http(s) URL
///
/// Standard relative reference resolution applies (scheme, authority, path,
/// query, fragment). Empty hrefs, fragment-only anchors and non-navigable
/// schemes (`javascript:`, `mailto:`, `tel:`, `data:`) are rejected, as is
/// anything that resolves to a scheme other than http or https.
///
/// # Examples
///
/// ```
/// use page_harvest::url::absolutize;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/index.html").unwrap();
/// let url = absolutize("../about?x=1", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about?x=1");
/// ```
pub fn absolutize(href: &str, base: &Url) -> Result<Url, UrlError> {
    let href = href.trim();

    if href.is_empty() {
        return Err(UrlError::Parse("empty href".to_string()));
    }

    if href.starts_with('#') {
        return Err(UrlError::Parse(format!("fragment-only href '{}'", href)));
    }

    let lowered = href.to_ascii_lowercase();
    if let Some(prefix) = NON_NAVIGABLE_PREFIXES
        .iter()
        .find(|prefix| lowered.starts_with(**prefix))
    {
        return Err(UrlError::InvalidScheme(prefix.trim_end_matches(':').to_string()));
    }

    let resolved = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return Err(UrlError::InvalidScheme(resolved.scheme().to_string()));
    }

    if resolved.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(resolved)
}

/// Canonicalizes a URL for visited-set membership
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http and https
/// 3. Lowercase the host
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters
/// 7. Sort remaining query parameters alphabetically
/// 8. Remove empty query string (trailing ?)
///
/// Trailing slashes are kept: `/docs/` and `/docs` can serve different documents.
///
/// # Examples
///
/// ```
/// use page_harvest::url::normalize_url;
///
/// let url = normalize_url("http://EXAMPLE.COM/a/../page/?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page/?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // The url crate already lowercases domain hosts; IP hosts are left as-is
    let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let filtered_params = filter_and_sort_query_params(&url);

        if filtered_params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(filtered_params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and repeated slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", normalized_segments.join("/"));
    if path.ends_with('/') {
        result.push('/');
    }
    result
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
