use url::Url;

/// Extracts the lowercase host from a URL
pub(crate) fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Key identifying the robots.txt scope of a URL: scheme, host and port
///
/// Two URLs share a robots.txt file exactly when their keys are equal.
pub fn origin_key(url: &Url) -> Option<String> {
    let host = extract_host(url)?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Location of the robots.txt file governing `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    let origin = origin_key(url)?;
    Url::parse(&format!("{}/robots.txt", origin)).ok()
}
