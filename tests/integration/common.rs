use page_harvest::config::{AuthConfig, CrawlConfig, CrawlerConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with fast timings and robots.txt enabled
pub fn test_config(max_depth: u32, max_pages: u32) -> CrawlConfig {
    CrawlConfig {
        crawler: CrawlerConfig {
            max_depth,
            max_pages,
            delay_ms: 0,
            timeout_ms: 5_000,
            max_retries: 0,
            retry_delay_ms: 1,
            concurrency: 2,
            respect_robots: true,
            user_agent: "TestBot/1.0".to_string(),
            max_redirects: 5,
            keep_raw_html: false,
        },
        auth: AuthConfig::None,
        fetch: Default::default(),
        output: Default::default(),
    }
}

/// Mounts an HTML page at `route`
pub async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Mounts an HTML page at `route` that must be requested exactly `times`
pub async fn mount_page_expect(server: &MockServer, route: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(times)
        .mount(server)
        .await;
}

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Paths of all requests the server received, robots.txt excluded
pub async fn page_requests(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .filter(|p| p != "/robots.txt")
        .collect()
}
