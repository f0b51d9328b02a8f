//! End-to-end crawl sessions against a mock server

use crate::common::{html, mount_page, mount_page_expect, page_requests, test_config};
use page_harvest::crawler::{CrawlEvent, CrawlSession};
use page_harvest::{crawl, FetchError, HarvestError};
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_single_page_crawl() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page_expect(
        &server,
        "/",
        r#"<html><head><title>Home</title>
        <meta name="description" content="Landing page"></head>
        <body><h1>Welcome</h1><a href="/about">About</a>
        <img src="/logo.png" alt="Logo" width="32"></body></html>"#,
        1,
    )
    .await;
    mount_page_expect(&server, "/about", "<title>About</title>", 0).await;

    let outcome = crawl(test_config(0, 1), &base_url).await.unwrap();

    assert_eq!(outcome.pages.len(), 1);
    let page = &outcome.pages[0];
    assert_eq!(page.url, format!("{}/", base_url));
    assert_eq!(page.title, "Home");
    assert_eq!(page.status_code, 200);
    assert_eq!(page.content_type, "text/html; charset=utf-8");
    assert_eq!(page.meta("description"), "Landing page");
    assert_eq!(page.links.len(), 1);
    assert_eq!(page.links[0].absolute_url, format!("{}/about", base_url));
    assert_eq!(page.images[0].absolute_src, format!("{}/logo.png", base_url));
    assert_eq!(page.images[0].width, "32");
    assert!(page.raw_html.is_none());
    assert_eq!(outcome.stats.total_pages, 1);
    assert_eq!(outcome.stats.total_links, 1);
    assert_eq!(outcome.stats.total_images, 1);
    assert!(!outcome.cancelled);
}

#[tokio::test]
async fn test_robots_missing_fails_open() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", r#"<a href="/next">next</a>"#).await;
    mount_page(&server, "/next", "<title>Next</title>").await;

    let outcome = crawl(test_config(1, 10), &server.uri()).await.unwrap();

    assert_eq!(outcome.pages.len(), 2);
    assert!(outcome.blocked.is_empty());
}

#[tokio::test]
async fn test_robots_disallow_blocks_without_fetching() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<a href="/private/report">report</a><a href="/public">public</a>"#,
    )
    .await;
    mount_page_expect(&server, "/private/report", "<p>secret</p>", 0).await;
    mount_page(&server, "/public", "<p>open</p>").await;

    let outcome = crawl(test_config(1, 10), &server.uri()).await.unwrap();

    assert_eq!(outcome.pages.len(), 2);
    assert_eq!(
        outcome.blocked,
        vec![format!("{}/private/report", server.uri())]
    );
    assert_eq!(outcome.stats.blocked_count, 1);
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/", "<title>Home</title>").await;

    let mut config = test_config(0, 1);
    config.crawler.respect_robots = false;
    let outcome = crawl(config, &server.uri()).await.unwrap();

    assert_eq!(outcome.pages.len(), 1);
}

#[tokio::test]
async fn test_duplicate_links_fetched_once() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_page(
        &server,
        "/",
        &format!(
            r##"<a href="/a">one</a>
            <a href="{}/a">two</a>
            <a href="/a#section">three</a>
            <a href="/a?utm_source=mail">four</a>"##,
            base_url
        ),
    )
    .await;
    mount_page_expect(&server, "/a", r#"<a href="/">back home</a>"#, 1).await;

    let outcome = crawl(test_config(2, 10), &base_url).await.unwrap();

    assert_eq!(outcome.pages.len(), 2);
    // Every anchor is reported even though only one fetch happens
    assert_eq!(outcome.pages[0].links.len(), 4);
    assert_eq!(page_requests(&server).await, vec!["/", "/a"]);
}

#[tokio::test]
async fn test_depth_bound() {
    let server = MockServer::start().await;

    mount_page_expect(&server, "/", r#"<a href="/one">1</a>"#, 1).await;
    mount_page_expect(&server, "/one", r#"<a href="/two">2</a>"#, 1).await;
    mount_page_expect(&server, "/two", r#"<a href="/three">3</a>"#, 0).await;

    let outcome = crawl(test_config(1, 100), &server.uri()).await.unwrap();

    assert_eq!(outcome.pages.len(), 2);
    assert_eq!(outcome.stats.visited_count, 2);
}

#[tokio::test]
async fn test_page_bound() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a href="/p1">1</a><a href="/p2">2</a><a href="/p3">3</a><a href="/p4">4</a>"#,
    )
    .await;
    mount_page_expect(&server, "/p1", "<p>1</p>", 1).await;
    mount_page_expect(&server, "/p2", "<p>2</p>", 1).await;
    mount_page_expect(&server, "/p3", "<p>3</p>", 0).await;
    mount_page_expect(&server, "/p4", "<p>4</p>", 0).await;

    let outcome = crawl(test_config(3, 3), &server.uri()).await.unwrap();

    assert_eq!(outcome.pages.len(), 3);
    assert_eq!(outcome.stats.visited_count, 3);
}

#[tokio::test]
async fn test_retries_then_records_failure() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/flaky">flaky</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let mut config = test_config(1, 10);
    config.crawler.max_retries = 3;
    let outcome = crawl(config, &server.uri()).await.unwrap();

    assert_eq!(outcome.pages.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.url, format!("{}/flaky", server.uri()));
    assert_eq!(failure.depth, 1);
    assert_eq!(failure.attempts, 4);
    assert_eq!(failure.error, FetchError::HttpError(500));
}

#[tokio::test]
async fn test_retry_recovers_after_transient_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page_expect(&server, "/", "<title>Back</title>", 1).await;

    let mut config = test_config(0, 1);
    config.crawler.max_retries = 2;
    let outcome = crawl(config, &server.uri()).await.unwrap();

    assert_eq!(outcome.pages.len(), 1);
    assert_eq!(outcome.pages[0].title, "Back");
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn test_failed_seed_is_not_a_session_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let outcome = crawl(test_config(1, 10), &server.uri()).await.unwrap();

    assert!(outcome.pages.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].error, FetchError::HttpError(404));
}

#[tokio::test]
async fn test_invalid_seed_rejected() {
    let result = crawl(test_config(0, 1), "ftp://example.com/").await;
    assert!(matches!(result, Err(HarvestError::Url(_))));
}

#[tokio::test]
async fn test_cancellation_returns_partial_outcome() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>slow</p>").set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let mut config = test_config(1, 10);
    config.crawler.timeout_ms = 30_000;
    config.crawler.max_retries = 3;
    let session = CrawlSession::new(config).unwrap();
    let cancel = session.cancel_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let started = std::time::Instant::now();
    let outcome = session.run(&server.uri()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(outcome.cancelled);
    assert!(outcome.pages.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].error, FetchError::Cancelled);
    assert_eq!(outcome.failures[0].attempts, 1);
}

#[tokio::test]
async fn test_event_stream() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/gone">gone</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = CrawlSession::new(test_config(1, 10))
        .unwrap()
        .with_events(tx);
    session.run(&server.uri()).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(CrawlEvent::SessionStarted { .. })));
    assert!(matches!(events[1], CrawlEvent::AuthResolved { mode: "none" }));
    assert!(events.iter().any(|e| matches!(
        e,
        CrawlEvent::JobSucceeded { links: 1, admitted: 1, .. }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        CrawlEvent::JobFailed { error: FetchError::HttpError(410), attempts: 1, .. }
    )));
    assert!(matches!(
        events.last(),
        Some(CrawlEvent::SessionFinished {
            pages: 1,
            failed: 1,
            blocked: 0,
            cancelled: false
        })
    ));
}

#[tokio::test]
async fn test_robots_timeout_fails_open() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /\n")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_page_expect(&server, "/", "<title>Home</title>", 1).await;

    let mut config = test_config(0, 1);
    config.crawler.timeout_ms = 300;
    let outcome = crawl(config, &server.uri()).await.unwrap();

    assert_eq!(outcome.pages.len(), 1);
    assert!(outcome.blocked.is_empty());
}

#[tokio::test]
async fn test_huge_crawl_delay_does_not_abort_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1e30\n"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/", "<title>Home</title>").await;

    let session = CrawlSession::new(test_config(0, 1)).unwrap();
    let cancel = session.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();
    });

    let started = std::time::Instant::now();
    let outcome = session.run(&server.uri()).await.unwrap();

    // The capped delay is still running when the session is stopped
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(outcome.cancelled);
    assert_eq!(outcome.pages.len(), 1);
    assert_eq!(outcome.pages[0].title, "Home");
}
