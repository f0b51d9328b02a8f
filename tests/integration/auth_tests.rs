//! Authentication modes applied to a whole session

use crate::common::{mount_page, mount_page_expect, test_config};
use page_harvest::config::{AuthConfig, CookieSpec};
use page_harvest::{crawl, AuthError, HarvestError};
use std::collections::BTreeMap;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_form_login_failure_aborts_before_fetching() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_page_expect(&server, "/", "<title>Members</title>", 0).await;

    let mut config = test_config(1, 10);
    config.auth = AuthConfig::FormLogin {
        login_url: format!("{}/login", server.uri()),
        login_data: BTreeMap::from([("user".to_string(), "alice".to_string())]),
    };

    let result = crawl(config, &server.uri()).await;

    assert!(matches!(
        result,
        Err(HarvestError::Auth(AuthError::LoginFailed(_)))
    ));
}

#[tokio::test]
async fn test_form_login_cookies_sent_with_fetches() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("user=alice"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("set-cookie", "sid=abc123; Path=/; HttpOnly")
                .insert_header("location", "/welcome"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/welcome"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("cookie", "sid=abc123"))
        .respond_with(crate::common::html("<title>Members</title>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(0, 1);
    config.auth = AuthConfig::FormLogin {
        login_url: format!("{}/login", server.uri()),
        login_data: BTreeMap::from([
            ("user".to_string(), "alice".to_string()),
            ("pass".to_string(), "secret".to_string()),
        ]),
    };

    let outcome = crawl(config, &server.uri()).await.unwrap();

    assert_eq!(outcome.pages.len(), 1);
    assert_eq!(outcome.pages[0].title, "Members");
}

#[tokio::test]
async fn test_basic_auth_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(crate::common::html("<title>Private</title>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(0, 1);
    config.auth = AuthConfig::Basic {
        username: Some("user".to_string()),
        password: Some("pass".to_string()),
    };

    let outcome = crawl(config, &server.uri()).await.unwrap();

    assert_eq!(outcome.pages.len(), 1);
    assert_eq!(outcome.pages[0].title, "Private");
}

#[tokio::test]
async fn test_basic_auth_missing_password_issues_no_requests() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<title>Private</title>").await;

    let mut config = test_config(0, 1);
    config.auth = AuthConfig::Basic {
        username: Some("user".to_string()),
        password: Some(String::new()),
    };

    let result = crawl(config, &server.uri()).await;

    assert!(matches!(
        result,
        Err(HarvestError::Auth(AuthError::MissingCredentials("password")))
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bearer_token_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(crate::common::html("<title>API docs</title>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(0, 1);
    config.auth = AuthConfig::Bearer {
        token: Some("t0ken".to_string()),
    };

    let outcome = crawl(config, &server.uri()).await.unwrap();
    assert_eq!(outcome.pages.len(), 1);
}

#[tokio::test]
async fn test_cookie_string_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("cookie", "session=xyz; theme=dark"))
        .respond_with(crate::common::html("<title>Dashboard</title>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(0, 1);
    config.auth = AuthConfig::Cookie {
        cookies: CookieSpec::Raw("session=xyz; theme=dark".to_string()),
    };

    let outcome = crawl(config, &server.uri()).await.unwrap();
    assert_eq!(outcome.pages[0].title, "Dashboard");
}
