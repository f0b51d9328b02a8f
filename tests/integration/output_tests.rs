//! Configuration loading and output files around a real session

use crate::common::mount_page;
use page_harvest::config::{load_config_with_hash, AuthConfig, FetchConfig};
use page_harvest::crawl;
use page_harvest::output::{format_statistics, persist};
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::MockServer;

#[test]
fn test_load_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[crawler]
max-depth = 2
max-pages = 25
concurrency = 4
keep-raw-html = true

[auth]
mode = "bearer"
token = "abc"

[fetch]
strategy = "external-process"

[output]
json-path = "out/pages.json"
"#
    )
    .unwrap();

    let (config, hash) = load_config_with_hash(file.path()).unwrap();

    assert_eq!(config.crawler.max_depth, 2);
    assert_eq!(config.crawler.max_pages, 25);
    assert_eq!(config.crawler.concurrency, 4);
    assert!(config.crawler.keep_raw_html);
    assert!(config.crawler.respect_robots);
    assert!(matches!(config.auth, AuthConfig::Bearer { .. }));
    assert!(matches!(config.fetch, FetchConfig::ExternalProcess { ref program } if program == "curl"));
    assert_eq!(config.output.json_path.as_deref(), Some("out/pages.json"));
    assert!(config.output.csv_path.is_none());
    assert_eq!(hash.len(), 64);
}

#[test]
fn test_invalid_config_file_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[crawler]\nmax-depth = 1\nmax-pages = 0\n").unwrap();

    assert!(load_config_with_hash(file.path()).is_err());
}

#[tokio::test]
async fn test_crawl_results_written_to_files() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<title>Index</title><a href="/a">A</a><img src="/pic.jpg">"#,
    )
    .await;
    mount_page(&server, "/a", "<h2>Section A</h2>").await;

    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("pages.json");
    let csv_path = dir.path().join("pages.csv");

    let mut config = crate::common::test_config(1, 10);
    config.crawler.keep_raw_html = true;
    config.output.json_path = Some(json_path.to_string_lossy().into_owned());
    config.output.csv_path = Some(csv_path.to_string_lossy().into_owned());
    let output = config.output.clone();

    let outcome = crawl(config, &server.uri()).await.unwrap();
    assert_eq!(persist(&outcome.pages, &output).unwrap(), 2);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    let pages = json.as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0]["title"], "Index");
    assert!(pages[0]["raw_html"].as_str().unwrap().contains("<title>Index</title>"));
    assert_eq!(pages[1]["title"], "Section A");

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], format!("{}/", server.uri()).as_str());
    assert_eq!(&rows[0][4], "1");
    assert_eq!(&rows[0][5], "1");
    assert_eq!(&rows[1][4], "0");

    let report = format_statistics(&outcome);
    assert!(report.contains("Pages collected: 2"));
}
