//! Integration tests for Page-Harvest
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! crawl sessions end-to-end through the direct HTTP strategy.

mod auth_tests;
mod common;
mod crawl_tests;
mod output_tests;
