//! Statistics display for a finished crawl session

use crate::crawler::CrawlOutcome;
use std::fmt::Write;

/// Renders the session statistics as the report printed after a crawl
///
/// # Arguments
///
/// * `outcome` - The session outcome, possibly partial if cancelled
pub fn format_statistics(outcome: &CrawlOutcome) -> String {
    let stats = &outcome.stats;
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "=== Crawl Statistics ===\n");

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Pages collected: {}", stats.total_pages);
    let _ = writeln!(out, "  URLs visited: {}", stats.visited_count);
    let _ = writeln!(out, "  Total links found: {}", stats.total_links);
    let _ = writeln!(out, "  Total images found: {}", stats.total_images);
    let _ = writeln!(out, "  Failed: {}", stats.failed_count);
    let _ = writeln!(out, "  Blocked by robots.txt: {}", stats.blocked_count);
    if outcome.cancelled {
        let _ = writeln!(out, "  Session was cancelled; results are partial");
    }
    let _ = writeln!(out);

    if !outcome.failures.is_empty() {
        let _ = writeln!(out, "Failures ({}):", outcome.failures.len());
        for failure in &outcome.failures {
            let _ = writeln!(
                out,
                "  - {} (depth {}, {} attempts): {}",
                failure.url, failure.depth, failure.attempts, failure.error
            );
        }
        let _ = writeln!(out);
    }

    if !outcome.blocked.is_empty() {
        let _ = writeln!(out, "Blocked URLs ({}):", outcome.blocked.len());
        for url in &outcome.blocked {
            let _ = writeln!(out, "  - {}", url);
        }
        let _ = writeln!(out);
    }

    let success_rate = if stats.visited_count > 0 {
        (stats.total_pages as f64 / stats.visited_count as f64) * 100.0
    } else {
        0.0
    };
    let _ = writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} visited URLs collected)",
        success_rate, stats.total_pages, stats.visited_count
    );

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(outcome: &CrawlOutcome) {
    print!("{}", format_statistics(outcome));
}
