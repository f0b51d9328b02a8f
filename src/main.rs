//! Page-Harvest main entry point
//!
//! This is the command-line interface for the Page-Harvest crawl engine.

use anyhow::Context;
use clap::Parser;
use page_harvest::config::load_config_with_hash;
use page_harvest::crawler::{CrawlEvent, CrawlSession};
use page_harvest::output::{persist, print_statistics};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Page-Harvest: a bounded, polite crawl engine
///
/// Page-Harvest fetches a seed URL, extracts titles, text, links, images and
/// metadata, and follows links breadth-first within the configured depth and
/// page limits while respecting robots.txt.
#[derive(Parser, Debug)]
#[command(name = "page-harvest")]
#[command(version)]
#[command(about = "A bounded, polite crawl engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URL the crawl starts from
    #[arg(value_name = "SEED_URL")]
    seed: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write full page records as JSON to this path (overrides the config)
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Write page summaries as CSV to this path (overrides the config)
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(path) = &cli.json {
        config.output.json_path = Some(path.to_string_lossy().into_owned());
    }
    if let Some(path) = &cli.csv {
        config.output.csv_path = Some(path.to_string_lossy().into_owned());
    }
    let output = config.output.clone();

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let session = CrawlSession::new(config)
        .context("failed to set up crawl session")?
        .with_events(events_tx);

    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            cancel.cancel();
        }
    });
    let logger = tokio::spawn(log_events(events_rx));

    let result = session.run(&cli.seed).await;
    // The session owned the only sender; the logger ends once it is drained
    join_event_logger(logger).await;

    let outcome = result.context("crawl aborted")?;

    let written = persist(&outcome.pages, &output).context("failed to write crawl output")?;
    if written == 0 {
        tracing::info!("No output destination configured; records were not saved");
    }

    if !cli.quiet {
        print_statistics(&outcome);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_harvest=info,warn"),
            1 => EnvFilter::new("page_harvest=debug,info"),
            2 => EnvFilter::new("page_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Renders the session's event stream as debug log lines
async fn log_events(mut events: mpsc::UnboundedReceiver<CrawlEvent>) {
    while let Some(event) = events.recv().await {
        match serde_json::to_string(&event) {
            Ok(line) => tracing::debug!(target: "page_harvest::events", "{}", line),
            Err(e) => tracing::debug!("Unserializable event: {}", e),
        }
    }
}

/// Waits for the event log task; a failed task only costs debug output
async fn join_event_logger(logger: JoinHandle<()>) -> bool {
    match logger.await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Event log task ended abnormally: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_logger_drains_and_ends() {
        let (tx, rx) = mpsc::unbounded_channel();
        let logger = tokio::spawn(log_events(rx));
        tx.send(CrawlEvent::JobBlocked {
            url: "https://example.com/private".to_string(),
        })
        .unwrap();
        drop(tx);

        assert!(join_event_logger(logger).await);
    }

    async fn failing_logger() {
        panic!("event log task failed");
    }

    #[tokio::test]
    async fn test_failed_event_logger_is_reported() {
        let logger = tokio::spawn(failing_logger());

        assert!(!join_event_logger(logger).await);
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::parse_from([
            "page-harvest",
            "crawl.toml",
            "https://example.com/",
            "-vv",
            "--csv",
            "out.csv",
        ]);

        assert_eq!(cli.config, PathBuf::from("crawl.toml"));
        assert_eq!(cli.seed, "https://example.com/");
        assert_eq!(cli.verbose, 2);
        assert!(cli.json.is_none());
        assert_eq!(cli.csv, Some(PathBuf::from("out.csv")));
    }
}
