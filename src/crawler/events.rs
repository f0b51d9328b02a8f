//! Structured crawl events
//!
//! A session can stream [`CrawlEvent`]s to an observer (progress display,
//! tests). Emission never blocks and a dropped receiver is ignored.

use crate::FetchError;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Something that happened during a crawl session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrawlEvent {
    SessionStarted {
        seed: String,
        max_depth: u32,
        max_pages: u32,
    },
    AuthResolved {
        mode: &'static str,
    },
    AuthFailed {
        mode: &'static str,
        error: String,
    },
    JobStarted {
        url: String,
        depth: u32,
    },
    JobSucceeded {
        url: String,
        status_code: u16,
        links: usize,
        /// Children newly admitted to the frontier
        admitted: usize,
    },
    JobBlocked {
        url: String,
    },
    JobFailed {
        url: String,
        attempts: u32,
        #[serde(serialize_with = "display")]
        error: FetchError,
    },
    SessionFinished {
        pages: usize,
        failed: usize,
        blocked: usize,
        cancelled: bool,
    },
}

fn display<S: serde::Serializer>(error: &FetchError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Optional event channel
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    sender: Option<UnboundedSender<CrawlEvent>>,
}

impl EventSink {
    pub(crate) fn new(sender: UnboundedSender<CrawlEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub(crate) fn emit(&self, event: CrawlEvent) {
        if let Some(sender) = &self.sender {
            // Receiver gone: nobody is listening any more
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_emit_delivers_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(tx);
        sink.emit(CrawlEvent::JobBlocked {
            url: "https://example.com/".to_string(),
        });

        assert_eq!(
            rx.try_recv().unwrap(),
            CrawlEvent::JobBlocked {
                url: "https://example.com/".to_string()
            }
        );
    }

    #[test]
    fn test_emit_without_receiver_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        EventSink::new(tx).emit(CrawlEvent::AuthResolved { mode: "none" });
        EventSink::default().emit(CrawlEvent::AuthResolved { mode: "none" });
    }

    #[test]
    fn test_event_serialization() {
        let event = CrawlEvent::JobFailed {
            url: "https://example.com/x".to_string(),
            attempts: 4,
            error: FetchError::HttpError(503),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "job_failed");
        assert_eq!(json["attempts"], 4);
        assert_eq!(json["error"], "HTTP status 503");
    }
}
