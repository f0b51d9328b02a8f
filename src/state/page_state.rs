/// Page state definitions for tracking crawl progress
use serde::Serialize;
use std::fmt;

/// Represents the current state of a URL in a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    // ===== Active States =====
    /// URL has been admitted to the frontier and awaits a worker
    Pending,

    /// A worker is fetching the URL
    Fetching,

    // ===== Terminal States =====
    /// Page was fetched and extracted into a page record
    Succeeded,

    /// robots.txt denied the URL
    Blocked,

    /// Every fetch attempt failed
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if this is an active state (URL may still be processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Fetching)
    }

    /// Returns true if the URL produced a page record
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if children of this URL may be admitted
    pub fn enqueues_children(&self) -> bool {
        self.is_success()
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Succeeded)
                | (Self::Fetching, Self::Blocked)
                | (Self::Fetching, Self::Failed)
        )
    }

    /// Stable lowercase name used in logs and output files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Succeeded => "succeeded",
            Self::Blocked => "blocked",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Succeeded,
            Self::Blocked,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
