//! Frontier and visited-set management
//!
//! The frontier handles:
//! - Deduplicated admission of discovered URLs (normalized form)
//! - Depth and page-count bounds
//! - Breadth-first hand-out, one depth level at a time
//! - Per-URL state tracking with transition checks
//!
//! All bookkeeping sits behind a single mutex so the check-then-insert of
//! admission is atomic with respect to concurrent workers.

use crate::state::PageState;
use crate::url::normalize_url;
use crate::HarvestError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// A URL admitted for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: Url,

    /// Link distance from the seed (seed = 0)
    pub depth: u32,

    /// Page the URL was discovered on
    pub parent: Option<Url>,
}

#[derive(Debug, Default)]
struct FrontierState {
    /// Admitted but not yet handed out
    pending: VecDeque<FrontierEntry>,

    /// State of every admitted URL, keyed by normalized URL
    states: HashMap<String, PageState>,

    /// URLs a worker has started fetching
    visited: HashSet<String>,
}

/// Breadth-first frontier with a visited set
pub struct Frontier {
    max_depth: u32,
    max_pages: usize,
    inner: Mutex<FrontierState>,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `max_depth` - Deepest admissible depth (seed = 0)
    /// * `max_pages` - Upper bound on admitted URLs (visited + pending)
    pub fn new(max_depth: u32, max_pages: usize) -> Self {
        Self {
            max_depth,
            max_pages,
            inner: Mutex::new(FrontierState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admits `candidate` at `depth` if it is new and within bounds
    ///
    /// Returns true iff the URL was added. A URL that is already pending,
    /// fetching or done, deeper than `max_depth`, not a valid http(s) URL, or
    /// arrives once `max_pages` URLs have been admitted is rejected.
    pub fn admit(&self, candidate: &str, depth: u32, parent: Option<&Url>) -> bool {
        if depth > self.max_depth {
            tracing::trace!("Not admitting {}: depth {} > {}", candidate, depth, self.max_depth);
            return false;
        }

        let url = match normalize_url(candidate) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Not admitting {}: {}", candidate, e);
                return false;
            }
        };
        let key = url.as_str().to_string();

        let mut state = self.lock();
        if state.states.contains_key(&key) {
            return false;
        }
        if state.states.len() >= self.max_pages {
            tracing::trace!("Not admitting {}: page bound {} reached", key, self.max_pages);
            return false;
        }

        state.states.insert(key, PageState::Pending);
        state.pending.push_back(FrontierEntry {
            url,
            depth,
            parent: parent.cloned(),
        });
        true
    }

    /// Hands out every pending entry
    ///
    /// Children are only admitted at `depth + 1` of the level being processed,
    /// so each batch holds exactly one depth level.
    pub fn take_level(&self) -> Vec<FrontierEntry> {
        self.lock().pending.drain(..).collect()
    }

    /// Moves `url` to `Fetching` and records it as visited
    ///
    /// Fails if the URL was not pending, so no URL is fetched twice.
    pub fn start(&self, url: &Url) -> Result<(), HarvestError> {
        let mut state = self.lock();
        transition(&mut state, url, PageState::Fetching)?;
        state.visited.insert(url.as_str().to_string());
        Ok(())
    }

    /// Moves `url` from `Fetching` to a terminal state
    pub fn finish(&self, url: &Url, outcome: PageState) -> Result<(), HarvestError> {
        transition(&mut self.lock(), url, outcome)
    }

    /// Current state of `url` (normalized form), if admitted
    pub fn state_of(&self, url: &Url) -> Option<PageState> {
        self.lock().states.get(url.as_str()).copied()
    }

    /// Number of URLs a worker has started fetching
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// Number of URLs admitted so far (visited + pending + handed out)
    pub fn admitted_count(&self) -> usize {
        self.lock().states.len()
    }

    /// Returns true if no entries await hand-out
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Counts admitted URLs per state
    pub fn state_counts(&self) -> HashMap<PageState, usize> {
        let mut counts = HashMap::new();
        for state in self.lock().states.values() {
            *counts.entry(*state).or_insert(0) += 1;
        }
        counts
    }
}

fn transition(state: &mut FrontierState, url: &Url, next: PageState) -> Result<(), HarvestError> {
    let key = url.as_str();
    let current = state
        .states
        .get(key)
        .copied()
        .unwrap_or(PageState::Pending);

    if !state.states.contains_key(key) || !current.can_transition_to(next) {
        return Err(HarvestError::InvalidTransition {
            url: key.to_string(),
            from: current,
            to: next,
        });
    }

    state.states.insert(key.to_string(), next);
    Ok(())
}
