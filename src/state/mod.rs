//! State module for tracking crawl progress
//!
//! Every URL admitted to a session moves through
//! `Pending -> Fetching -> {Succeeded, Blocked, Failed}`.

mod page_state;

pub use page_state::PageState;
