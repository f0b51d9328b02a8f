//! URL handling module for Page-Harvest
//!
//! This module provides link absolutization, URL canonicalization for the
//! visited set, and host/origin helpers used by the robots gate.

mod domain;
mod normalize;

pub use domain::{origin_key, robots_url};
pub use normalize::{absolutize, normalize_url};
