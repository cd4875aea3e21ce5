//! URL handling module for Site-Pipeline
//!
//! This module provides URL normalization, URL hashing for dedup, and the
//! host helpers used for allow-list checks.

mod domain;
mod normalize;

pub use domain::{is_allowed_host, netloc, strip_www};
pub use normalize::{normalize_url, url_hash};
