//! Robots.txt handling module
//!
//! This module fetches, parses and caches robots.txt per network location.
//! The policy is fail-open: when rules cannot be obtained, every URL is allowed.

mod cache;
mod parser;

pub use cache::{product_token, RobotsCache, RobotsEntry};
pub use parser::ParsedRobots;
