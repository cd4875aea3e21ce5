//! Configuration module for Site-Pipeline
//!
//! This module handles loading, parsing, and validating TOML job configuration.
//!
//! # Example
//!
//! ```no_run
//! use site_pipeline::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("job.toml")).unwrap();
//! println!("Crawling {} to depth {}", config.crawl.start_url, config.crawl.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlSettings, FetchSettings, OutputSettings, BOT_USER_AGENT, DEFAULT_USER_AGENTS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{validate, OUTPUT_FORMATS};
