//! Site-Pipeline: a polite single-site crawler and page extractor
//!
//! This crate crawls one website breadth-first, fetching pages under a strict
//! politeness contract (serialized, rate-limited, robots-aware, retrying), and
//! turns every page into structured records: text, links and images.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTML parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("{extractor} extraction failed for {url}: {message}")]
    Extraction {
        extractor: &'static str,
        url: String,
        message: String,
    },

    #[error("Robots.txt error for {domain}: {message}")]
    Robots { domain: String, message: String },

    #[error("Render error for {url}: {message}")]
    Render { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
///
/// `Validation` is raised before a job starts and never reaches the crawl loop.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Site-Pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_job, Coordinator, Frontier};
pub use output::{CrawlOutput, JobReport};
pub use state::PageState;
pub use url::{netloc, normalize_url};
