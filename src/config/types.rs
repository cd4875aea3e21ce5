use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// Browser user agents rotated across page requests
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.0; rv:120.0) Gecko/20100101 Firefox/120.0",
];

/// Identity used for robots.txt requests and rule matching
pub const BOT_USER_AGENT: &str = "WebsitePipelineBot/1.0 (+https://github.com/website-pipeline)";

/// Main configuration structure for one crawl job
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

/// What to crawl and how far
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// The seed URL
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Maximum BFS depth (the seed is depth 0)
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Number of successfully processed pages after which the job stops
    #[serde(rename = "page-limit", default = "default_page_limit")]
    pub page_limit: u32,

    /// Hosts the crawl may stay within; derived from the start URL when empty
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Honour robots.txt rules
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,
}

/// Politeness and fetch behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    /// Minimum seconds between two request dispatches
    #[serde(rename = "rate-limit", default = "default_rate_limit")]
    pub rate_limit: f64,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Retries after the first failed attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Re-fetch JS-heavy pages through the headless renderer
    #[serde(rename = "dynamic-fallback", default = "default_true")]
    pub dynamic_fallback: bool,

    /// Pool of user agents for page requests
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Identity presented to robots.txt
    #[serde(rename = "bot-user-agent", default = "default_bot_user_agent")]
    pub bot_user_agent: String,
}

/// Where records and side files go
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    /// Root directory for images and raw HTML
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,

    /// Dataset format handed to the exporter (parquet, csv or jsonl)
    #[serde(rename = "output-format", default = "default_output_format")]
    pub output_format: String,

    /// Keep a gzipped copy of each fetched page
    #[serde(rename = "save-raw-html", default = "default_true")]
    pub save_raw_html: bool,

    /// Download page images
    #[serde(rename = "download-images", default = "default_true")]
    pub download_images: bool,

    /// Images narrower or shorter than this (px) are dropped
    #[serde(rename = "min-image-size", default = "default_min_image_size")]
    pub min_image_size: u32,
}

fn default_max_depth() -> u32 {
    3
}

fn default_page_limit() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_rate_limit() -> f64 {
    1.0
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
}

fn default_bot_user_agent() -> String {
    BOT_USER_AGENT.to_string()
}

fn default_output_dir() -> String {
    "site_dataset".to_string()
}

fn default_output_format() -> String {
    "parquet".to_string()
}

fn default_min_image_size() -> u32 {
    100
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            dynamic_fallback: true,
            user_agents: default_user_agents(),
            bot_user_agent: default_bot_user_agent(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            output_format: default_output_format(),
            save_raw_html: true,
            download_images: true,
            min_image_size: default_min_image_size(),
        }
    }
}

impl Config {
    /// Builds a configuration with every setting at its default
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            crawl: CrawlSettings {
                start_url: start_url.into().trim().to_string(),
                max_depth: default_max_depth(),
                page_limit: default_page_limit(),
                allowed_domains: Vec::new(),
                respect_robots: true,
            },
            fetch: FetchSettings::default(),
            output: OutputSettings::default(),
        }
    }

    /// The effective allow-list of hosts for this job
    ///
    /// Configured domains are lowercased. When none are configured the set is
    /// derived from the start URL: its host, the host without `www.`, and the
    /// `www.` form of the bare host.
    pub fn allowed_domains(&self) -> BTreeSet<String> {
        if !self.crawl.allowed_domains.is_empty() {
            return self
                .crawl
                .allowed_domains
                .iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect();
        }

        let mut domains = BTreeSet::new();
        let Some(host) = Url::parse(&self.crawl.start_url)
            .ok()
            .and_then(|u| crate::url::netloc(&u))
        else {
            return domains;
        };

        let bare = crate::url::strip_www(&host).to_string();
        if bare != host {
            domains.insert(format!("www.{}", bare));
        }
        domains.insert(host);
        domains.insert(bare);
        domains
    }

    /// Per-request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.request_timeout)
    }

    /// Minimum spacing between dispatches as a Duration
    pub fn rate_limit(&self) -> Duration {
        Duration::from_secs_f64(self.fetch.rate_limit)
    }
}
