//! Per-domain robots.txt cache
//!
//! Each network location is looked up at most once per job. A failed lookup
//! is cached as `Unavailable` so the domain is not re-requested, and an
//! unavailable domain allows every URL.

use crate::robots::ParsedRobots;
use crate::url::netloc;
use crate::PipelineError;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// How long a robots.txt request may take
const ROBOTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Cached robots.txt state for one network location
#[derive(Debug, Clone)]
pub enum RobotsEntry {
    /// robots.txt was fetched with status 200
    Available {
        rules: ParsedRobots,
        crawl_delay: Option<f64>,
    },

    /// Fetch failed or returned a non-200 status
    Unavailable,
}

/// Job-scoped robots.txt cache
pub struct RobotsCache {
    client: Client,
    product_token: String,
    entries: HashMap<String, RobotsEntry>,
}

impl RobotsCache {
    /// Creates a cache that identifies itself with `bot_user_agent`
    ///
    /// Rules are matched against the product token of the agent, i.e. the
    /// text before the first `/` (`WebsitePipelineBot` for
    /// `WebsitePipelineBot/1.0 (+https://...)`).
    pub fn new(bot_user_agent: &str) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .user_agent(bot_user_agent)
            .timeout(ROBOTS_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Http {
                url: "robots.txt client".to_string(),
                source: e,
            })?;

        Ok(Self {
            client,
            product_token: product_token(bot_user_agent),
            entries: HashMap::new(),
        })
    }

    /// Whether robots.txt permits fetching `url`
    ///
    /// URLs that cannot be parsed are allowed; they are rejected elsewhere.
    pub async fn can_fetch(&mut self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return true;
        };
        let Some(domain) = self.load(&parsed).await else {
            return true;
        };

        match self.entries.get(&domain) {
            Some(RobotsEntry::Available { rules, .. }) => rules.is_allowed(url, &self.product_token),
            _ => true,
        }
    }

    /// Crawl-delay declared by the domain of `url`, in seconds
    ///
    /// Informational only; the fetcher's own rate limit is what paces requests.
    pub async fn crawl_delay(&mut self, url: &str) -> Option<f64> {
        let parsed = Url::parse(url).ok()?;
        let domain = self.load(&parsed).await?;

        match self.entries.get(&domain) {
            Some(RobotsEntry::Available { crawl_delay, .. }) => *crawl_delay,
            _ => None,
        }
    }

    /// Number of domains looked up so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Makes sure the domain of `url` has an entry and returns its key
    async fn load(&mut self, url: &Url) -> Option<String> {
        let domain = netloc(url)?;
        if self.entries.contains_key(&domain) {
            return Some(domain);
        }

        let robots_url = format!("{}://{}/robots.txt", url.scheme(), domain);
        let entry = match self.fetch(&robots_url).await {
            Ok(Some(content)) => {
                let rules = ParsedRobots::from_content(&content);
                let crawl_delay = rules.crawl_delay(&self.product_token);
                tracing::debug!(domain = %domain, crawl_delay = ?crawl_delay, "robots.txt loaded");
                RobotsEntry::Available { rules, crawl_delay }
            }
            Ok(None) => {
                tracing::debug!(domain = %domain, "robots.txt not available, allowing all");
                RobotsEntry::Unavailable
            }
            Err(e) => {
                tracing::warn!(domain = %domain, error = %e, "robots.txt fetch failed, allowing all");
                RobotsEntry::Unavailable
            }
        };

        self.entries.insert(domain.clone(), entry);
        Some(domain)
    }

    /// Fetches robots.txt; `Ok(None)` for any status other than 200
    async fn fetch(&self, robots_url: &str) -> Result<Option<String>, PipelineError> {
        let response = self
            .client
            .get(robots_url)
            .send()
            .await
            .map_err(|e| PipelineError::Robots {
                domain: robots_url.to_string(),
                message: e.to_string(),
            })?;

        if response.status() != StatusCode::OK {
            return Ok(None);
        }

        let body = response.text().await.map_err(|e| PipelineError::Robots {
            domain: robots_url.to_string(),
            message: e.to_string(),
        })?;

        Ok(Some(body))
    }
}

/// Product token of a user agent string
pub fn product_token(user_agent: &str) -> String {
    user_agent
        .split('/')
        .next()
        .unwrap_or(user_agent)
        .trim()
        .to_string()
}
