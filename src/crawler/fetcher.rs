//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - The politeness gate: one dispatch at a time, spaced by the rate limit
//! - User-agent rotation
//! - Retry with exponential backoff on transport errors
//! - The JS-heavy heuristic and the dynamic (rendered) re-fetch
//!
//! Failures never escape as errors; they are encoded in [`FetchResult`].

use crate::config::Config;
use crate::crawler::renderer::{HeadlessRenderer, Renderer};
use crate::PipelineError;
use rand::seq::SliceRandom;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Longest wait between two attempts
const MAX_BACKOFF_SECS: u64 = 30;

/// Body text to markup ratio under which a page may be script-rendered
const JS_TEXT_RATIO: f64 = 0.05;

/// Script tags a page needs beyond which a low ratio counts as JS-heavy
const JS_SCRIPT_COUNT: usize = 5;

/// How a page was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Static,
    Dynamic,
}

/// Outcome of fetching one URL
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The requested URL
    pub url: String,

    /// HTTP status, 0 when no response was received
    pub status_code: u16,

    /// Decoded markup
    pub html: String,

    /// Response headers, lowercase names
    pub headers: HashMap<String, String>,

    /// Seconds from dispatch to full body
    pub response_time: f64,

    pub method: FetchMethod,

    /// Last transport or render error
    pub error: Option<String>,
}

impl FetchResult {
    /// Status in [200, 400), a non-empty body and no error
    pub fn ok(&self) -> bool {
        (200..400).contains(&self.status_code) && !self.html.is_empty() && self.error.is_none()
    }

    fn failed(url: &str, method: FetchMethod, error: String, response_time: f64) -> Self {
        Self {
            url: url.to_string(),
            status_code: 0,
            html: String::new(),
            headers: HashMap::new(),
            response_time,
            method,
            error: Some(error),
        }
    }

    /// Charset declared in the Content-Type header, if any
    pub fn declared_charset(&self) -> Option<String> {
        let content_type = self.headers.get("content-type")?;
        content_type.split(';').find_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_lowercase())
        })
    }
}

/// Rate-limited, retrying page fetcher
pub struct Fetcher {
    client: Client,
    user_agents: Vec<String>,
    rate_limit: Duration,
    request_timeout: Duration,
    max_retries: u32,
    dynamic_fallback: bool,
    renderer: Arc<dyn Renderer>,
    /// Start of the previous dispatch; held for the whole request
    gate: Mutex<Option<Instant>>,
}

impl Fetcher {
    /// Builds a fetcher from the job's fetch settings
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| PipelineError::Http {
                url: config.crawl.start_url.clone(),
                source: e,
            })?;

        let user_agents: Vec<String> = config
            .fetch
            .user_agents
            .iter()
            .filter(|ua| !ua.trim().is_empty())
            .cloned()
            .collect();

        Ok(Self {
            client,
            user_agents,
            rate_limit: config.rate_limit(),
            request_timeout: config.request_timeout(),
            max_retries: config.fetch.max_retries,
            dynamic_fallback: config.fetch.dynamic_fallback,
            renderer: Arc::new(HeadlessRenderer::new()),
            gate: Mutex::new(None),
        })
    }

    /// Replaces the renderer used for dynamic re-fetches
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Shuts down the renderer
    pub async fn close(&self) {
        self.renderer.close().await;
    }

    /// Fetches a page, re-rendering it when the static markup looks JS-heavy
    ///
    /// The rendered result replaces the static one only if it is itself `ok`.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let result = self.fetch_with_retries(url).await;

        if result.ok()
            && self.dynamic_fallback
            && self.renderer.is_available()
            && looks_js_heavy(&result.html)
        {
            tracing::info!(url = %url, "Dynamic fallback triggered");
            let dynamic = self.fetch_dynamic(url).await;
            if dynamic.ok() {
                return dynamic;
            }
            tracing::debug!(
                url = %url,
                error = dynamic.error.as_deref().unwrap_or("not ok"),
                "Dynamic fetch failed, keeping static result"
            );
        }

        result
    }

    /// Up to `max_retries + 1` static attempts
    ///
    /// Only transport errors are retried; any HTTP response is returned as is.
    pub async fn fetch_with_retries(&self, url: &str) -> FetchResult {
        let mut last_error = String::new();
        let started = Instant::now();

        for attempt in 0..=self.max_retries {
            match self.fetch_static(url).await {
                Ok(result) => return result,
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(
                        url = %url,
                        attempt = attempt + 1,
                        max_attempts = self.max_retries + 1,
                        error = %last_error,
                        "Fetch attempt failed"
                    );
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
        }

        FetchResult::failed(
            url,
            FetchMethod::Static,
            last_error,
            started.elapsed().as_secs_f64(),
        )
    }

    /// One GET with a random user agent
    pub async fn fetch_static(&self, url: &str) -> Result<FetchResult, PipelineError> {
        let user_agent = self.pick_user_agent();
        let _slot = self.acquire_slot().await;
        let started = Instant::now();

        let mut request = self.client.get(url);
        if let Some(ua) = user_agent {
            request = request.header(reqwest::header::USER_AGENT, ua);
        }

        let response = request.send().await.map_err(|e| PipelineError::Http {
            url: url.to_string(),
            source: e,
        })?;

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        // Decodes with the declared charset, replacing invalid sequences
        let html = response.text().await.map_err(|e| PipelineError::Http {
            url: url.to_string(),
            source: e,
        })?;

        Ok(FetchResult {
            url: url.to_string(),
            status_code,
            html,
            headers,
            response_time: started.elapsed().as_secs_f64(),
            method: FetchMethod::Static,
            error: None,
        })
    }

    /// One rendered attempt through the renderer
    async fn fetch_dynamic(&self, url: &str) -> FetchResult {
        let _slot = self.acquire_slot().await;
        let started = Instant::now();

        match self.renderer.render(url, self.request_timeout).await {
            Ok(page) => FetchResult {
                url: url.to_string(),
                status_code: page.status_code,
                html: page.html,
                headers: HashMap::new(),
                response_time: started.elapsed().as_secs_f64(),
                method: FetchMethod::Dynamic,
                error: None,
            },
            Err(e) => FetchResult::failed(
                url,
                FetchMethod::Dynamic,
                e.to_string(),
                started.elapsed().as_secs_f64(),
            ),
        }
    }

    /// Waits until a dispatch is allowed and holds the gate
    ///
    /// Spacing is measured from the start of the previous dispatch. The
    /// returned guard keeps other dispatches out until it is dropped.
    async fn acquire_slot(&self) -> tokio::sync::MutexGuard<'_, Option<Instant>> {
        let mut last = self.gate.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.rate_limit {
                tokio::time::sleep(self.rate_limit - elapsed).await;
            }
        }
        *last = Some(Instant::now());
        last
    }

    fn pick_user_agent(&self) -> Option<String> {
        self.user_agents.choose(&mut rand::thread_rng()).cloned()
    }
}

/// Wait before attempt `attempt + 1`: `min(2^attempt, 30)` seconds
pub fn backoff_delay(attempt: u32) -> Duration {
    let secs = 2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECS);
    Duration::from_secs(secs)
}

/// Heuristic for pages whose content is produced by scripts
///
/// True when the visible body text is under 5% of the markup and the page
/// carries more than 5 script tags, or when the parsed body holds no nodes at
/// all (head-only markup). An omitted `<body>` tag is not a missing body.
/// Blank markup is never JS-heavy.
pub fn looks_js_heavy(html: &str) -> bool {
    if html.trim().is_empty() {
        return false;
    }

    let document = Html::parse_document(html);
    let (Ok(body_selector), Ok(script_selector)) =
        (Selector::parse("body"), Selector::parse("script"))
    else {
        return false;
    };

    let Some(body) = document
        .select(&body_selector)
        .next()
        .filter(|body| body.has_children())
    else {
        return true;
    };

    let text_len: usize = body.text().map(|t| t.trim().chars().count()).sum();
    let markup_len = html.chars().count().max(1);
    let ratio = text_len as f64 / markup_len as f64;
    let scripts = document.select(&script_selector).count();

    ratio < JS_TEXT_RATIO && scripts > JS_SCRIPT_COUNT
}
