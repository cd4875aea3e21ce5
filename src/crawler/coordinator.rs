//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the job loop that ties the pipeline together:
//! - Seeding and draining the frontier breadth-first
//! - Checking robots.txt before each fetch
//! - Fetching, parsing and running the extractors
//! - Accumulating records and per-URL errors
//! - Building the final report
//!
//! Per-URL failures are recorded and the loop moves on; only setup failures
//! (such as an output directory that cannot be created) end a job with an error.

use crate::config::Config;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::PageParser;
use crate::crawler::renderer::Renderer;
use crate::extract::ExtractionPipeline;
use crate::output::{CrawlOutput, CrawlRecords, RawHtmlSink, RawHtmlStore};
use crate::robots::RobotsCache;
use crate::state::PageState;
use crate::PipelineError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Pages between two progress log lines
const PROGRESS_INTERVAL: u32 = 10;

/// Main crawler coordinator structure
///
/// Owns every piece of job state: nothing here is shared with another job.
pub struct Coordinator {
    config: Config,
    output_dir: PathBuf,
    frontier: Frontier,
    robots: RobotsCache,
    fetcher: Fetcher,
    parser: PageParser,
    extraction: ExtractionPipeline,
    records: CrawlRecords,
    raw_sink: Option<Box<dyn RawHtmlSink>>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - A validated job configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(PipelineError)` - The output locations or HTTP clients could not be set up
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        let output_dir = PathBuf::from(&config.output.output_dir);
        std::fs::create_dir_all(&output_dir)?;

        let raw_sink: Option<Box<dyn RawHtmlSink>> = if config.output.save_raw_html {
            Some(Box::new(RawHtmlStore::new(&output_dir)?))
        } else {
            None
        };

        Ok(Self {
            frontier: Frontier::from_config(&config),
            robots: RobotsCache::new(&config.fetch.bot_user_agent)?,
            fetcher: Fetcher::new(&config)?,
            parser: PageParser::new(),
            extraction: ExtractionPipeline::new(&config, &output_dir)?,
            records: CrawlRecords::new(),
            raw_sink,
            output_dir,
            config,
        })
    }

    /// Replaces the renderer used for dynamic re-fetches
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.fetcher = self.fetcher.with_renderer(renderer);
        self
    }

    /// Replaces the raw HTML side-channel; `None` disables it
    pub fn with_raw_sink(mut self, sink: Option<Box<dyn RawHtmlSink>>) -> Self {
        self.raw_sink = sink;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Runs the job to completion
    ///
    /// Seeds the start URL at depth 0, then processes frontier entries until
    /// `page_limit` pages completed or the frontier runs dry. Every dequeued
    /// URL is marked visited whatever its outcome.
    pub async fn run(&mut self) -> Result<CrawlOutput, PipelineError> {
        self.records = CrawlRecords::new();

        let start_url = self.config.crawl.start_url.clone();
        let page_limit = self.config.crawl.page_limit;
        tracing::info!(
            start_url = %start_url,
            max_depth = self.config.crawl.max_depth,
            page_limit,
            "Starting crawl"
        );

        if !self.frontier.add(&start_url, 0) {
            tracing::warn!(start_url = %start_url, "Start URL was not accepted by the frontier");
        }

        let started = Instant::now();
        let mut pages_crawled: u32 = 0;

        while pages_crawled < page_limit {
            let (url, depth) = match self.frontier.next() {
                Some(entry) => entry,
                None => {
                    tracing::info!(pages_crawled, "Frontier exhausted");
                    break;
                }
            };

            let state = self.process_url(&url, depth).await;
            self.frontier.mark_visited(&url);
            tracing::debug!(url = %url, depth, state = %state, "URL done");

            if state.counts_toward_limit() {
                pages_crawled += 1;

                if pages_crawled % PROGRESS_INTERVAL == 0 {
                    let elapsed = started.elapsed().as_secs_f64();
                    tracing::info!(
                        pages_crawled,
                        queue_size = self.frontier.queue_size(),
                        pages_per_sec = %format!("{:.2}", pages_crawled as f64 / elapsed.max(f64::EPSILON)),
                        "Progress"
                    );
                }
            }
        }

        self.fetcher.close().await;
        self.records.finish();
        let report = self.records.report();
        tracing::info!(
            total_pages = report.total_pages,
            failed_pages = report.failed_pages,
            total_images = report.total_images,
            external_links = report.external_links,
            elapsed_seconds = report.elapsed_seconds,
            "Crawl complete"
        );

        Ok(CrawlOutput {
            records: std::mem::take(&mut self.records),
            report,
        })
    }

    /// Processes a single URL
    ///
    /// Robots check, fetch, optional raw save, parse, extract, accumulate and
    /// enqueue children at `depth + 1`. Failures become error entries.
    async fn process_url(&mut self, url: &str, depth: u32) -> PageState {
        if self.config.crawl.respect_robots && !self.robots.can_fetch(url).await {
            tracing::info!(url = %url, "Blocked by robots.txt");
            return PageState::RobotsBlocked;
        }

        let fetched = self.fetcher.fetch(url).await;
        if !fetched.ok() {
            let message = fetch_error_message(&fetched);
            tracing::warn!(url = %url, status = fetched.status_code, error = %message, "Fetch failed");
            self.records.add_error(url, message);
            return PageState::FetchFailed;
        }

        if let Some(sink) = self.raw_sink.as_mut() {
            if let Err(e) = sink.save(
                url,
                &fetched.html,
                fetched.status_code,
                fetched.response_time,
            ) {
                tracing::warn!(url = %url, error = %e, "Failed to save raw HTML");
            }
        }

        let charset = fetched.declared_charset();
        let parsed = match self.parser.parse(&fetched.html, url, charset.as_deref()) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Parse failed");
                self.records.add_error(url, format!("Parse error: {}", e));
                return PageState::ParseFailed;
            }
        };

        let extracted = self.extraction.run(&parsed).await;
        let links_found = extracted.internal_links.len();
        let images = extracted.images.len();

        if let Some(page) = extracted.page {
            self.records.add_page(page);
        }
        self.records.add_images(extracted.images);
        self.records.add_external_links(extracted.external_links);

        let mut enqueued = 0;
        for link in &extracted.internal_links {
            if self.frontier.add(link, depth + 1) {
                enqueued += 1;
            }
        }

        tracing::info!(
            url = %url,
            depth,
            links_found,
            enqueued,
            images,
            method = ?fetched.method,
            "Page processed"
        );
        PageState::Completed
    }
}

/// Error text recorded for a fetch that did not produce a usable page
///
/// Transport failures carry status 0, so they read `HTTP 0: <cause>`.
fn fetch_error_message(result: &FetchResult) -> String {
    format!(
        "HTTP {}: {}",
        result.status_code,
        result.error.as_deref().unwrap_or("Bad status")
    )
}

/// Runs one crawl job
///
/// # Example
///
/// ```no_run
/// use site_pipeline::config::load_config;
/// use site_pipeline::crawler::run_job;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("pipeline.toml"))?;
/// let output = run_job(config).await?;
/// println!("{} pages", output.report.total_pages);
/// # Ok(())
/// # }
/// ```
pub async fn run_job(config: Config) -> Result<CrawlOutput, PipelineError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FetchMethod;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn result(status_code: u16, error: Option<&str>) -> FetchResult {
        FetchResult {
            url: "https://example.com/".to_string(),
            status_code,
            html: String::new(),
            headers: HashMap::new(),
            response_time: 0.0,
            method: FetchMethod::Static,
            error: error.map(str::to_string),
        }
    }

    fn test_config(start_url: &str, dir: &TempDir) -> Config {
        let mut config = Config::new(start_url);
        config.crawl.max_depth = 1;
        config.crawl.page_limit = 5;
        config.fetch.rate_limit = 0.01;
        config.fetch.request_timeout = 5;
        config.fetch.max_retries = 0;
        config.fetch.dynamic_fallback = false;
        config.output.output_dir = dir.path().join("out").to_string_lossy().to_string();
        config.output.download_images = false;
        config
    }

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html; charset=utf-8")
            .set_body_string(format!(
                "<html><head><title>Test</title></head><body>{}</body></html>",
                body
            ))
    }

    #[test]
    fn test_fetch_error_messages() {
        assert_eq!(
            fetch_error_message(&result(0, Some("connection refused"))),
            "HTTP 0: connection refused"
        );
        assert_eq!(fetch_error_message(&result(404, None)), "HTTP 404: Bad status");
        assert_eq!(
            fetch_error_message(&result(200, Some("body read failed"))),
            "HTTP 200: body read failed"
        );
    }

    #[tokio::test]
    async fn test_new_creates_output_dirs() {
        let dir = TempDir::new().unwrap();
        let config = test_config("https://example.com/", &dir);

        let coordinator = Coordinator::new(config).unwrap();

        assert!(coordinator.output_dir().join("raw_html").is_dir());
        assert!(coordinator.output_dir().join("images").is_dir());
    }

    #[tokio::test]
    async fn test_blocked_and_failed_pages_do_not_count() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(&format!(
                r#"<p>Home</p><a href="{0}/private">Private</a><a href="{0}/missing">Missing</a><a href="{0}/ok">Ok</a>"#,
                base
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(html("<p>Fine</p>"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut coordinator = Coordinator::new(test_config(&format!("{}/", base), &dir)).unwrap();
        let output = coordinator.run().await.unwrap();

        assert_eq!(output.report.total_pages, 2);
        assert_eq!(output.report.failed_pages, 1);
        assert_eq!(output.records.errors[0].error, "HTTP 404: Bad status");
        assert!(coordinator.frontier().is_visited(&format!("{}/private", base)));
        assert!(coordinator.frontier().is_visited(&format!("{}/missing", base)));
        assert_eq!(coordinator.frontier().visited_count(), 4);
    }

    #[tokio::test]
    async fn test_page_limit_stops_crawl() {
        let server = MockServer::start().await;
        let base = server.uri();

        let links: String = (0..5)
            .map(|i| format!(r#"<a href="{}/p{}">p{}</a>"#, base, i, i))
            .collect();
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(&links))
            .mount(&server)
            .await;
        for i in 0..5 {
            Mock::given(method("GET"))
                .and(path(format!("/p{}", i)))
                .respond_with(html("<p>child</p>"))
                .mount(&server)
                .await;
        }

        let dir = TempDir::new().unwrap();
        let mut config = test_config(&format!("{}/", base), &dir);
        config.crawl.page_limit = 3;
        config.crawl.respect_robots = false;

        let output = run_job(config).await.unwrap();

        assert_eq!(output.report.total_pages, 3);
        assert_eq!(output.records.pages[0].url, format!("{}/", base));
    }

    #[tokio::test]
    async fn test_raw_html_saved_only_when_enabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html("<p>Raw</p>"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut config = test_config(&format!("{}/", server.uri()), &dir);
        config.crawl.respect_robots = false;
        let mut coordinator = Coordinator::new(config).unwrap();
        coordinator.run().await.unwrap();

        let domain_dirs: Vec<_> = std::fs::read_dir(coordinator.output_dir().join("raw_html"))
            .unwrap()
            .collect();
        assert_eq!(domain_dirs.len(), 1);

        let dir = TempDir::new().unwrap();
        let mut config = test_config(&format!("{}/", server.uri()), &dir);
        config.crawl.respect_robots = false;
        config.output.save_raw_html = false;
        let coordinator = Coordinator::new(config).unwrap();
        assert!(!coordinator.output_dir().join("raw_html").exists());
    }

    #[tokio::test]
    async fn test_transport_failure_recorded_with_status_zero() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config("http://127.0.0.1:9/", &dir);
        config.crawl.respect_robots = false;

        let output = run_job(config).await.unwrap();

        assert_eq!(output.report.total_pages, 0);
        assert_eq!(output.report.failed_pages, 1);
        assert!(output.report.errors[0].error.starts_with("HTTP 0: "));
    }

    #[tokio::test]
    async fn test_blank_body_yields_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("   \n  "),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut config = test_config(&format!("{}/", server.uri()), &dir);
        config.crawl.respect_robots = false;

        let output = run_job(config).await.unwrap();

        assert_eq!(output.report.failed_pages, 0);
        assert_eq!(output.report.total_pages, 1);
        let page = &output.records.pages[0];
        assert!(page.title.is_empty());
        assert!(page.content.is_empty());
    }
}
