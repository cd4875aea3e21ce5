//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use site_pipeline::config::Config;
use site_pipeline::crawler::{run_job, Coordinator, RenderedPage, Renderer};
use site_pipeline::PipelineError;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `dir`
fn create_test_config(start_url: &str, dir: &TempDir) -> Config {
    let mut config = Config::new(start_url);
    config.crawl.max_depth = 1;
    config.crawl.page_limit = 5;
    config.fetch.rate_limit = 0.01; // Very short for testing
    config.fetch.request_timeout = 5;
    config.fetch.max_retries = 0;
    config.fetch.dynamic_fallback = false;
    config.output.output_dir = dir.path().join("dataset").to_string_lossy().to_string();
    config.output.min_image_size = 100;
    config
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if (x / 25 + y / 25) % 2 == 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ))
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // No robots.txt mounted: the 404 means everything is allowed

    // Mock index page with 2 internal links, 1 external link and 2 images
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            &format!(
                r#"<h1>Welcome</h1>
                <p>This is the landing page of the test site.</p>
                <a href="{0}/about">About</a>
                <a href="{0}/blog">Blog</a>
                <a href="https://other.org/page">Elsewhere</a>
                <img src="{0}/img/big.png" alt="Big picture">
                <img src="{0}/img/small.png" alt="Tiny icon">"#,
                base_url
            ),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_page("About", "<h1>About</h1><p>About us.</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/blog"))
        .respond_with(html_page("Blog", "<h1>Blog</h1><p>No posts yet.</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/big.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png(200, 200)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/small.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png(50, 50)),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let start_url = format!("{}/", base_url);
    let mut coordinator = Coordinator::new(create_test_config(&start_url, &dir)).unwrap();
    let output = coordinator.run().await.unwrap();

    // The seed page completed exactly once
    let seed_records: Vec<_> = output
        .records
        .pages
        .iter()
        .filter(|p| p.url == start_url)
        .collect();
    assert_eq!(seed_records.len(), 1);
    assert_eq!(seed_records[0].title, "Home");
    assert!(coordinator.frontier().is_visited(&start_url));

    // Both internal links were followed at depth 1
    assert_eq!(output.report.total_pages, 3);
    assert_eq!(output.report.failed_pages, 0);

    // Only the image above the minimum size is kept
    assert_eq!(output.records.images.len(), 1);
    let image = &output.records.images[0];
    assert_eq!(image.image_url, format!("{}/img/big.png", base_url));
    assert_eq!(image.alt_text, "Big picture");
    assert_eq!(image.source_page, start_url);
    assert!(Path::new(&image.image_path).exists());

    // One distinct external link
    assert_eq!(output.report.external_links, 1);
    assert_eq!(output.report.total_images, 1);

    // Raw HTML was written for every fetched page
    let raw_root = dir.path().join("dataset").join("raw_html");
    let domain_dir = std::fs::read_dir(&raw_root)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let gz_count = std::fs::read_dir(domain_dir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .ends_with(".html.gz")
        })
        .count();
    assert_eq!(gz_count, 3);
}

#[tokio::test]
async fn test_robots_blocks_everything() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The page must never be requested
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<p>Hidden</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = run_job(create_test_config(&format!("{}/", base_url), &dir))
        .await
        .unwrap();

    assert_eq!(output.report.total_pages, 0);
    assert_eq!(output.report.failed_pages, 0);
    assert!(output.records.finished_at.is_some());
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<p>Visible</p>"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&format!("{}/", base_url), &dir);
    config.crawl.respect_robots = false;

    let output = run_job(config).await.unwrap();
    assert_eq!(output.report.total_pages, 1);
}

#[tokio::test]
async fn test_failed_job_still_reports() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let start_url = format!("{}/", base_url);
    let output = run_job(create_test_config(&start_url, &dir)).await.unwrap();

    assert_eq!(output.report.total_pages, 0);
    assert_eq!(output.report.failed_pages, 1);
    assert_eq!(output.report.errors[0].url, start_url);
    assert_eq!(output.report.errors[0].error, "HTTP 500: Bad status");
}

#[tokio::test]
async fn test_depth_limit_respected() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            &format!(r#"<a href="{}/level1">Level 1</a>"#, base_url),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/level1"))
        .respond_with(html_page(
            "Level 1",
            &format!(r#"<a href="{}/level2">Level 2</a>"#, base_url),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Beyond max-depth: never fetched
    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(html_page("Level 2", "<p>Too deep</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&format!("{}/", base_url), &dir);
    config.crawl.respect_robots = false;

    let output = run_job(config).await.unwrap();
    assert_eq!(output.report.total_pages, 2);
}

/// Renders a fixed document in place of a browser
struct FixedRenderer;

#[async_trait]
impl Renderer for FixedRenderer {
    async fn render(&self, _url: &str, _wait: Duration) -> Result<RenderedPage, PipelineError> {
        Ok(RenderedPage {
            html: "<html><head><title>Rendered App</title></head><body>\
                   <h1>Dashboard</h1><p>Content that only exists after scripts run.</p>\
                   </body></html>"
                .to_string(),
            status_code: 200,
        })
    }
}

#[tokio::test]
async fn test_js_heavy_page_uses_rendered_markup() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let scripts: String = (0..8)
        .map(|i| format!(r#"<script src="/static/chunk{}.js"></script>"#, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!(
                    r#"<html><head><title>Loading</title></head><body><div id="root"></div>{}</body></html>"#,
                    scripts
                )),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&format!("{}/", base_url), &dir);
    config.crawl.respect_robots = false;
    config.fetch.dynamic_fallback = true;

    let mut coordinator = Coordinator::new(config)
        .unwrap()
        .with_renderer(Arc::new(FixedRenderer));
    let output = coordinator.run().await.unwrap();

    assert_eq!(output.records.pages.len(), 1);
    assert_eq!(output.records.pages[0].title, "Rendered App");
    assert!(output.records.pages[0].content.contains("only exists after scripts run"));
}
