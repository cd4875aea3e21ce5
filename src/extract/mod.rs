//! Per-page extraction
//!
//! Three extractors run on every parsed page: text, links and images. Each
//! one fails on its own; a failing extractor contributes an empty result and
//! the other two still run.

mod images;
mod links;
mod text;

pub use images::{guess_extension, perceptual_hash, ImageExtractor, ImageRecord};
pub use links::{LinkExtractor, PageLinks};
pub use text::{Heading, PageRecord, TextExtractor};

use crate::config::Config;
use crate::crawler::ParsedPage;
use crate::PipelineError;
use std::path::Path;

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// `None` when text extraction failed
    pub page: Option<PageRecord>,
    pub images: Vec<ImageRecord>,
    pub internal_links: Vec<String>,
    pub external_links: Vec<String>,
}

/// The job's set of extractors
pub struct ExtractionPipeline {
    text: TextExtractor,
    links: LinkExtractor,
    images: ImageExtractor,
}

impl ExtractionPipeline {
    /// Builds the extractors for a job
    ///
    /// Fails only if the images directory cannot be created under `output_dir`.
    pub fn new(config: &Config, output_dir: &Path) -> Result<Self, PipelineError> {
        Ok(Self {
            text: TextExtractor::new()?,
            links: LinkExtractor::new(config.allowed_domains())?,
            images: ImageExtractor::new(
                output_dir,
                config.output.min_image_size,
                config.output.download_images,
            )?,
        })
    }

    /// Runs all extractors on a page
    pub async fn run(&mut self, page: &ParsedPage) -> ExtractionResult {
        let mut result = ExtractionResult::default();

        match self.text.extract(page) {
            Ok(record) => result.page = Some(record),
            Err(e) => tracing::warn!(url = %page.url, error = %e, "Text extraction failed"),
        }

        match self.links.extract(page) {
            Ok(links) => {
                result.internal_links = links.internal;
                result.external_links = links.external;
            }
            Err(e) => tracing::warn!(url = %page.url, error = %e, "Link extraction failed"),
        }

        match self.images.extract(page).await {
            Ok(images) => result.images = images,
            Err(e) => tracing::warn!(url = %page.url, error = %e, "Image extraction failed"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn page(url: &str, html: &str) -> ParsedPage {
        ParsedPage {
            url: url.to_string(),
            cleaned_html: html.to_string(),
            readable_text: "Main text".to_string(),
            readable_html: String::new(),
            encoding: "utf-8".to_string(),
        }
    }

    fn pipeline(dir: &TempDir) -> ExtractionPipeline {
        let mut config = Config::new("https://example.com/");
        config.output.download_images = false;
        ExtractionPipeline::new(&config, dir.path()).unwrap()
    }

    #[tokio::test]
    async fn test_all_extractors_contribute() {
        let dir = TempDir::new().unwrap();
        let html = "<html><head><title>T</title></head><body>\
                    <a href=\"/next\">Next</a><a href=\"https://other.org/\">Out</a>\
                    <img src=\"/pic.jpg\" alt=\"pic\"></body></html>";

        let result = pipeline(&dir).run(&page("https://example.com/", html)).await;

        let record = result.page.unwrap();
        assert_eq!(record.title, "T");
        assert_eq!(record.content, "Main text");
        assert_eq!(result.internal_links, vec!["https://example.com/next"]);
        assert_eq!(result.external_links, vec!["https://other.org/"]);
        assert_eq!(result.images.len(), 1);
        assert!(dir.path().join("images").is_dir());
    }

    #[tokio::test]
    async fn test_failing_extractor_is_isolated() {
        let dir = TempDir::new().unwrap();
        // A page URL that cannot serve as a base breaks link and image
        // extraction but not the text record
        let result = pipeline(&dir)
            .run(&page("not a url", "<html><head><title>Still here</title></head></html>"))
            .await;

        assert_eq!(result.page.unwrap().title, "Still here");
        assert!(result.internal_links.is_empty());
        assert!(result.external_links.is_empty());
        assert!(result.images.is_empty());
    }
}
