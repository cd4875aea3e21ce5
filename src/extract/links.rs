//! Link discovery and internal/external classification

use crate::crawler::ParsedPage;
use crate::url::{is_allowed_host, netloc};
use crate::PipelineError;
use regex::Regex;
use scraper::Selector;
use std::collections::HashSet;

/// URLs that are never worth following or reporting
const SKIP_PATTERN: &str = r"(?i)(login|logout|signin|signup|register|auth|admin|cart|checkout|account|password|reset|unsubscribe|facebook\.com|twitter\.com|instagram\.com|linkedin\.com|youtube\.com|mailto:|tel:|javascript:|#$)";

/// Binary, archive and media file extensions
const SKIP_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "tar", "gz", "rar", "7z", "mp3",
    "mp4", "avi", "mov", "wmv", "exe", "dmg", "apk",
];

/// Links of one page, deduplicated in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub internal: Vec<String>,
    pub external: Vec<String>,
}

/// Extracts and classifies anchors
pub struct LinkExtractor {
    allowed_domains: HashSet<String>,
    skip: Regex,
}

impl LinkExtractor {
    pub fn new<I, S>(allowed_domains: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let skip = Regex::new(SKIP_PATTERN).map_err(|e| PipelineError::Extraction {
            extractor: "link",
            url: String::new(),
            message: e.to_string(),
        })?;

        Ok(Self {
            allowed_domains: allowed_domains
                .into_iter()
                .map(|d| d.into().to_lowercase())
                .collect(),
            skip,
        })
    }

    pub fn extract(&self, page: &ParsedPage) -> Result<PageLinks, PipelineError> {
        let base = page.base_url()?;
        let document = page.document();
        let selector = Selector::parse("a[href]").map_err(|e| PipelineError::Extraction {
            extractor: "link",
            url: page.url.clone(),
            message: e.to_string(),
        })?;

        let mut links = PageLinks::default();
        let mut seen_internal = HashSet::new();
        let mut seen_external = HashSet::new();

        for anchor in document.select(&selector) {
            let Some(href) = anchor.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty() {
                continue;
            }

            let Ok(resolved) = base.join(href) else {
                continue;
            };
            if resolved.scheme() != "http" && resolved.scheme() != "https" {
                continue;
            }

            let absolute = resolved.to_string();
            if self.skip.is_match(&absolute) || has_skipped_extension(resolved.path()) {
                continue;
            }

            let internal = netloc(&resolved)
                .is_some_and(|host| is_allowed_host(&host, &self.allowed_domains));

            if internal {
                if seen_internal.insert(absolute.clone()) {
                    links.internal.push(absolute);
                }
            } else if seen_external.insert(absolute.clone()) {
                links.external.push(absolute);
            }
        }

        Ok(links)
    }
}

/// Whether the last path segment ends in a skipped extension
fn has_skipped_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or("");
    segment
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| SKIP_EXTENSIONS.contains(&ext.as_str()))
}
