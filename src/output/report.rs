//! Accumulated crawl records and the job report

use crate::extract::{ImageRecord, PageRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// Errors listed in a report; `failed_pages` still counts all of them
pub const MAX_REPORTED_ERRORS: usize = 100;

/// A page that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlError {
    pub url: String,
    pub error: String,
}

/// Everything one job produced, in crawl order
#[derive(Debug, Clone)]
pub struct CrawlRecords {
    pub pages: Vec<PageRecord>,
    pub images: Vec<ImageRecord>,
    /// External links as found, duplicates across pages included
    pub external_links: Vec<String>,
    pub errors: Vec<CrawlError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlRecords {
    /// Starts an empty accumulator stamped with the current time
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            images: Vec::new(),
            external_links: Vec::new(),
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn add_page(&mut self, page: PageRecord) {
        self.pages.push(page);
    }

    pub fn add_images(&mut self, images: impl IntoIterator<Item = ImageRecord>) {
        self.images.extend(images);
    }

    pub fn add_external_links(&mut self, links: impl IntoIterator<Item = String>) {
        self.external_links.extend(links);
    }

    pub fn add_error(&mut self, url: impl Into<String>, error: impl Into<String>) {
        self.errors.push(CrawlError {
            url: url.into(),
            error: error.into(),
        });
    }

    /// Stamps the end time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Number of distinct external links
    pub fn unique_external_links(&self) -> usize {
        self.external_links.iter().collect::<HashSet<_>>().len()
    }

    /// Seconds between start and finish, 0 while unfinished
    pub fn elapsed_seconds(&self) -> f64 {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0)
    }

    /// Builds the summary report
    pub fn report(&self) -> JobReport {
        JobReport {
            total_pages: self.pages.len(),
            failed_pages: self.errors.len(),
            total_images: self.images.len(),
            external_links: self.unique_external_links(),
            elapsed_seconds: (self.elapsed_seconds() * 100.0).round() / 100.0,
            errors: self.errors.iter().take(MAX_REPORTED_ERRORS).cloned().collect(),
        }
    }
}

impl Default for CrawlRecords {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of one job
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub total_pages: usize,
    pub failed_pages: usize,
    pub total_images: usize,
    /// Count of distinct external links
    pub external_links: usize,
    pub elapsed_seconds: f64,
    pub errors: Vec<CrawlError>,
}

/// Records plus the report built from them
#[derive(Debug, Clone)]
pub struct CrawlOutput {
    pub records: CrawlRecords,
    pub report: JobReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn page(url: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: String::new(),
            headings: Vec::new(),
            content: String::new(),
            meta_description: String::new(),
        }
    }

    #[test]
    fn test_report_counts() {
        let mut records = CrawlRecords::new();
        records.add_page(page("https://example.com/"));
        records.add_page(page("https://example.com/a"));
        records.add_external_links(vec![
            "https://other.org/".to_string(),
            "https://third.net/".to_string(),
        ]);
        records.add_external_links(vec!["https://other.org/".to_string()]);
        records.add_error("https://example.com/bad", "HTTP 500: Bad status");

        let report = records.report();
        assert_eq!(report.total_pages, 2);
        assert_eq!(report.failed_pages, 1);
        assert_eq!(report.total_images, 0);
        assert_eq!(report.external_links, 2);
        assert_eq!(report.errors[0].error, "HTTP 500: Bad status");
    }

    #[test]
    fn test_error_list_is_capped() {
        let mut records = CrawlRecords::new();
        for i in 0..150 {
            records.add_error(format!("https://example.com/{}", i), "HTTP 0: timeout");
        }

        let report = records.report();
        assert_eq!(report.failed_pages, 150);
        assert_eq!(report.errors.len(), MAX_REPORTED_ERRORS);
        assert_eq!(report.errors[0].url, "https://example.com/0");
    }

    #[test]
    fn test_elapsed_rounded() {
        let mut records = CrawlRecords::new();
        assert_eq!(records.report().elapsed_seconds, 0.0);

        records.finished_at = Some(records.started_at + Duration::milliseconds(1_234_567));
        assert_eq!(records.report().elapsed_seconds, 1234.57);
    }

    #[test]
    fn test_report_serializes() {
        let mut records = CrawlRecords::new();
        records.add_error("https://example.com/x", "Parse error: empty document");
        records.finish();

        let json = serde_json::to_value(records.report()).unwrap();
        assert_eq!(json["failed_pages"], 1);
        assert_eq!(json["errors"][0]["url"], "https://example.com/x");
        assert!(json["elapsed_seconds"].is_number());
    }
}
