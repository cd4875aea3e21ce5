//! Output module for crawl records and side files
//!
//! This module handles:
//! - Accumulating page, image, link and error records during a job
//! - Building the job report handed to exporters
//! - Persisting raw HTML with metadata sidecars

mod raw_html;
mod report;

pub use raw_html::{RawHtmlMeta, RawHtmlSink, RawHtmlStore};
pub use report::{CrawlError, CrawlOutput, CrawlRecords, JobReport, MAX_REPORTED_ERRORS};
