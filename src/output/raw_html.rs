//! Raw HTML side-channel
//!
//! Every successfully fetched page can be handed to a [`RawHtmlSink`]. The
//! default store writes `raw_html/<netloc>/<hash>.html.gz` with a
//! `<hash>.meta.json` sidecar next to it.

use crate::url::netloc;
use crate::PipelineError;
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

/// Receives raw markup for each fetched page
///
/// Implementations own naming, compression and persistence. Failures are
/// reported to the caller, which only logs them.
pub trait RawHtmlSink: Send {
    fn save(
        &mut self,
        url: &str,
        html: &str,
        status_code: u16,
        response_time: f64,
    ) -> Result<PathBuf, PipelineError>;
}

/// Sidecar written next to each compressed page
#[derive(Debug, Clone, Serialize)]
pub struct RawHtmlMeta {
    pub url: String,
    pub content_hash: String,
    pub status_code: u16,
    pub response_time: f64,
    pub timestamp: String,
    pub size_bytes: usize,
}

/// Gzip-on-disk raw HTML store
pub struct RawHtmlStore {
    base_dir: PathBuf,
}

impl RawHtmlStore {
    /// Creates the store and its `raw_html/` directory under `output_dir`
    pub fn new(output_dir: &Path) -> Result<Self, PipelineError> {
        let base_dir = output_dir.join("raw_html");
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }
}

impl RawHtmlSink for RawHtmlStore {
    fn save(
        &mut self,
        url: &str,
        html: &str,
        status_code: u16,
        response_time: f64,
    ) -> Result<PathBuf, PipelineError> {
        let domain = Url::parse(url)
            .ok()
            .and_then(|u| netloc(&u))
            .unwrap_or_else(|| "unknown".to_string());
        let domain_dir = self.base_dir.join(domain.replace(':', "_"));
        std::fs::create_dir_all(&domain_dir)?;

        let content_hash = hex::encode(Sha256::digest(html.as_bytes()))[..16].to_string();
        let html_path = domain_dir.join(format!("{}.html.gz", content_hash));
        let meta_path = domain_dir.join(format!("{}.meta.json", content_hash));

        let mut encoder = GzEncoder::new(std::fs::File::create(&html_path)?, Compression::default());
        encoder.write_all(html.as_bytes())?;
        encoder.finish()?;

        let meta = RawHtmlMeta {
            url: url.to_string(),
            content_hash,
            status_code,
            response_time,
            timestamp: Utc::now().to_rfc3339(),
            size_bytes: html.len(),
        };
        std::fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)?;

        tracing::debug!(url = %url, path = %html_path.display(), "Raw HTML saved");
        Ok(html_path)
    }
}
