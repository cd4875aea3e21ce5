//! Image discovery, download, filtering and storage
//!
//! Images are fetched concurrently per page, then filtered and written in
//! document order so that, among perceptual duplicates, the first one on the
//! page is the one kept.

use crate::crawler::ParsedPage;
use crate::url::netloc;
use crate::PipelineError;
use futures::future::join_all;
use image::imageops::FilterType;
use reqwest::Client;
use scraper::Selector;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-image download timeout
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Side of the grayscale thumbnail the average hash is computed on
const PERCEPTUAL_HASH_SIZE: u32 = 8;

/// Extensions trusted from the URL path
const KNOWN_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".bmp", ".ico"];

/// A kept image
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    /// Saved file, empty when downloading is disabled
    pub image_path: String,
    pub source_page: String,
    pub alt_text: String,
    pub image_url: String,
}

/// Finds, downloads and deduplicates page images
///
/// The seen-URL and perceptual-hash sets live as long as the extractor, i.e.
/// one job.
pub struct ImageExtractor {
    client: Client,
    images_dir: PathBuf,
    min_size: u32,
    download: bool,
    seen_urls: HashSet<String>,
    seen_hashes: HashSet<u64>,
}

impl ImageExtractor {
    /// Creates the extractor and its `images/` directory under `output_dir`
    pub fn new(output_dir: &Path, min_size: u32, download: bool) -> Result<Self, PipelineError> {
        let images_dir = output_dir.join("images");
        std::fs::create_dir_all(&images_dir)?;

        let client = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Http {
                url: "image client".to_string(),
                source: e,
            })?;

        Ok(Self {
            client,
            images_dir,
            min_size,
            download,
            seen_urls: HashSet::new(),
            seen_hashes: HashSet::new(),
        })
    }

    pub async fn extract(&mut self, page: &ParsedPage) -> Result<Vec<ImageRecord>, PipelineError> {
        let candidates = self.find_image_urls(page)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        if !self.download {
            return Ok(candidates
                .into_iter()
                .map(|(image_url, alt_text)| ImageRecord {
                    image_path: String::new(),
                    source_page: page.url.clone(),
                    alt_text,
                    image_url,
                })
                .collect());
        }

        let client = self.client.clone();
        let downloads = join_all(candidates.iter().map(|(url, _)| download(&client, url))).await;

        let domain_dir = self.images_dir.join(
            page.base_url()
                .ok()
                .and_then(|u| netloc(&u))
                .unwrap_or_else(|| "unknown".to_string())
                .replace(':', "_"),
        );

        let mut records = Vec::new();
        for ((image_url, alt_text), bytes) in candidates.into_iter().zip(downloads) {
            let Some(bytes) = bytes else {
                continue;
            };
            if !self.passes_filters(&image_url, &bytes) {
                continue;
            }

            match save_image(&domain_dir, &image_url, &bytes).await {
                Ok(path) => records.push(ImageRecord {
                    image_path: path.to_string_lossy().into_owned(),
                    source_page: page.url.clone(),
                    alt_text,
                    image_url,
                }),
                Err(e) => {
                    tracing::debug!(url = %image_url, error = %e, "Failed to save image");
                }
            }
        }

        Ok(records)
    }

    /// `(absolute url, alt text)` of images not seen before in this job
    fn find_image_urls(&mut self, page: &ParsedPage) -> Result<Vec<(String, String)>, PipelineError> {
        let base = page.base_url()?;
        let document = page.document();
        let selector = Selector::parse("img").map_err(|e| PipelineError::Extraction {
            extractor: "image",
            url: page.url.clone(),
            message: e.to_string(),
        })?;

        let mut found = Vec::new();
        for img in document.select(&selector) {
            let element = img.value();
            let Some(src) = ["src", "data-src", "data-lazy-src"]
                .iter()
                .filter_map(|attr| element.attr(attr))
                .map(str::trim)
                .find(|src| !src.is_empty())
            else {
                continue;
            };
            if src.starts_with("data:") {
                continue;
            }

            let Ok(absolute) = base.join(src) else {
                continue;
            };
            let absolute = absolute.to_string();
            if self.seen_urls.insert(absolute.clone()) {
                let alt = element.attr("alt").unwrap_or("").trim().to_string();
                found.push((absolute, alt));
            }
        }

        Ok(found)
    }

    /// Size and perceptual-duplicate checks; undecodable images pass
    fn passes_filters(&mut self, url: &str, bytes: &[u8]) -> bool {
        let Ok(decoded) = image::load_from_memory(bytes) else {
            return true;
        };

        if decoded.width() < self.min_size || decoded.height() < self.min_size {
            tracing::debug!(
                url = %url,
                width = decoded.width(),
                height = decoded.height(),
                "Image below minimum size"
            );
            return false;
        }

        let hash = perceptual_hash(&decoded);
        if !self.seen_hashes.insert(hash) {
            tracing::debug!(url = %url, phash = hash, "Image dedup skip");
            return false;
        }

        true
    }
}

/// Downloads an image; `None` on transport error, non-success status or empty body
async fn download(client: &Client, url: &str) -> Option<Vec<u8>> {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Image download error");
            return None;
        }
    };

    if !response.status().is_success() {
        return None;
    }

    let bytes = response.bytes().await.ok()?;
    (!bytes.is_empty()).then(|| bytes.to_vec())
}

/// Writes bytes under a content-hash name and returns the path
async fn save_image(dir: &Path, url: &str, bytes: &[u8]) -> Result<PathBuf, PipelineError> {
    tokio::fs::create_dir_all(dir).await?;

    let content_hash = hex::encode(Sha256::digest(bytes));
    let path = dir.join(format!("{}{}", &content_hash[..16], guess_extension(url, bytes)));
    tokio::fs::write(&path, bytes).await?;

    Ok(path)
}

/// 64-bit average hash of an 8x8 grayscale thumbnail
pub fn perceptual_hash(image: &image::DynamicImage) -> u64 {
    let gray = image.to_luma8();
    let thumbnail = image::imageops::resize(
        &gray,
        PERCEPTUAL_HASH_SIZE,
        PERCEPTUAL_HASH_SIZE,
        FilterType::Triangle,
    );

    let total: u32 = thumbnail.pixels().map(|p| p[0] as u32).sum();
    let average = total / (PERCEPTUAL_HASH_SIZE * PERCEPTUAL_HASH_SIZE);

    thumbnail
        .pixels()
        .enumerate()
        .filter(|(_, p)| p[0] as u32 >= average)
        .fold(0u64, |hash, (idx, _)| hash | (1u64 << idx))
}

/// Extension from the URL path, then from magic bytes, else `.jpg`
pub fn guess_extension(url: &str, bytes: &[u8]) -> &'static str {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_default();
    if let Some(ext) = KNOWN_EXTENSIONS.iter().find(|ext| path.ends_with(**ext)) {
        return *ext;
    }

    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        ".png"
    } else if bytes.starts_with(&[0xff, 0xd8]) {
        ".jpg"
    } else if bytes.starts_with(b"GIF8") {
        ".gif"
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        ".webp"
    } else {
        ".jpg"
    }
}
