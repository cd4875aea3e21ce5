//! HTML cleaning and main-content detection
//!
//! This module turns fetched markup into a [`ParsedPage`]:
//! - Script, style, noscript, iframe and svg nodes are removed
//! - The character encoding is detected from headers or meta tags
//! - Readable text comes from readability, falling back to the body text
//!   when readability keeps too little

use crate::PipelineError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Nodes stripped before any extraction
const STRIPPED_TAGS: &str = "script, style, noscript, iframe, svg";

/// Readable text shorter than this is always replaced by the body text
const MIN_READABLE_CHARS: usize = 100;

/// ...or shorter than this share of the body text
const MIN_READABLE_SHARE: f64 = 0.15;

/// A cleaned page ready for extraction
///
/// The document is kept as serialized markup; extractors parse it again where
/// they need a DOM.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// URL the page was fetched from
    pub url: String,

    /// Markup with stripped nodes removed
    pub cleaned_html: String,

    /// Main-content text, one text node per line
    pub readable_text: String,

    /// Main-content markup
    pub readable_html: String,

    /// Detected character encoding, lowercase
    pub encoding: String,
}

impl ParsedPage {
    /// Parses the cleaned markup into a DOM
    pub fn document(&self) -> Html {
        Html::parse_document(&self.cleaned_html)
    }

    /// The page URL, used as the base for relative references
    pub fn base_url(&self) -> Result<Url, PipelineError> {
        Url::parse(&self.url).map_err(|e| PipelineError::Parse {
            url: self.url.clone(),
            message: e.to_string(),
        })
    }
}

/// Cleans pages and derives their readable content
#[derive(Debug, Default, Clone)]
pub struct PageParser;

impl PageParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses fetched markup
    ///
    /// # Arguments
    ///
    /// * `html` - Decoded markup
    /// * `url` - URL the markup was fetched from
    /// * `declared_charset` - Charset from the Content-Type header, if any
    pub fn parse(
        &self,
        html: &str,
        url: &str,
        declared_charset: Option<&str>,
    ) -> Result<ParsedPage, PipelineError> {
        let parse_error = |message: String| PipelineError::Parse {
            url: url.to_string(),
            message,
        };

        // Blank markup still parses, into a page with no content
        let base = Url::parse(url).map_err(|e| parse_error(e.to_string()))?;

        let mut document = Html::parse_document(html);
        let encoding = detect_encoding(&document, declared_charset);
        strip_nodes(&mut document).map_err(parse_error)?;

        let cleaned_html = document.html();
        let (body_text, body_html) = body_content(&document);

        let (readable_text, readable_html) = match readability_content(&cleaned_html, &base) {
            Ok((text, markup)) => {
                let threshold = MIN_READABLE_CHARS
                    .max((body_text.chars().count() as f64 * MIN_READABLE_SHARE) as usize);
                if text.chars().count() < threshold {
                    tracing::debug!(
                        url = %url,
                        readable_len = text.chars().count(),
                        body_len = body_text.chars().count(),
                        "Readability too aggressive, using body text"
                    );
                    (body_text, body_html)
                } else {
                    (text, markup)
                }
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Readability failed, using body text");
                (body_text, body_html)
            }
        };

        Ok(ParsedPage {
            url: url.to_string(),
            cleaned_html,
            readable_text,
            readable_html,
            encoding,
        })
    }
}

/// Text nodes under an element, trimmed, one per line
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_nodes(document: &mut Html) -> Result<(), String> {
    let selector = Selector::parse(STRIPPED_TAGS).map_err(|e| e.to_string())?;
    let ids: Vec<_> = document.select(&selector).map(|element| element.id()).collect();

    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
    Ok(())
}

/// Header charset, else `<meta charset>`, else an http-equiv declaration, else utf-8
fn detect_encoding(document: &Html, declared_charset: Option<&str>) -> String {
    if let Some(charset) = declared_charset.map(str::trim).filter(|c| !c.is_empty()) {
        return charset.to_lowercase();
    }

    if let Ok(selector) = Selector::parse("meta[charset]") {
        if let Some(charset) = document
            .select(&selector)
            .filter_map(|meta| meta.value().attr("charset"))
            .map(str::trim)
            .find(|c| !c.is_empty())
        {
            return charset.to_lowercase();
        }
    }

    if let Ok(selector) = Selector::parse("meta[http-equiv][content]") {
        for meta in document.select(&selector) {
            let is_content_type = meta
                .value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("content-type"));
            if !is_content_type {
                continue;
            }
            let charset = meta.value().attr("content").and_then(|content| {
                let lower = content.to_lowercase();
                let start = lower.find("charset=")? + "charset=".len();
                let value = lower[start..]
                    .split(|c: char| c == ';' || c.is_whitespace())
                    .next()?
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string();
                (!value.is_empty()).then_some(value)
            });
            if let Some(charset) = charset {
                return charset;
            }
        }
    }

    "utf-8".to_string()
}

fn body_content(document: &Html) -> (String, String) {
    let Ok(selector) = Selector::parse("body") else {
        return (String::new(), String::new());
    };

    document
        .select(&selector)
        .next()
        .map(|body| (element_text(body), body.inner_html()))
        .unwrap_or_default()
}

fn readability_content(cleaned_html: &str, base: &Url) -> Result<(String, String), String> {
    let product = readability::extractor::extract(&mut cleaned_html.as_bytes(), base)
        .map_err(|e| e.to_string())?;

    let fragment = Html::parse_fragment(&product.content);
    let text = element_text(fragment.root_element());
    Ok((text, product.content))
}
