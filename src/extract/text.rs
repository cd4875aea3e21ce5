//! Title, headings, meta description and cleaned main content

use crate::crawler::ParsedPage;
use crate::PipelineError;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

/// Lines mentioning consent or newsletter boilerplate
const NOISE_PATTERN: &str = r"(?i)(accept\s+cookies?|cookie\s+policy|we\s+use\s+cookies|privacy\s+policy|terms\s+of\s+(service|use)|subscribe\s+to\s+newsletter|sign\s+up\s+for)";

/// One `<h1>`..`<h6>` element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// Text record for one page
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub headings: Vec<Heading>,
    pub content: String,
    pub meta_description: String,
}

/// Extracts the text record of a page
pub struct TextExtractor {
    horizontal_space: Regex,
    blank_lines: Regex,
    noise: Regex,
}

impl TextExtractor {
    pub fn new() -> Result<Self, PipelineError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| PipelineError::Extraction {
                extractor: "text",
                url: String::new(),
                message: e.to_string(),
            })
        };

        Ok(Self {
            horizontal_space: compile(r"[ \t]+")?,
            blank_lines: compile(r"\n{3,}")?,
            noise: compile(NOISE_PATTERN)?,
        })
    }

    pub fn extract(&self, page: &ParsedPage) -> Result<PageRecord, PipelineError> {
        let document = page.document();
        let selector = |css: &str| {
            Selector::parse(css).map_err(|e| PipelineError::Extraction {
                extractor: "text",
                url: page.url.clone(),
                message: e.to_string(),
            })
        };

        let title = match first_text(&document, &selector("title")?) {
            Some(title) => title,
            None => first_text(&document, &selector("h1")?).unwrap_or_default(),
        };

        let headings = document
            .select(&selector("h1, h2, h3, h4, h5, h6")?)
            .filter_map(|element| {
                let level = element.value().name().strip_prefix('h')?.parse().ok()?;
                let text = inline_text(element.text());
                (!text.is_empty()).then_some(Heading { level, text })
            })
            .collect();

        let description = selector("meta[name][content]")?;
        let og_description = selector("meta[property][content]")?;
        let meta_description = meta_content(&document, &description, "name", "description")
            .or_else(|| meta_content(&document, &og_description, "property", "og:description"))
            .unwrap_or_default();

        Ok(PageRecord {
            url: page.url.clone(),
            title,
            headings,
            content: self.clean_text(&page.readable_text),
            meta_description,
        })
    }

    /// Collapses whitespace and drops boilerplate lines
    pub fn clean_text(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let text = self.horizontal_space.replace_all(text, " ");
        let text = self.blank_lines.replace_all(&text, "\n\n");

        text.split('\n')
            .filter(|line| !self.noise.is_match(line))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// Trimmed text nodes of an element joined by single spaces
fn inline_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|element| inline_text(element.text()))
        .filter(|text| !text.is_empty())
}

fn meta_content(document: &Html, selector: &Selector, attr: &str, expected: &str) -> Option<String> {
    document
        .select(selector)
        .find(|meta| {
            meta.value()
                .attr(attr)
                .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected))
        })
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}
