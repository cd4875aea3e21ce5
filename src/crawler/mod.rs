//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The breadth-first frontier with visited tracking
//! - Polite HTTP fetching with retries and a rendered fallback
//! - HTML cleanup and main-content detection
//! - Overall job coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod renderer;

pub use coordinator::{run_job, Coordinator};
pub use fetcher::{backoff_delay, looks_js_heavy, FetchMethod, FetchResult, Fetcher};
pub use frontier::{Frontier, FrontierEntry};
pub use parser::{PageParser, ParsedPage};
pub use renderer::{is_js_rendering_available, HeadlessRenderer, RenderedPage, Renderer};
