//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: how processing of a single frontier entry ended

mod page_state;

pub use page_state::PageState;
