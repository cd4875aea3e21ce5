/// Per-URL outcome definitions
///
/// This module defines every way processing one frontier entry can end.
use std::fmt;

/// How processing of one URL ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Success =====
    /// Fetched, parsed and extracted; counts toward the page limit
    Completed,

    // ===== Skip =====
    /// robots.txt disallows the URL
    RobotsBlocked,

    // ===== Errors =====
    /// No usable response (transport error or bad status)
    FetchFailed,

    /// The response could not be turned into a document
    ParseFailed,
}

impl PageState {
    /// Only completed pages count toward the page limit
    pub fn counts_toward_limit(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Stable lowercase name, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::RobotsBlocked => "robots_blocked",
            Self::FetchFailed => "fetch_failed",
            Self::ParseFailed => "parse_failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
