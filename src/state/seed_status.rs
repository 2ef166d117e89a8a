/// Final status definitions for crawled seeds
use std::fmt;

/// How a seed's crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedStatus {
    /// The pagination chain ended normally and the container was written
    Complete,

    /// A fetch failed mid-chain; the pages fetched before it were archived
    Partial,

    /// Nothing was archived (invalid seed, first fetch failed, or write error)
    Failed,

    /// The run was cancelled before this seed finished; nothing was written
    Cancelled,
}

impl SeedStatus {
    /// Returns true if a container exists for this seed
    pub fn wrote_container(&self) -> bool {
        matches!(self, Self::Complete | Self::Partial)
    }

    /// Returns true if the whole chain was archived
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Partial | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns all possible seed statuses
    pub fn all_statuses() -> [Self; 4] {
        [Self::Complete, Self::Partial, Self::Failed, Self::Cancelled]
    }
}

impl fmt::Display for SeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
