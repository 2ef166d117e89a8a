//! Warc-Harvest: a pagination-aware WARC archiver
//!
//! This crate fetches a list of seed URLs, follows each seed's pagination chain,
//! and persists what was retrieved for every seed as one WARC container with
//! linked request, response and metadata records.

pub mod archive;
pub mod config;
pub mod crawler;
pub mod output;
pub mod seeds;
pub mod state;
pub mod url;

use thiserror::Error;

/// Errors raised while setting up a crawl
///
/// A running crawl never fails as a whole; per-seed failures end up in the
/// `CrawlSummary` instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Seed list loading errors
#[derive(Debug, Error)]
pub enum SeedListError {
    #[error("Failed to read seed list {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed seed list {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("Seed list {0} contains no URLs")]
    Empty(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

// Re-export commonly used types
pub use archive::{ArchiveWriter, WarcRecord};
pub use config::Config;
pub use crawler::{Crawler, FetchResult, Fetcher, PaginationResolver};
pub use output::{CrawlSummary, SeedOutcome};
pub use state::{SeedStatus, SeedTask};
