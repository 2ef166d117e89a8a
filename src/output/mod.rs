//! Output module for crawl summaries
//!
//! This module handles:
//! - Recording how every seed of a run ended
//! - Printing the end-of-run summary to the console

mod summary;

pub use summary::{print_summary, CrawlSummary, SeedOutcome};
