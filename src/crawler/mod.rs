//! Crawler module for seed fetching and pagination
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with identity rotation and retry logic
//! - Next-page resolution from page content
//! - Progress reporting
//! - Overall crawl coordination across seeds

mod coordinator;
mod fetcher;
pub mod identity;
mod pagination;
mod progress;
mod retry;

pub use coordinator::Crawler;
pub use fetcher::{build_http_client, FetchError, FetchResult, Fetcher};
pub use identity::{IdentityPool, ACCEPT, ACCEPT_LANGUAGE, ARCHIVE_USER_AGENT, DEFAULT_USER_AGENTS};
pub use pagination::PaginationResolver;
pub use progress::{ProgressSink, TracingProgress};
pub use retry::{RetryPolicy, RetryState};
