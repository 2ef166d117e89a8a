//! URL handling module for Warc-Harvest
//!
//! This module provides seed URL validation, resolution of pagination
//! hrefs against the page they were found on, and host extraction for
//! archive headers.

mod domain;
mod link;
mod seed;

// Re-export main functions
pub use domain::{extract_domain, host_header, socket_target};
pub use link::resolve_link;
pub use seed::parse_seed_url;
