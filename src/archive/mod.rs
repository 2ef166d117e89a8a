//! WARC archive module
//!
//! This module handles:
//! - The WARC record model and its serialization
//! - Deriving container file names from seed URLs
//! - Writing one request/response/metadata exchange per seed
//! - Reading containers back for inspection and verification

mod naming;
mod reader;
mod record;
mod writer;

pub use naming::container_file_name;
pub use reader::{parse_container, read_container};
pub use record::{RecordType, WarcHeaders, WarcRecord, WARC_VERSION};
pub use writer::{build_exchange, resolve_ip_address, ArchiveWriter, Exchange};

use thiserror::Error;

/// Errors that can occur while writing or reading containers
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No pages to archive for {0}")]
    EmptyExchange(String),

    #[error("Seed URL has no host: {0}")]
    MissingHost(String),

    #[error("Malformed WARC record at byte {offset}: {message}")]
    Malformed { offset: usize, message: String },
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;
