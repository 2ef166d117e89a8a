//! Archive writer
//!
//! Persists one seed's exchange as a container of three records:
//!
//! 1. `request` - synthetic GET for the seed, empty payload
//! 2. `response` - last status, combined page bodies, concurrent to 1
//! 3. `metadata` - origin, timestamp, payload length, page count,
//!    concurrent to 2

use crate::archive::naming::container_file_name;
use crate::archive::record::{sha256_digest, RecordType, WarcRecord};
use crate::archive::{ArchiveError, ArchiveResult};
use crate::config::FileNaming;
use crate::crawler::identity::{ACCEPT, ARCHIVE_USER_AGENT};
use crate::crawler::FetchResult;
use crate::url::{host_header, socket_target};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use url::Url;
use uuid::Uuid;

const DEFAULT_CONTENT_TYPE: &str = "text/html";
const DEFAULT_SERVER: &str = "Unknown";

/// The three linked records describing one seed
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request: WarcRecord,
    pub response: WarcRecord,
    pub metadata: WarcRecord,
}

impl Exchange {
    /// Records in container order
    pub fn records(&self) -> [&WarcRecord; 3] {
        [&self.request, &self.response, &self.metadata]
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.records()
            .iter()
            .flat_map(|record| record.to_bytes())
            .collect()
    }
}

/// Builds the linked records for a seed's fetched pages
///
/// Page bodies are joined with `\n` in visit order into a single response
/// payload; the status and headers come from the last page fetched.
///
/// `WARC-IP-Address` is set on all three records when `ip` is known. With
/// `None` the header is left out entirely rather than filled with a
/// placeholder, so the container still parses but strict WARC validators may
/// flag the records as incomplete.
///
/// # Errors
///
/// * `ArchiveError::EmptyExchange` - no pages were fetched
/// * `ArchiveError::MissingHost` - the seed has no host for the `Host` header
pub fn build_exchange(
    seed: &Url,
    pages: &[FetchResult],
    ip: Option<IpAddr>,
    now: DateTime<Utc>,
) -> ArchiveResult<Exchange> {
    let last = pages
        .last()
        .ok_or_else(|| ArchiveError::EmptyExchange(seed.to_string()))?;
    let host = host_header(seed).ok_or_else(|| ArchiveError::MissingHost(seed.to_string()))?;

    let request_block = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\nAccept: {}\r\n\r\n",
        request_target(seed),
        host,
        ARCHIVE_USER_AGENT,
        ACCEPT
    );
    let request = WarcRecord::new(RecordType::Request, seed.as_str(), now)
        .with_ip_address(ip)
        .with_block("application/http; msgtype=request", request_block.into_bytes());
    let request_id = request.record_id().unwrap_or_default().to_string();

    let payload = pages
        .iter()
        .map(|page| page.body.as_str())
        .collect::<Vec<_>>()
        .join("\n")
        .into_bytes();
    let payload_length = payload.len();

    let reason = StatusCode::from_u16(last.status_code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown");
    let mut response_block = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nServer: {}\r\n\r\n",
        last.status_code,
        reason,
        last.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE),
        last.server.as_deref().unwrap_or(DEFAULT_SERVER)
    )
    .into_bytes();
    let payload_digest = sha256_digest(&payload);
    response_block.extend(payload);

    let response = WarcRecord::new(RecordType::Response, seed.as_str(), now)
        .with_concurrent_to(&request_id)
        .with_ip_address(ip)
        .with_header("WARC-Payload-Digest", payload_digest)
        .with_block("application/http; msgtype=response", response_block);
    let response_id = response.record_id().unwrap_or_default().to_string();

    let metadata_block = format!(
        "URL: {}\r\nTimestamp: {}\r\nContent-Length: {}\r\nPages Scraped: {}\r\n",
        seed,
        now.to_rfc3339_opts(SecondsFormat::Micros, true),
        payload_length,
        pages.len()
    );
    let metadata = WarcRecord::new(
        RecordType::Metadata,
        &format!("urn:uuid:{}", Uuid::new_v4()),
        now,
    )
    .with_concurrent_to(&response_id)
    .with_ip_address(ip)
    .with_block("application/warc-fields", metadata_block.into_bytes());

    Ok(Exchange {
        request,
        response,
        metadata,
    })
}

/// Resolves the seed's host to an address for `WARC-IP-Address`
///
/// Best effort: a failed lookup is logged and yields None.
pub async fn resolve_ip_address(seed: &Url) -> Option<IpAddr> {
    let (host, port) = socket_target(seed)?;
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Some(ip);
    }

    let resolved = match tokio::net::lookup_host((host.as_str(), port)).await {
        Ok(mut addrs) => addrs.next().map(|addr| addr.ip()),
        Err(e) => {
            tracing::warn!("Could not resolve {} for WARC-IP-Address: {}", host, e);
            None
        }
    };
    resolved
}

/// Writes seed exchanges into container files
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveWriter {
    naming: FileNaming,
}

impl ArchiveWriter {
    pub fn new(naming: FileNaming) -> Self {
        Self { naming }
    }

    /// Path the container for `seed` will be written to
    pub fn container_path(&self, seed: &Url, destination: &Path) -> PathBuf {
        destination.join(container_file_name(seed.as_str(), self.naming))
    }

    /// Writes the container for one seed and returns its path
    ///
    /// The destination directory is created if needed. The container is
    /// written to a temporary sibling and renamed into place, so a reader
    /// never observes a partially written file.
    pub async fn write(
        &self,
        seed: &Url,
        pages: &[FetchResult],
        destination: &Path,
    ) -> ArchiveResult<PathBuf> {
        if pages.is_empty() {
            return Err(ArchiveError::EmptyExchange(seed.to_string()));
        }

        tokio::fs::create_dir_all(destination).await?;

        let ip = resolve_ip_address(seed).await;
        let exchange = build_exchange(seed, pages, ip, Utc::now())?;
        let bytes = exchange.to_bytes();

        let path = self.container_path(seed, destination);
        let temp_path = destination.join(format!(".{}.partial", Uuid::new_v4().simple()));

        tokio::fs::write(&temp_path, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// Path and query of the seed, as sent on an HTTP request line
fn request_target(seed: &Url) -> String {
    match seed.query() {
        Some(query) => format!("{}?{}", seed.path(), query),
        None => seed.path().to_string(),
    }
}
