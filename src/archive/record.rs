//! WARC record model
//!
//! A record is a version line, an ordered header block and a content block:
//!
//! ```text
//! WARC/1.0\r\n
//! WARC-Type: response\r\n
//! ...\r\n
//! Content-Length: 1234\r\n
//! \r\n
//! <block>\r\n
//! \r\n
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Write};
use std::net::IpAddr;
use uuid::Uuid;

pub const WARC_VERSION: &str = "WARC/1.0";

/// Kind of a WARC record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Request,
    Response,
    Metadata,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Metadata => "metadata",
        }
    }

    pub fn from_header(value: &str) -> Option<Self> {
        match value {
            "request" => Some(Self::Request),
            "response" => Some(Self::Response),
            "metadata" => Some(Self::Metadata),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header block; duplicate names are allowed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarcHeaders(Vec<(String, String)>);

impl WarcHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value of a header, matched case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a header, in insertion order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single WARC record
///
/// Records are built once and never modified after being written.
/// `Content-Length` is not stored in the header block; it is always
/// derived from the block when serializing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarcRecord {
    headers: WarcHeaders,
    block: Vec<u8>,
}

impl WarcRecord {
    /// Starts a record with a fresh `<urn:uuid:..>` identifier
    pub fn new(record_type: RecordType, target_uri: &str, date: DateTime<Utc>) -> Self {
        let mut headers = WarcHeaders::new();
        headers.push("WARC-Type", record_type.as_str());
        headers.push("WARC-Record-ID", format!("<urn:uuid:{}>", Uuid::new_v4()));
        headers.push("WARC-Date", warc_date(date));
        headers.push("WARC-Target-URI", target_uri);
        Self {
            headers,
            block: Vec::new(),
        }
    }

    /// Rebuilds a record from parsed parts
    pub fn from_parts(headers: WarcHeaders, block: Vec<u8>) -> Self {
        Self { headers, block }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push(name, value);
        self
    }

    /// Links this record to the record describing the same exchange
    pub fn with_concurrent_to(self, record_id: &str) -> Self {
        self.with_header("WARC-Concurrent-To", record_id)
    }

    pub fn with_ip_address(self, ip: Option<IpAddr>) -> Self {
        match ip {
            Some(ip) => self.with_header("WARC-IP-Address", ip.to_string()),
            None => self,
        }
    }

    /// Sets the content block, its digest and its content type
    pub fn with_block(mut self, content_type: &str, block: Vec<u8>) -> Self {
        self.headers
            .push("WARC-Block-Digest", sha256_digest(&block));
        self.headers.push("Content-Type", content_type);
        self.block = block;
        self
    }

    pub fn headers(&self) -> &WarcHeaders {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn block(&self) -> &[u8] {
        &self.block
    }

    pub fn record_type(&self) -> Option<RecordType> {
        self.header("WARC-Type").and_then(RecordType::from_header)
    }

    pub fn record_id(&self) -> Option<&str> {
        self.header("WARC-Record-ID")
    }

    pub fn concurrent_to(&self) -> Option<&str> {
        self.header("WARC-Concurrent-To")
    }

    pub fn target_uri(&self) -> Option<&str> {
        self.header("WARC-Target-URI")
    }

    /// Content of the block past the HTTP head for request and response
    /// records; the whole block otherwise
    pub fn payload(&self) -> &[u8] {
        match self.record_type() {
            Some(RecordType::Request | RecordType::Response) => http_payload(&self.block),
            _ => &self.block,
        }
    }

    /// Serializes the record, terminated by the record separator
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}\r\n", WARC_VERSION)?;
        for (name, value) in self.headers.iter() {
            write!(out, "{}: {}\r\n", name, value)?;
        }
        write!(out, "Content-Length: {}\r\n\r\n", self.block.len())?;
        out.write_all(&self.block)?;
        out.write_all(b"\r\n\r\n")
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.block.len() + 512);
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut bytes);
        bytes
    }
}

/// Formats a timestamp the way WARC-Date expects (UTC, second precision)
pub(crate) fn warc_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn sha256_digest(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

fn http_payload(block: &[u8]) -> &[u8] {
    block
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|end| &block[end + 4..])
        .unwrap_or(&[])
}
