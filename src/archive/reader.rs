use crate::archive::record::{WarcHeaders, WarcRecord, WARC_VERSION};
use crate::archive::{ArchiveError, ArchiveResult};
use std::path::Path;

/// Reads every record of a container file
pub fn read_container(path: &Path) -> ArchiveResult<Vec<WarcRecord>> {
    let bytes = std::fs::read(path)?;
    parse_container(&bytes)
}

/// Parses uncompressed WARC data into records
///
/// The `Content-Length` header is consumed to delimit the block and is not
/// kept in the returned header block.
pub fn parse_container(bytes: &[u8]) -> ArchiveResult<Vec<WarcRecord>> {
    let mut records = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let (version, next) = read_line(bytes, pos)?;
        if version != WARC_VERSION {
            return Err(malformed(pos, format!("expected {}, got {:?}", WARC_VERSION, version)));
        }
        pos = next;

        let mut headers = WarcHeaders::new();
        let mut content_length = None;
        loop {
            let (line, next) = read_line(bytes, pos)?;
            if line.is_empty() {
                pos = next;
                break;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| malformed(pos, format!("header without colon: {:?}", line)))?;
            let (name, value) = (name.trim(), value.trim());

            if name.eq_ignore_ascii_case("Content-Length") {
                let length = value
                    .parse::<usize>()
                    .map_err(|_| malformed(pos, format!("bad Content-Length: {:?}", value)))?;
                content_length = Some(length);
            } else {
                headers.push(name, value);
            }
            pos = next;
        }

        let length = content_length.ok_or_else(|| malformed(pos, "missing Content-Length"))?;
        let end = pos
            .checked_add(length)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| malformed(pos, "block runs past end of data"))?;
        let block = bytes[pos..end].to_vec();
        pos = end;

        if !bytes[pos..].starts_with(b"\r\n\r\n") {
            return Err(malformed(pos, "missing record separator"));
        }
        pos += 4;

        records.push(WarcRecord::from_parts(headers, block));
    }

    Ok(records)
}

fn read_line(bytes: &[u8], pos: usize) -> ArchiveResult<(&str, usize)> {
    let rest = &bytes[pos..];
    let end = rest
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or_else(|| malformed(pos, "unterminated header line"))?;
    let line = std::str::from_utf8(&rest[..end])
        .map_err(|_| malformed(pos, "header line is not UTF-8"))?;
    Ok((line, pos + end + 2))
}

fn malformed(offset: usize, message: impl Into<String>) -> ArchiveError {
    ArchiveError::Malformed {
        offset,
        message: message.into(),
    }
}
