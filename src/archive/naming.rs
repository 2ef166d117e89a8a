use crate::config::FileNaming;
use sha2::{Digest, Sha256};

/// Derives the container file name for a seed URL
///
/// The stem is the seed's last path segment: a trailing slash is stripped
/// first, then a `.html` suffix, and any `/` or `:` left is replaced by `_`.
/// With `FileNaming::LastSegment` two seeds ending in the same segment map to
/// the same file and the later write wins. `FileNaming::HashSuffixed`
/// appends eight hex digits of the seed's SHA-256 so distinct seeds never
/// collide.
///
/// # Examples
///
/// ```
/// use warc_harvest::archive::container_file_name;
/// use warc_harvest::config::FileNaming;
///
/// let name = container_file_name("https://example.com/news/budget-2024.html", FileNaming::LastSegment);
/// assert_eq!(name, "budget-2024.warc");
/// ```
pub fn container_file_name(seed: &str, naming: FileNaming) -> String {
    let stem = file_stem(seed);
    match naming {
        FileNaming::LastSegment => format!("{}.warc", stem),
        FileNaming::HashSuffixed => {
            let digest = hex::encode(Sha256::digest(seed.as_bytes()));
            format!("{}-{}.warc", stem, &digest[..8])
        }
    }
}

fn file_stem(seed: &str) -> String {
    let trimmed = seed.strip_suffix('/').unwrap_or(seed);
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let segment = segment.strip_suffix(".html").unwrap_or(segment);
    let stem = segment.replace(|c: char| c == '/' || c == ':', "_");

    match stem.as_str() {
        "" | "." | ".." => "index".to_string(),
        _ => stem,
    }
}
