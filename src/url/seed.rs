use crate::UrlError;
use url::Url;

/// Parses and validates a seed URL
///
/// Seeds are taken as given apart from surrounding whitespace: the archive
/// records the URL the caller asked for, so no normalization is applied.
///
/// # Errors
///
/// * `UrlError::Parse` - the string is not an absolute URL
/// * `UrlError::InvalidScheme` - the scheme is not http or https
/// * `UrlError::MissingHost` - the URL has no host
///
/// # Examples
///
/// ```
/// use warc_harvest::url::parse_seed_url;
///
/// let url = parse_seed_url(" https://example.com/post/ ").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/post/");
/// assert!(parse_seed_url("ftp://example.com/file").is_err());
/// ```
pub fn parse_seed_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    let url = Url::parse(trimmed).map_err(|e| UrlError::Parse(format!("{}: {}", trimmed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(trimmed.to_string()));
    }

    Ok(url)
}
