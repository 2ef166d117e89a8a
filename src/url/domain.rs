use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use warc_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the value of an HTTP `Host` header for this URL
///
/// This is the URL's authority without userinfo: the host, plus the port
/// when it is not the scheme's default.
pub fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Returns the host and effective port to resolve for a network address
pub fn socket_target(url: &Url) -> Option<(String, u16)> {
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    // IPv6 literals come back bracketed from host_str
    let host = host.trim_start_matches('[').trim_end_matches(']');
    Some((host.to_string(), port))
}
