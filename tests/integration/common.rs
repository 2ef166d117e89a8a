//! Shared helpers for the integration tests

use std::path::Path;
use warc_harvest::archive::{read_container, WarcRecord};
use warc_harvest::config::Config;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A configuration with short retry delays writing into `dir`
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::with_output_dir(dir.display().to_string());
    config.fetch.max_retries = 2;
    config.fetch.base_retry_delay = 0.05;
    config.fetch.retry_jitter = 0.0;
    config.fetch.fetch_timeout = 5;
    config
}

/// Serves `body` as HTML at `route`
pub async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body.as_bytes().to_vec(), "text/html"),
        )
        .mount(server)
        .await;
}

/// Serves `body` at `route` and expects exactly `times` requests for it
pub async fn mount_page_expecting(server: &MockServer, route: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body.as_bytes().to_vec(), "text/html"),
        )
        .expect(times)
        .mount(server)
        .await;
}

/// Reads a container and checks it holds request, response and metadata
pub fn read_exchange(path: &Path) -> Vec<WarcRecord> {
    let records = read_container(path).expect("container should parse");
    assert_eq!(records.len(), 3, "expected 3 records in {}", path.display());
    records
}

/// The metadata record's block as text
pub fn metadata_text(records: &[WarcRecord]) -> String {
    String::from_utf8(records[2].block().to_vec()).expect("metadata is UTF-8")
}

/// The response record's payload as text
pub fn payload_text(records: &[WarcRecord]) -> String {
    String::from_utf8(records[1].payload().to_vec()).expect("payload is UTF-8")
}
