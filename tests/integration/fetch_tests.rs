//! Fetcher behaviour against a mock server

use std::time::{Duration, Instant};
use url::Url;
use warc_harvest::crawler::{FetchError, Fetcher, IdentityPool, RetryPolicy};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(max_retries: u32, base_delay_ms: u64) -> Fetcher {
    Fetcher::new(
        Duration::from_secs(5),
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            jitter: Duration::ZERO,
        },
        IdentityPool::new(vec!["TestAgent/1.0".to_string()]),
    )
    .unwrap()
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

#[tokio::test]
async fn test_fetch_sends_identity_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", "TestAgent/1.0"))
        .and(header("accept-language", "en-US,en;q=0.9"))
        .and(header("upgrade-insecure-requests", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("hello")
                .insert_header("content-type", "text/html; charset=utf-8")
                .insert_header("server", "mock-server"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher(0, 10).fetch(&url(&server, "/page")).await.unwrap();

    assert_eq!(result.status_code, 200);
    assert_eq!(result.body, "hello");
    assert_eq!(result.server.as_deref(), Some("mock-server"));
    assert_eq!(
        result.content_type.as_deref(),
        Some("text/html; charset=utf-8")
    );
}

#[tokio::test]
async fn test_missing_transport_headers_are_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bare"))
        .respond_with(ResponseTemplate::new(200).set_body_string("bare"))
        .mount(&server)
        .await;

    let result = fetcher(0, 10).fetch(&url(&server, "/bare")).await.unwrap();

    assert_eq!(result.body, "bare");
    assert_eq!(result.content_type, None);
    assert_eq!(result.server, None);
}

#[tokio::test]
async fn test_blocked_fetch_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blocked"))
        .respond_with(ResponseTemplate::new(403))
        .expect(4)
        .mount(&server)
        .await;

    let started = Instant::now();
    let error = fetcher(3, 20)
        .fetch(&url(&server, "/blocked"))
        .await
        .unwrap_err();

    // 20 + 40 + 80 ms
    assert!(started.elapsed() >= Duration::from_millis(140));
    match &error {
        FetchError::Exhausted { attempts, .. } => assert_eq!(*attempts, 4),
        other => panic!("expected exhausted fetch, got {:?}", other),
    }
    assert!(error.last_cause().is_blocked());
}

#[tokio::test]
async fn test_blocked_then_allowed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher(3, 10).fetch(&url(&server, "/flaky")).await.unwrap();
    assert_eq!(result.body, "finally");
}

#[tokio::test]
async fn test_server_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher(3, 10).fetch(&url(&server, "/broken")).await.unwrap();
    assert_eq!(result.status_code, 500);
    assert_eq!(result.body, "oops");
}

#[tokio::test]
async fn test_timeout_is_retried_then_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(
        Duration::from_millis(300),
        RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(10),
            jitter: Duration::ZERO,
        },
        IdentityPool::default(),
    )
    .unwrap();

    let error = fetcher.fetch(&url(&server, "/slow")).await.unwrap_err();
    assert!(matches!(error.last_cause(), FetchError::Timeout { .. }));
    assert!(error.to_string().contains("after 2 attempts"));
}

#[tokio::test]
async fn test_unreachable_host_is_exhausted() {
    let error = fetcher(1, 10)
        .fetch(&Url::parse("http://127.0.0.1:1/").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(error, FetchError::Exhausted { attempts: 2, .. }));
    assert!(matches!(error.last_cause(), FetchError::Transport { .. }));
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let server = MockServer::start().await;
    let location = format!("{}/new", server.uri());
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", location.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&server)
        .await;

    let result = fetcher(0, 10).fetch(&url(&server, "/old")).await.unwrap();
    assert_eq!(result.url.path(), "/old");
    assert_eq!(result.final_url.path(), "/new");
    assert_eq!(result.body, "moved");
}
