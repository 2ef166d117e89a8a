//! End-to-end crawl tests

use crate::common::{
    metadata_text, mount_page, mount_page_expecting, payload_text, read_exchange, test_config,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use warc_harvest::archive::RecordType;
use warc_harvest::config::FileNaming;
use warc_harvest::crawler::Crawler;
use warc_harvest::state::SeedStatus;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_one_container_per_seed() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "<html><body>A</body></html>").await;
    mount_page(&server, "/b", "<html><body>B</body></html>").await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("scraped-warcs");
    let seeds = vec![format!("{}/a", server.uri()), format!("{}/b", server.uri())];

    let crawler = Crawler::new(&test_config(&out)).unwrap();
    let summary = crawler.crawl(&seeds, &out).await;

    assert_eq!(summary.containers_written(), 2);
    assert!(summary.is_complete());

    let mut names: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.warc", "b.warc"]);

    for (name, body) in [("a.warc", "A"), ("b.warc", "B")] {
        let records = read_exchange(&out.join(name));
        let types: Vec<_> = records.iter().map(|r| r.record_type().unwrap()).collect();
        assert_eq!(
            types,
            vec![RecordType::Request, RecordType::Response, RecordType::Metadata]
        );
        assert!(payload_text(&records).contains(body));
    }
}

#[tokio::test]
async fn test_records_are_linked() {
    let server = MockServer::start().await;
    mount_page(&server, "/linked", "<p>linked</p>").await;

    let dir = tempfile::tempdir().unwrap();
    let seeds = vec![format!("{}/linked", server.uri())];
    let summary = Crawler::new(&test_config(dir.path()))
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    let path = summary.outcomes[0].container.clone().unwrap();
    let records = read_exchange(&path);

    assert!(records[0].concurrent_to().is_none());
    assert_eq!(records[1].concurrent_to(), records[0].record_id());
    assert_eq!(records[2].concurrent_to(), records[1].record_id());

    for record in &records {
        assert_eq!(record.header("WARC-IP-Address"), Some("127.0.0.1"));
    }

    let request = String::from_utf8(records[0].block().to_vec()).unwrap();
    let authority = server.uri().trim_start_matches("http://").to_string();
    assert!(request.starts_with("GET /linked HTTP/1.1\r\n"));
    assert!(request.contains(&format!("Host: {}\r\n", authority)));

    let response = String::from_utf8(records[1].block().to_vec()).unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Type: text/html"));
}

#[tokio::test]
async fn test_response_defaults_without_transport_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bare"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>bare</p>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let seeds = vec![format!("{}/bare", server.uri())];
    let summary = Crawler::new(&test_config(dir.path()))
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;
    assert!(summary.is_complete());

    let records = read_exchange(&dir.path().join("bare.warc"));
    let response = String::from_utf8(records[1].block().to_vec()).unwrap();
    assert!(response.contains("Content-Type: text/html\r\n"));
    assert!(response.contains("Server: Unknown\r\n"));
    assert_eq!(payload_text(&records), "<p>bare</p>");
}

#[tokio::test]
async fn test_structured_pagination_fetches_every_page() {
    let server = MockServer::start().await;
    let first = format!(
        r#"<html><body><p>part one</p>
        <div class="page-links">Pages:
            <a class="post-page-numbers" href="{uri}/post/">1</a>
            <a class="post-page-numbers" href="/post/2/">2</a>
            <a class="post-page-numbers" href="/post/3/">3</a>
        </div></body></html>"#,
        uri = server.uri()
    );
    mount_page_expecting(&server, "/post/", &first, 1).await;
    mount_page_expecting(&server, "/post/2/", "part two", 1).await;
    mount_page_expecting(&server, "/post/3/", "part three", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let seeds = vec![format!("{}/post/", server.uri())];
    let summary = Crawler::new(&test_config(dir.path()))
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.status, SeedStatus::Complete);
    assert_eq!(outcome.pages, 3);
    assert_eq!(outcome.container.as_deref(), Some(dir.path().join("post.warc").as_path()));

    let records = read_exchange(&dir.path().join("post.warc"));
    assert_eq!(
        payload_text(&records),
        format!("{}\npart two\npart three", first)
    );

    let metadata = metadata_text(&records);
    assert!(metadata.contains("Pages Scraped: 3\r\n"));
    assert!(metadata.contains(&format!(
        "Content-Length: {}\r\n",
        first.len() + "\npart two\npart three".len()
    )));
}

#[tokio::test]
async fn test_next_link_ignored_without_follow_pagination() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/first",
        r#"<html><body><a rel="next" href="/second">Next</a></body></html>"#,
    )
    .await;
    mount_page_expecting(&server, "/second", "never fetched", 0).await;

    let dir = tempfile::tempdir().unwrap();
    let seeds = vec![format!("{}/first", server.uri())];
    let summary = Crawler::new(&test_config(dir.path()))
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    assert_eq!(summary.outcomes[0].pages, 1);
    let records = read_exchange(&dir.path().join("first.warc"));
    assert!(metadata_text(&records).contains("Pages Scraped: 1\r\n"));
}

#[tokio::test]
async fn test_heuristic_next_link_followed_when_enabled() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/list",
        r#"<html><body><ul><li>one</li></ul><a class="next" href="/list/page-2">Older</a></body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/list/page-2",
        r#"<html><body><ul><li>two</li></ul></body></html>"#,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.follow_pagination = true;

    let seeds = vec![format!("{}/list", server.uri())];
    let summary = Crawler::new(&config)
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    assert_eq!(summary.outcomes[0].status, SeedStatus::Complete);
    assert_eq!(summary.outcomes[0].pages, 2);

    let records = read_exchange(&dir.path().join("list.warc"));
    let payload = payload_text(&records);
    assert!(payload.contains("<li>one</li>"));
    assert!(payload.contains("<li>two</li>"));
}

#[tokio::test]
async fn test_pagination_cycle_stops() {
    let server = MockServer::start().await;
    mount_page_expecting(
        &server,
        "/p1",
        r#"<a rel="next" href="/p2">Next</a>"#,
        1,
    )
    .await;
    mount_page_expecting(
        &server,
        "/p2",
        r#"<a rel="next" href="/p1">Next</a>"#,
        1,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.follow_pagination = true;

    let seeds = vec![format!("{}/p1", server.uri())];
    let summary = Crawler::new(&config)
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    assert_eq!(summary.outcomes[0].status, SeedStatus::Complete);
    assert_eq!(summary.outcomes[0].pages, 2);
}

#[tokio::test]
async fn test_max_pages_caps_chain() {
    let server = MockServer::start().await;
    mount_page_expecting(&server, "/c1", r#"<a rel="next" href="/c2">Next</a>"#, 1).await;
    mount_page_expecting(&server, "/c2", r#"<a rel="next" href="/c3">Next</a>"#, 1).await;
    mount_page_expecting(&server, "/c3", r#"<a rel="next" href="/c4">Next</a>"#, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.follow_pagination = true;
    config.crawler.max_pages = Some(2);

    let seeds = vec![format!("{}/c1", server.uri())];
    let summary = Crawler::new(&config)
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    assert_eq!(summary.outcomes[0].pages, 2);
    let records = read_exchange(&dir.path().join("c1.warc"));
    assert!(metadata_text(&records).contains("Pages Scraped: 2\r\n"));
}

#[tokio::test]
async fn test_repeated_runs_have_identical_structure() {
    let server = MockServer::start().await;
    mount_page(&server, "/stable", "<p>stable</p>").await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.max_pages = Some(1);
    let seeds = vec![format!("{}/stable", server.uri())];
    let path = dir.path().join("stable.warc");

    let crawler = Crawler::new(&config).unwrap();
    crawler.crawl(&seeds, dir.path()).await;
    let first = read_exchange(&path);
    crawler.crawl(&seeds, dir.path()).await;
    let second = read_exchange(&path);

    for (a, b) in first.iter().zip(second.iter()) {
        let names_a: Vec<_> = a.headers().names().collect();
        let names_b: Vec<_> = b.headers().names().collect();
        assert_eq!(names_a, names_b);
        assert_ne!(a.record_id(), b.record_id());
    }

    // Request blocks do not depend on the identity used for the fetch
    assert_eq!(first[0].block(), second[0].block());

    let strip_timestamp = |text: String| -> Vec<String> {
        text.lines()
            .filter(|line| !line.starts_with("Timestamp:"))
            .map(str::to_string)
            .collect()
    };
    assert_eq!(
        strip_timestamp(metadata_text(&first)),
        strip_timestamp(metadata_text(&second))
    );
}

#[tokio::test]
async fn test_blocked_seed_retries_then_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blocked"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let seeds = vec![format!("{}/blocked", server.uri())];

    let started = Instant::now();
    let summary = Crawler::new(&test_config(dir.path()))
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    // 0.05s + 0.1s of backoff
    assert!(started.elapsed() >= Duration::from_millis(150));

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.status, SeedStatus::Failed);
    assert!(outcome.container.is_none());
    assert!(outcome.error.as_deref().unwrap().contains("after 3 attempts"));
    assert_eq!(summary.containers_written(), 0);
}

#[tokio::test]
async fn test_partial_chain_is_archived() {
    let server = MockServer::start().await;
    let first = r#"<div class="page-links">
        <a class="post-page-numbers" href="/story/">1</a>
        <a class="post-page-numbers" href="/story/2/">2</a>
    </div>"#;
    mount_page(&server, "/story/", first).await;
    Mock::given(method("GET"))
        .and(path("/story/2/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.fetch.max_retries = 0;

    let seeds = vec![format!("{}/story/", server.uri())];
    let summary = Crawler::new(&config)
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.status, SeedStatus::Partial);
    assert_eq!(outcome.pages, 1);
    assert!(outcome.error.is_some());

    let records = read_exchange(&dir.path().join("story.warc"));
    assert_eq!(payload_text(&records), first);
    assert!(metadata_text(&records).contains("Pages Scraped: 1\r\n"));
}

#[tokio::test]
async fn test_failing_seed_does_not_abort_run() {
    let server = MockServer::start().await;
    mount_page(&server, "/ok-1", "one").await;
    mount_page(&server, "/ok-2", "two").await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.fetch.max_retries = 0;

    let seeds = vec![
        format!("{}/ok-1", server.uri()),
        "http://127.0.0.1:1/unreachable".to_string(),
        "not a url".to_string(),
        format!("{}/ok-2", server.uri()),
    ];
    let summary = Crawler::new(&config)
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    let statuses: Vec<_> = summary.outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            SeedStatus::Complete,
            SeedStatus::Failed,
            SeedStatus::Failed,
            SeedStatus::Complete
        ]
    );
    assert_eq!(summary.containers_written(), 2);
    assert!(dir.path().join("ok-1.warc").exists());
    assert!(dir.path().join("ok-2.warc").exists());
    assert!(!dir.path().join("unreachable.warc").exists());
}

#[tokio::test]
async fn test_error_pages_are_archived_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let seeds = vec![format!("{}/gone", server.uri())];
    let summary = Crawler::new(&test_config(dir.path()))
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    assert_eq!(summary.outcomes[0].status, SeedStatus::Complete);
    let records = read_exchange(&dir.path().join("gone.warc"));
    let response = String::from_utf8(records[1].block().to_vec()).unwrap();
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(payload_text(&records), "not here");
}

#[tokio::test]
async fn test_cancellation_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("slow")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut config = test_config(&out);
    config.fetch.fetch_timeout = 30;

    let crawler = Crawler::new(&config).unwrap();
    let token = crawler.cancellation_token();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let seeds = vec![format!("{}/slow", server.uri())];
    let started = Instant::now();
    let summary = crawler.crawl(&seeds, &out).await;
    canceller.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(summary.outcomes[0].status, SeedStatus::Cancelled);
    assert_eq!(summary.containers_written(), 0);
    assert!(!out.exists());
}

#[tokio::test]
async fn test_colliding_names() {
    let server = MockServer::start().await;
    mount_page(&server, "/one/post", "first").await;
    mount_page(&server, "/two/post", "second").await;
    let seeds = vec![
        format!("{}/one/post", server.uri()),
        format!("{}/two/post", server.uri()),
    ];

    // Last write wins by default
    let dir = tempfile::tempdir().unwrap();
    let summary = Crawler::new(&test_config(dir.path()))
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;
    assert_eq!(summary.containers_written(), 2);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    // Hash suffixes keep both
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.output.file_naming = FileNaming::HashSuffixed;
    let summary = Crawler::new(&config)
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    let paths: Vec<_> = summary.containers().collect();
    assert_eq!(paths.len(), 2);
    assert_ne!(paths[0], paths[1]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    assert_eq!(payload_text(&read_exchange(paths[0])), "first");
    assert_eq!(payload_text(&read_exchange(paths[1])), "second");
}

#[tokio::test]
async fn test_seeds_crawled_concurrently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("page")
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.max_concurrent_seeds = 4;

    let seeds: Vec<_> = (1..=4).map(|i| format!("{}/s{}", server.uri(), i)).collect();
    let started = Instant::now();
    let summary = Crawler::new(&config)
        .unwrap()
        .crawl(&seeds, dir.path())
        .await;

    assert!(started.elapsed() < Duration::from_millis(1500));
    assert_eq!(summary.containers_written(), 4);
    let indices: Vec<_> = summary.outcomes.iter().map(|o| o.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_progress_reports_in_page_order() {
    let server = MockServer::start().await;
    mount_page(&server, "/feed", r#"<a rel="next" href="/feed/2">Next</a>"#).await;
    mount_page(&server, "/feed/2", "end").await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        move |current: usize, total: usize, message: &str| {
            seen.lock().unwrap().push((current, total, message.to_string()));
        }
    };

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.crawler.follow_pagination = true;
    let seed = format!("{}/feed", server.uri());

    Crawler::new(&config)
        .unwrap()
        .with_progress(Arc::new(sink))
        .crawl(&[seed.clone()], dir.path())
        .await;

    let seen = seen.lock().unwrap();
    let messages: Vec<_> = seen.iter().map(|(_, _, m)| m.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            format!("Processing {} - Page 1", seed),
            format!("Processing {} - Page 2", seed),
            format!("Processed 1/1: {}", seed),
        ]
    );
    assert!(seen.iter().all(|(current, total, _)| *current == 1 && *total == 1));
}
