//! Integration tests for Warc-Harvest
//!
//! These tests use wiremock to serve fake sites and tempfile for output
//! directories, and exercise full crawls end-to-end.

mod common;
mod crawl_tests;
mod fetch_tests;
