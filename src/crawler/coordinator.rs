//! Crawler coordinator - main crawl orchestration logic
//!
//! Seeds are independent and may be crawled concurrently, up to
//! `max-concurrent-seeds` at a time. Each seed's pagination chain is strictly
//! sequential: the URL of page N+1 is only known once page N is fetched.
//!
//! A seed never aborts the run. Whatever happens to it ends up as a
//! `SeedOutcome` in the returned `CrawlSummary`.

use crate::archive::ArchiveWriter;
use crate::config::{validate, Config};
use crate::crawler::progress::ProgressSink;
use crate::crawler::{FetchError, Fetcher, PaginationResolver};
use crate::output::{CrawlSummary, SeedOutcome};
use crate::state::{SeedStatus, SeedTask};
use crate::url::parse_seed_url;
use crate::HarvestError;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Why a seed's pagination chain stopped
#[derive(Debug)]
enum ChainEnd {
    /// The resolver found no next page
    NoNextPage,
    /// The configured page cap was reached
    PageLimit,
    /// The next page was already part of the chain
    Revisit,
    /// A fetch failed after exhausting its retries
    Failed(FetchError),
    /// The run was cancelled
    Cancelled,
}

/// Drives the per-seed fetch/resolve loop and hands results to the writer
pub struct Crawler {
    fetcher: Fetcher,
    resolver: PaginationResolver,
    writer: ArchiveWriter,
    max_pages: Option<u32>,
    max_concurrent_seeds: usize,
    progress: Option<Arc<dyn ProgressSink>>,
    cancel: CancellationToken,
}

impl Crawler {
    /// Creates a crawler, validating `config` first
    ///
    /// # Errors
    ///
    /// * `HarvestError::Config` - a value is out of range or the custom next
    ///   selector does not parse
    /// * `HarvestError::Fetch` - the HTTP client could not be built
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        validate(config)?;

        let fetcher = Fetcher::from_config(&config.fetch)?;
        let resolver = PaginationResolver::new(
            config.crawler.follow_pagination,
            config.crawler.custom_next_selector.as_deref(),
        )?;

        Ok(Self {
            fetcher,
            resolver,
            writer: ArchiveWriter::new(config.output.file_naming),
            max_pages: config.crawler.max_pages,
            max_concurrent_seeds: config.crawler.max_concurrent_seeds.max(1) as usize,
            progress: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Sets the sink receiving progress reports
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Uses `token` to stop the run early
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this crawler's runs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawls every seed and writes one container per seed into `destination`
    ///
    /// Never fails: invalid seeds, exhausted fetches and write errors are
    /// logged and reported in the summary. Outcomes are returned in seed
    /// order regardless of completion order.
    pub async fn crawl<S>(&self, seeds: &[S], destination: &Path) -> CrawlSummary
    where
        S: AsRef<str> + Sync,
    {
        let total = seeds.len();
        tracing::info!(
            "Crawling {} seeds into {} ({} at a time, heuristic pagination {})",
            total,
            destination.display(),
            self.max_concurrent_seeds,
            if self.resolver.follows_pagination() { "on" } else { "off" }
        );

        let outcomes = stream::iter(seeds.iter().enumerate())
            .map(|(index, seed)| {
                let seed = seed.as_ref().trim();
                let span = tracing::info_span!("seed", index = index + 1, url = %seed);
                self.crawl_seed(index, seed, total, destination)
                    .instrument(span)
            })
            .buffer_unordered(self.max_concurrent_seeds)
            .collect::<Vec<_>>()
            .await;

        let summary = CrawlSummary::new(outcomes);
        tracing::info!(
            "{} of {} containers written",
            summary.containers_written(),
            total
        );
        summary
    }

    async fn crawl_seed(
        &self,
        index: usize,
        seed: &str,
        total: usize,
        destination: &Path,
    ) -> SeedOutcome {
        let current = index + 1;

        let outcome = match parse_seed_url(seed) {
            Ok(origin) => {
                let mut task = SeedTask::new(origin);
                let end = self.follow_chain(&mut task, current, total).await;
                self.finish_seed(index, task, end, destination).await
            }
            Err(e) => {
                tracing::error!("Skipping invalid seed {}: {}", seed, e);
                SeedOutcome::new(index, seed, SeedStatus::Failed).with_error(e.to_string())
            }
        };

        self.report(current, total, &format!("Processed {}/{}: {}", current, total, seed));
        outcome
    }

    /// Fetches pages until the chain ends
    async fn follow_chain(&self, task: &mut SeedTask, current: usize, total: usize) -> ChainEnd {
        loop {
            if self.cancel.is_cancelled() {
                return ChainEnd::Cancelled;
            }

            self.report(
                current,
                total,
                &format!("Processing {} - Page {}", task.origin(), task.page_number()),
            );

            let url = task.current_url().clone();
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return ChainEnd::Cancelled,
                result = self.fetcher.fetch(&url) => result,
            };

            match result {
                Ok(page) => {
                    tracing::debug!(
                        "Page {} of {}: HTTP {}, {} bytes",
                        task.page_number(),
                        task.origin(),
                        page.status_code,
                        page.body.len()
                    );
                    task.record_page(page);
                }
                Err(e) => return ChainEnd::Failed(e),
            }

            if let Some(max_pages) = self.max_pages {
                if task.page_count() >= max_pages as usize {
                    return ChainEnd::PageLimit;
                }
            }

            let Some(next) = task.next_url(&self.resolver) else {
                return ChainEnd::NoNextPage;
            };

            if task.has_visited(&next) {
                tracing::debug!("Pagination loops back to {}, stopping", next);
                return ChainEnd::Revisit;
            }

            task.advance(next);
        }
    }

    /// Archives what the chain collected and records how the seed ended
    async fn finish_seed(
        &self,
        index: usize,
        task: SeedTask,
        end: ChainEnd,
        destination: &Path,
    ) -> SeedOutcome {
        let seed = task.origin().as_str();
        let pages = task.page_count();
        let base = SeedOutcome::new(index, seed, SeedStatus::Failed).with_pages(pages);

        let (status, cause) = match end {
            ChainEnd::Cancelled => {
                tracing::info!("Cancelled {} after {} pages; nothing written", seed, pages);
                return SeedOutcome {
                    status: SeedStatus::Cancelled,
                    ..base
                };
            }
            ChainEnd::Failed(e) if task.is_empty() => {
                tracing::error!("Failed {}: {}", seed, e);
                return base.with_error(e.to_string());
            }
            ChainEnd::Failed(e) => (SeedStatus::Partial, Some(e.to_string())),
            ChainEnd::NoNextPage | ChainEnd::PageLimit | ChainEnd::Revisit => {
                (SeedStatus::Complete, None)
            }
        };

        match self.writer.write(task.origin(), task.pages(), destination).await {
            Ok(path) => {
                match &cause {
                    Some(e) => tracing::warn!(
                        "Partial {}: {} pages archived to {} before failure: {}",
                        seed,
                        pages,
                        path.display(),
                        e
                    ),
                    None => tracing::info!(
                        "Archived {}: {} pages to {}",
                        seed,
                        pages,
                        path.display()
                    ),
                }
                let outcome = SeedOutcome {
                    status,
                    ..base
                }
                .with_container(path);
                match cause {
                    Some(e) => outcome.with_error(e),
                    None => outcome,
                }
            }
            Err(e) => {
                tracing::error!("Failed to write container for {}: {}", seed, e);
                base.with_error(e.to_string())
            }
        }
    }

    fn report(&self, current: usize, total: usize, message: &str) {
        if let Some(progress) = &self.progress {
            progress.report(current, total, message);
        }
    }
}
