//! Per-seed outcomes and the run summary

use crate::state::SeedStatus;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How one seed of the run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOutcome {
    /// 0-based position of the seed in the input list
    pub index: usize,

    /// The seed as given (the parsed URL when it was valid)
    pub seed: String,

    pub status: SeedStatus,

    /// Pages fetched before the chain ended
    pub pages: usize,

    /// Container written for this seed
    pub container: Option<PathBuf>,

    /// Failure cause, for partial and failed seeds
    pub error: Option<String>,
}

impl SeedOutcome {
    pub fn new(index: usize, seed: impl Into<String>, status: SeedStatus) -> Self {
        Self {
            index,
            seed: seed.into(),
            status,
            pages: 0,
            container: None,
            error: None,
        }
    }

    pub fn with_pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_container(mut self, path: PathBuf) -> Self {
        self.container = Some(path);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Result of a crawl run, one outcome per seed in input order
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub outcomes: Vec<SeedOutcome>,
}

impl CrawlSummary {
    pub fn new(mut outcomes: Vec<SeedOutcome>) -> Self {
        outcomes.sort_by_key(|outcome| outcome.index);
        Self { outcomes }
    }

    /// Number of seeds in the run
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn containers_written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.container.is_some())
            .count()
    }

    pub fn count_by_status(&self, status: SeedStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }

    /// Seed counts for every status that occurred
    pub fn by_status(&self) -> HashMap<SeedStatus, usize> {
        let mut counts = HashMap::new();
        for outcome in &self.outcomes {
            *counts.entry(outcome.status).or_insert(0) += 1;
        }
        counts
    }

    /// Total pages fetched across all seeds
    pub fn total_pages(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.pages).sum()
    }

    /// Paths of the containers written, in seed order
    pub fn containers(&self) -> impl Iterator<Item = &Path> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.container.as_deref())
    }

    /// Returns true if every seed was archived completely
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| outcome.status.is_success())
    }
}

/// Prints the run summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!("  Seeds: {}", summary.total());
    println!("  Pages fetched: {}", summary.total_pages());
    println!("  Containers written: {}", summary.containers_written());
    println!();

    println!("Seeds by Status:");
    for status in SeedStatus::all_statuses() {
        let count = summary.count_by_status(status);
        if count == 0 {
            continue;
        }
        let percentage = (count as f64 / summary.total() as f64) * 100.0;
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    let problems: Vec<_> = summary
        .outcomes
        .iter()
        .filter(|outcome| outcome.status.is_error())
        .collect();
    if !problems.is_empty() {
        println!("Errors ({}):", problems.len());
        for outcome in problems {
            println!(
                "  - [{}] {}: {}",
                outcome.status,
                outcome.seed,
                outcome.error.as_deref().unwrap_or_default()
            );
        }
        println!();
    }

    println!(
        "{} of {} containers written",
        summary.containers_written(),
        summary.total()
    );
}
