use crate::crawler::{FetchResult, PaginationResolver};
use std::collections::HashSet;
use url::Url;

/// One unit of crawl work: a seed and its pagination chain so far
///
/// Owned and mutated only by the sequential loop crawling this seed.
#[derive(Debug, Clone)]
pub struct SeedTask {
    origin: Url,
    current: Url,
    pages: Vec<FetchResult>,
    page_number: u32,
    discovered_links: Vec<Url>,
    visited: HashSet<Url>,
}

impl SeedTask {
    pub fn new(origin: Url) -> Self {
        let mut visited = HashSet::new();
        visited.insert(origin.clone());
        Self {
            current: origin.clone(),
            origin,
            pages: Vec::new(),
            page_number: 1,
            discovered_links: Vec::new(),
            visited,
        }
    }

    /// The seed URL this task was created from
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// The URL to fetch next
    pub fn current_url(&self) -> &Url {
        &self.current
    }

    /// 1-based number of the current page
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Pages fetched so far, in visit order
    pub fn pages(&self) -> &[FetchResult] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Appends the page fetched for the current URL
    pub fn record_page(&mut self, page: FetchResult) {
        self.pages.push(page);
    }

    /// Asks the resolver for the page following the last fetched one
    pub fn next_url(&mut self, resolver: &PaginationResolver) -> Option<Url> {
        let page = self.pages.last()?;
        resolver.resolve(
            &page.body,
            &page.final_url,
            self.page_number,
            &mut self.discovered_links,
        )
    }

    /// Returns true if the URL was already part of this chain
    pub fn has_visited(&self, url: &Url) -> bool {
        self.visited.contains(url)
    }

    /// Moves the chain on to `next`
    pub fn advance(&mut self, next: Url) {
        self.visited.insert(next.clone());
        self.current = next;
        self.page_number += 1;
    }
}
