//! Pagination resolver
//!
//! Finds the URL of the page following the one just fetched. Two sources are
//! consulted, first match wins:
//!
//! 1. A structured `div.page-links` container listing `a.post-page-numbers`
//!    links. Once seen, its list is authoritative for the rest of the chain
//!    and later pages are looked up by index.
//! 2. Heuristic next-link patterns, only when pagination following is
//!    enabled. A custom selector is tried before the built-in patterns.

use crate::url::resolve_link;
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use url::Url;

const PAGE_LINKS_CONTAINER: &str = "div.page-links";
const PAGE_LINK: &str = "a.post-page-numbers[href]";

/// Attributes that may carry a navigable URL, in lookup order
const URL_ATTRIBUTES: &[&str] = &["data-url", "data-href", "href"];

/// Built-in next-link patterns in priority order
///
/// `Text` entries stand in for `:contains(..)`, which CSS selectors lack.
const NEXT_PATTERNS: &[PatternSpec] = &[
    PatternSpec::Css("a.next"),
    PatternSpec::Css("a.pagination-next"),
    PatternSpec::Css("a[rel=\"next\"]"),
    PatternSpec::Css("link[rel=\"next\"]"),
    PatternSpec::Text("a", "Next"),
    PatternSpec::Text("a", "next"),
    PatternSpec::Css("button.next"),
    PatternSpec::Text("button", "Next"),
    PatternSpec::Css(".pagination .next"),
    PatternSpec::Css(".pagination-next"),
    PatternSpec::Css("nav.pagination a[aria-label=\"Next\"]"),
    PatternSpec::Css("[data-page=\"next\"]"),
    PatternSpec::Css("[data-action=\"next\"]"),
    PatternSpec::Css("[data-role=\"next\"]"),
    PatternSpec::Css("[data-nav=\"next\"]"),
    PatternSpec::Css(".load-more"),
    PatternSpec::Css("#loadMore"),
    PatternSpec::Css("#load-more"),
    PatternSpec::Css(".show-more"),
    PatternSpec::Css("#showMore"),
    PatternSpec::Css("#show-more"),
    PatternSpec::Css("[data-load-more]"),
    PatternSpec::Css("[data-show-more]"),
    PatternSpec::Css(".next-page"),
    PatternSpec::Css(".nextPage"),
    PatternSpec::Css(".next_page"),
    PatternSpec::Css(".paginationNext"),
    PatternSpec::Css(".pagination__next"),
    PatternSpec::Css(".pagination-item--next"),
    PatternSpec::Css("[aria-label*=\"Next\"]"),
    PatternSpec::Css("[title*=\"Next\"]"),
    PatternSpec::Css("[aria-label*=\"next\"]"),
    PatternSpec::Css("[title*=\"next\"]"),
    PatternSpec::Css(".fa-chevron-right"),
    PatternSpec::Css(".fa-arrow-right"),
    PatternSpec::Css(".icon-next"),
    PatternSpec::Css(".icon-arrow-right"),
];

/// Inline-script URL assignments found in `onclick` handlers
const SCRIPT_URL_PATTERNS: &[&str] = &[
    r#"window\.location(?:\.href)?\s*=\s*['"]([^'"]+)['"]"#,
    r#"(?:document\.)?location\.href\s*=\s*['"]([^'"]+)['"]"#,
    r#"navigate\(\s*['"]([^'"]+)['"]"#,
    r#"window\.open\(\s*['"]([^'"]+)['"]"#,
];

#[derive(Debug, Clone, Copy)]
enum PatternSpec {
    Css(&'static str),
    Text(&'static str, &'static str),
}

#[derive(Debug)]
enum NextPattern {
    Css(Selector),
    Text { selector: Selector, needle: String },
}

impl NextPattern {
    fn matches<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let (selector, needle) = match self {
            Self::Css(selector) => (selector, None),
            Self::Text { selector, needle } => (selector, Some(needle.as_str())),
        };
        document.select(selector).filter(move |element| match needle {
            Some(needle) => element.text().any(|t| t.contains(needle)),
            None => true,
        })
    }
}

/// Resolves the next page of a pagination chain
///
/// The pattern lists are run-scoped, read-only and shared between seeds.
#[derive(Debug, Clone)]
pub struct PaginationResolver {
    follow_pagination: bool,
    container: Arc<Selector>,
    page_link: Arc<Selector>,
    patterns: Arc<[NextPattern]>,
    script_patterns: Arc<[Regex]>,
}

impl PaginationResolver {
    /// Creates a resolver
    ///
    /// # Arguments
    ///
    /// * `follow_pagination` - enables heuristic next-link detection
    /// * `custom_selector` - tried before the built-in patterns
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidSelector` if the custom selector does not parse.
    pub fn new(follow_pagination: bool, custom_selector: Option<&str>) -> Result<Self, ConfigError> {
        let mut patterns = Vec::with_capacity(NEXT_PATTERNS.len() + 1);

        if let Some(custom) = custom_selector {
            patterns.push(NextPattern::Css(parse_selector(custom)?));
        }

        for spec in NEXT_PATTERNS {
            let pattern = match *spec {
                PatternSpec::Css(css) => parse_selector(css).map(NextPattern::Css),
                PatternSpec::Text(tag, needle) => parse_selector(tag).map(|selector| {
                    NextPattern::Text {
                        selector,
                        needle: needle.to_string(),
                    }
                }),
            };
            match pattern {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => tracing::warn!("Skipping next-link pattern: {}", e),
            }
        }

        let script_patterns = SCRIPT_URL_PATTERNS
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!("Skipping script URL pattern {}: {}", pattern, e);
                    None
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            follow_pagination,
            container: Arc::new(parse_selector(PAGE_LINKS_CONTAINER)?),
            page_link: Arc::new(parse_selector(PAGE_LINK)?),
            patterns: patterns.into(),
            script_patterns: script_patterns.into(),
        })
    }

    pub fn follows_pagination(&self) -> bool {
        self.follow_pagination
    }

    /// Resolves the URL following page `page_number` (1-based)
    ///
    /// `discovered` holds the structured link list of this chain. It is
    /// filled the first time a page exposes one; from then on the next URL
    /// is `discovered[page_number]` and the body is not parsed at all.
    ///
    /// Returns None when there is no next page; malformed markup degrades to
    /// None rather than an error.
    pub fn resolve(
        &self,
        body: &str,
        current_url: &Url,
        page_number: u32,
        discovered: &mut Vec<Url>,
    ) -> Option<Url> {
        if discovered.is_empty() {
            let document = Html::parse_document(body);
            let links = self.page_links(&document, current_url);

            if links.is_empty() {
                if !self.follow_pagination {
                    return None;
                }
                return self.heuristic_next(&document, current_url);
            }

            tracing::debug!(
                "Found {} structured page links on {}",
                links.len(),
                current_url
            );
            *discovered = links;
        }

        discovered.get(page_number as usize).cloned()
    }

    /// Extracts the ordered page list from the first page-links container
    pub fn page_links(&self, document: &Html, base_url: &Url) -> Vec<Url> {
        let Some(container) = document.select(&self.container).next() else {
            return Vec::new();
        };

        container
            .select(&self.page_link)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| resolve_link(href, base_url))
            .collect()
    }

    /// Scans the document with the next-link patterns
    fn heuristic_next(&self, document: &Html, current_url: &Url) -> Option<Url> {
        self.patterns
            .iter()
            .flat_map(|pattern| pattern.matches(document))
            .find_map(|element| self.navigable_url(element, current_url))
    }

    /// Extracts a URL from the element, or from the anchor wrapping it
    fn navigable_url(&self, element: ElementRef<'_>, current_url: &Url) -> Option<Url> {
        self.element_url(element, current_url).or_else(|| {
            element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|ancestor| ancestor.value().name() == "a")
                .and_then(|anchor| self.element_url(anchor, current_url))
        })
    }

    fn element_url(&self, element: ElementRef<'_>, current_url: &Url) -> Option<Url> {
        let attrs = element.value();

        URL_ATTRIBUTES
            .iter()
            .filter_map(|name| attrs.attr(name))
            .chain(
                attrs
                    .attr("onclick")
                    .and_then(|onclick| self.script_url(onclick)),
            )
            .filter_map(|candidate| resolve_link(candidate, current_url))
            .find(|url| url != current_url)
    }

    fn script_url<'a>(&self, script: &'a str) -> Option<&'a str> {
        self.script_patterns.iter().find_map(|pattern| {
            pattern
                .captures(script)
                .and_then(|captures| captures.get(1))
                .map(|m| m.as_str())
        })
    }
}

fn parse_selector(css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::InvalidSelector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}
