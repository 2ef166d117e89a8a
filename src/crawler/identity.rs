//! Client identity rotation
//!
//! Every fetch attempt presents a user agent drawn at random from a fixed
//! pool, together with the content-negotiation headers a desktop browser
//! would send.

use rand::seq::SliceRandom;
use std::sync::Arc;

/// Built-in desktop browser user agents
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// User agent written into archived request records
///
/// Request records describe a synthetic request, so they always carry the
/// same identity regardless of which agent the transport actually used.
pub const ARCHIVE_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) HeadlessChrome/131.0.0.0 Safari/537.36";

pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Read-only pool of client identities, cheap to clone and share
#[derive(Debug, Clone)]
pub struct IdentityPool {
    agents: Arc<[String]>,
}

impl IdentityPool {
    /// Creates a pool from the given agents, or the built-in pool when empty
    pub fn new(agents: Vec<String>) -> Self {
        if agents.is_empty() {
            return Self::default();
        }
        Self {
            agents: agents.into(),
        }
    }

    /// Picks a user agent uniformly at random
    pub fn random(&self) -> &str {
        self.agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(ARCHIVE_USER_AGENT)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.agents.iter().any(|a| a == agent)
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self {
            agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
