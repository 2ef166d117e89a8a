use crate::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Warc-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub seeds: SeedsConfig,
}

impl Config {
    /// Builds a configuration with default crawl and fetch settings that
    /// writes containers into `directory`
    pub fn with_output_dir(directory: impl Into<String>) -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            fetch: FetchConfig::default(),
            output: OutputConfig {
                directory: directory.into(),
                log_file: None,
                file_naming: FileNaming::default(),
            },
            seeds: SeedsConfig::default(),
        }
    }
}

/// Crawl behavior configuration, scoped to one run
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Enables heuristic next-link detection
    #[serde(rename = "follow-pagination", default)]
    pub follow_pagination: bool,

    /// CSS selector tried before the built-in next-link patterns
    #[serde(rename = "custom-next-selector", default)]
    pub custom_next_selector: Option<String>,

    /// Maximum pages fetched per seed (unbounded when absent)
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Number of seeds whose pagination chains run concurrently
    #[serde(
        rename = "max-concurrent-seeds",
        default = "default_max_concurrent_seeds"
    )]
    pub max_concurrent_seeds: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            follow_pagination: false,
            custom_next_selector: None,
            max_pages: None,
            max_concurrent_seeds: default_max_concurrent_seeds(),
        }
    }
}

/// HTTP fetch and retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Retries after the first attempt on 403, timeout or transport error
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff base in seconds; attempt n waits base * 2^(n-1)
    #[serde(rename = "base-retry-delay", default = "default_base_retry_delay")]
    pub base_retry_delay: f64,

    /// Upper bound in seconds of the random jitter added on 403 retries
    #[serde(rename = "retry-jitter", default = "default_retry_jitter")]
    pub retry_jitter: f64,

    /// Per-attempt timeout in seconds
    #[serde(rename = "fetch-timeout", default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    /// Replaces the built-in user agent pool when non-empty
    #[serde(rename = "user-agents", default)]
    pub user_agents: Vec<String>,
}

impl FetchConfig {
    pub fn base_delay(&self) -> Result<Duration, ConfigError> {
        seconds_to_duration("base_retry_delay", self.base_retry_delay)
    }

    pub fn jitter(&self) -> Result<Duration, ConfigError> {
        seconds_to_duration("retry_jitter", self.retry_jitter)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_retry_delay: default_base_retry_delay(),
            retry_jitter: default_retry_jitter(),
            fetch_timeout: default_fetch_timeout(),
            user_agents: Vec::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one container per seed
    pub directory: String,

    /// Log file appended to for the duration of a run
    #[serde(rename = "log-file", default)]
    pub log_file: Option<String>,

    /// How container file names are derived from seed URLs
    #[serde(rename = "file-naming", default)]
    pub file_naming: FileNaming,
}

/// Container naming scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileNaming {
    /// Last path segment of the seed; colliding seeds overwrite each other
    #[default]
    LastSegment,
    /// Last path segment plus a short hash of the full seed URL
    HashSuffixed,
}

/// Seed list location
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedsConfig {
    /// Path to the two-column CSV seed list
    pub path: Option<String>,
}

fn seconds_to_duration(name: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|e| {
        ConfigError::Validation(format!("{} of {} seconds is out of range: {}", name, value, e))
    })
}

fn default_max_concurrent_seeds() -> u32 {
    1
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_retry_delay() -> f64 {
    5.0
}

fn default_retry_jitter() -> f64 {
    1.0
}

fn default_fetch_timeout() -> u64 {
    30
}
