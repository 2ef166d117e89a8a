//! Progress reporting
//!
//! The crawler reports after every page transition and after every seed.
//! Reports for one seed arrive in page order; reports of concurrently
//! crawled seeds may interleave.

/// Receives crawl progress
///
/// Implementations are called inline from the crawl loop, possibly from
/// several seeds at once, and must return promptly: hand slow work off to
/// a channel instead of doing it in `report`.
pub trait ProgressSink: Send + Sync {
    /// `current` is the 1-based index of the seed, `total` the seed count
    fn report(&self, current: usize, total: usize, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize, &str) + Send + Sync,
{
    fn report(&self, current: usize, total: usize, message: &str) {
        self(current, total, message)
    }
}

/// Forwards progress to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, current: usize, total: usize, message: &str) {
        tracing::info!("[{}/{}] {}", current, total, message);
    }
}
