use std::time::Duration;

/// Bounded retry with exponential backoff, used while waiting for a page to
/// finish rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay to sleep after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(5),
            multiplier: 2,
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Pacing applied between page loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlPolicy {
    /// Wait before reading each page of a band list.
    pub page_delay: Duration,
    /// Wait after loading a band page before reading its discography.
    pub render_delay: Duration,
    pub max_pages: usize,
    pub empty_discography: RetryPolicy,
}

impl CrawlPolicy {
    /// No waiting at all, for replayed pages.
    pub fn immediate() -> Self {
        CrawlPolicy {
            page_delay: Duration::ZERO,
            render_delay: Duration::ZERO,
            max_pages: 1000,
            empty_discography: RetryPolicy {
                initial_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
                ..RetryPolicy::default()
            },
        }
    }
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        CrawlPolicy {
            page_delay: Duration::from_secs(2),
            render_delay: Duration::from_millis(400),
            max_pages: 1000,
            empty_discography: RetryPolicy::default(),
        }
    }
}
