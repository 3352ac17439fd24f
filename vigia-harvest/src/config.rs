//! Harvester configuration.

use std::time::Duration;

/// Tunables for one harvester run.
///
/// Defaults match the upstream deployment: pages of 30, ten detail requests
/// in flight, three retries per request starting at one second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// Rows requested per listing page.
    pub page_size: u32,
    /// Maximum detail requests in flight at once.
    pub concurrency: usize,
    /// Per-request retries after the initial attempt.
    pub max_retries: u32,
    /// First backoff delay; doubles per attempt up to [`MAX_BACKOFF`].
    pub base_delay: Duration,
    /// Whole-batch retry passes over the accumulated failure set.
    pub residual_passes: u32,
    /// Per-request timeout for the HTTP client.
    pub timeout: Duration,
    /// Attempt cap per listing page. `None` retries a failing page
    /// indefinitely; losing partial pages is worse than stalling.
    pub page_attempt_cap: Option<u32>,
}

/// Ceiling on exponential backoff between retries.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_size: 30,
            concurrency: 10,
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            residual_passes: 2,
            timeout: Duration::from_secs(30),
            page_attempt_cap: None,
        }
    }
}
