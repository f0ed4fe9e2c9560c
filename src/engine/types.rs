//! Engine types
//!
//! Configuration, statistics and the run report for the scrape engine.

use crate::http::PageDelay;
use crate::pagination::MAX_PAGE_SIZE;
use crate::record::Record;
use std::fmt;
use std::time::Duration;

/// Configuration for a scrape run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Items requested per page
    pub page_size: u32,
    /// Pause between consecutive pages
    pub delay: PageDelay,
    /// Refresh-and-retry cycles allowed per page on access denied
    pub max_auth_refreshes: u32,
    /// Retries allowed per page on transient failures
    pub max_transient_retries: u32,
    /// Pause after a token refresh before re-issuing the page
    pub auth_backoff: Duration,
    /// Stop after this many pages (0 = unlimited)
    pub max_pages: u32,
    /// Drop records whose `(id, link)` was already collected
    pub dedupe: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            delay: PageDelay::default(),
            max_auth_refreshes: 1,
            max_transient_retries: 1,
            auth_backoff: Duration::from_secs(2),
            max_pages: 0,
            dedupe: false,
        }
    }
}

impl EngineConfig {
    /// Create a new engine config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Set the inter-page delay
    #[must_use]
    pub fn with_delay(mut self, delay: PageDelay) -> Self {
        self.delay = delay;
        self
    }

    /// Set the per-page refresh budget
    #[must_use]
    pub fn with_max_auth_refreshes(mut self, max: u32) -> Self {
        self.max_auth_refreshes = max;
        self
    }

    /// Set the per-page transient retry budget
    #[must_use]
    pub fn with_max_transient_retries(mut self, max: u32) -> Self {
        self.max_transient_retries = max;
        self
    }

    /// Set the pause after a refresh
    #[must_use]
    pub fn with_auth_backoff(mut self, backoff: Duration) -> Self {
        self.auth_backoff = backoff;
        self
    }

    /// Set max pages
    #[must_use]
    pub fn with_max_pages(mut self, max: u32) -> Self {
        self.max_pages = max;
        self
    }

    /// Enable `(id, link)` de-duplication
    #[must_use]
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }
}

/// Statistics from a scrape run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeStats {
    /// Page requests issued, retries included
    pub requests_sent: usize,
    /// Pages successfully consumed
    pub pages_fetched: usize,
    /// Records kept
    pub records_collected: usize,
    /// Inter-page pauses taken
    pub delays_slept: usize,
    /// Token refreshes performed
    pub auth_refreshes: usize,
    /// Transient retries performed
    pub transient_retries: usize,
    /// Records dropped as duplicates
    pub duplicates_skipped: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ScrapeStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Why a run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCause {
    /// Network, timeout, unexpected status or unparseable body
    Transient,
    /// The site kept rejecting the session after refreshes
    AuthExpired,
    /// No usable session tokens could be obtained
    ProviderFailure,
}

impl FailureCause {
    /// Process exit code for this cause
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Transient => 2,
            Self::AuthExpired => 3,
            Self::ProviderFailure => 4,
        }
    }

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::AuthExpired => "auth_expired",
            Self::ProviderFailure => "provider_failure",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause and description of an aborted run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    /// Why the run stopped
    pub cause: FailureCause,
    /// Human-readable detail, including the last error seen
    pub message: String,
}

impl RunFailure {
    /// Create a failure
    pub fn new(cause: FailureCause, message: impl Into<String>) -> Self {
        Self {
            cause,
            message: message.into(),
        }
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.cause, self.message)
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// All pages consumed (or the page cap reached)
    Complete,
    /// Stopped early; collected records are still in the report
    Aborted(RunFailure),
}

impl Outcome {
    /// Whether the run completed
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Failure details, if aborted
    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            Self::Complete => None,
            Self::Aborted(failure) => Some(failure),
        }
    }

    /// Process exit code
    pub fn exit_code(&self) -> i32 {
        self.failure().map_or(0, |f| f.cause.exit_code())
    }
}

/// Result of [`ScrapeEngine::scrape_all`](super::ScrapeEngine::scrape_all)
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    /// Records in arrival order
    pub records: Vec<Record>,
    /// How the run ended
    pub outcome: Outcome,
    /// Run statistics
    pub stats: ScrapeStats,
}

impl ScrapeReport {
    /// Whether the run completed
    pub fn is_complete(&self) -> bool {
        self.outcome.is_complete()
    }

    /// Process exit code
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}
