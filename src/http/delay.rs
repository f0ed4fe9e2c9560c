//! Randomized delay between page requests
//!
//! The site throttles clients that hit the endpoint at a fixed cadence, so
//! each gap is drawn uniformly from `[min, max]`.

use rand::Rng;
use std::time::Duration;
use tracing::trace;

/// Random pause inserted between consecutive page fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDelay {
    min: Duration,
    max: Duration,
}

impl Default for PageDelay {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(500),
            max: Duration::from_millis(1000),
        }
    }
}

impl PageDelay {
    /// Create a delay range; the bounds are swapped if given out of order
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// No delay at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Lower bound
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a duration from the range
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let low = self.min.as_millis() as u64;
        let high = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }

    /// Sleep for a sampled duration and return it
    pub async fn wait(&self) -> Duration {
        let pause = self.sample();
        trace!(pause_ms = pause.as_millis() as u64, "Sleeping between pages");
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        pause
    }
}
