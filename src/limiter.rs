//! Capacity-bounded, rate-paced gate for network calls and storage writes
//!
//! A [`RateLimiter`] combines a counting semaphore with a post-work delay:
//! the semaphore bounds *how many* units run at once, and the delay a finished
//! unit spends still holding its slot bounds *how soon* the next waiter may
//! start. All shared state lives inside the semaphore; callers never lock
//! anything themselves.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::RateLimit;

/// Shared limiter; clones refer to the same slots
#[derive(Clone, Debug)]
pub struct RateLimiter {
    slots: Arc<Semaphore>,
    rate: Duration,
    limit: usize,
}

impl RateLimiter {
    /// Create a limiter from a validated [`RateLimit`]
    ///
    /// # Examples
    ///
    /// ```
    /// use reqsweep::config::RateLimit;
    /// use reqsweep::limiter::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(RateLimit::new(0.1, 2).unwrap());
    /// assert_eq!(limiter.available(), 2);
    /// ```
    #[must_use]
    pub fn new(limit: RateLimit) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(limit.limit())),
            rate: limit.rate(),
            limit: limit.limit(),
        }
    }

    /// Wait for a free slot
    ///
    /// Returns `None` only if the limiter has been closed.
    pub async fn acquire(&self) -> Option<RatePermit> {
        let permit = Arc::clone(&self.slots).acquire_owned().await.ok()?;
        Some(RatePermit {
            permit,
            rate: self.rate,
        })
    }

    /// Slots free right now
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Configured capacity
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Configured pacing delay
    pub fn rate(&self) -> Duration {
        self.rate
    }

    /// Refuse all future acquisitions; waiters receive `None`
    pub fn close(&self) {
        self.slots.close();
    }
}

/// An occupied limiter slot
///
/// Call [`finish`](Self::finish) when the unit of work is done to apply the
/// pacing delay, or [`finish_in_background`](Self::finish_in_background) when
/// the caller should not wait for it. Dropping the permit instead frees the
/// slot immediately.
#[derive(Debug)]
#[must_use = "dropping a permit releases the slot without pacing"]
pub struct RatePermit {
    permit: OwnedSemaphorePermit,
    rate: Duration,
}

impl RatePermit {
    /// Hold the slot for the pacing delay, then release it
    pub async fn finish(self) {
        tokio::time::sleep(self.rate).await;
        drop(self.permit);
    }

    /// Apply the pacing delay on a detached task
    ///
    /// The slot stays occupied for the full rate even if the returned handle
    /// is dropped.
    pub fn finish_in_background(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.finish())
    }
}
