//! Outbound call concurrency limiter.
//!
//! Bounds how many calls the client has open at once, regardless of how
//! many logical operations the caller runs in parallel. A slot is held for
//! one HTTP exchange (including its redirect hops), never across a backoff
//! or poll sleep.
//!
//! # Usage
//!
//! ```ignore
//! let throttle = OutboundThrottle::new(64);
//! let _permit = throttle.acquire().await?;
//! // HTTP exchange happens here...
//! // slot is released when _permit goes out of scope
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Counting gate over outbound calls.
#[derive(Debug)]
pub struct OutboundThrottle {
    /// Semaphore controlling concurrent calls
    semaphore: Semaphore,

    /// Maximum permits (for stats/debugging)
    max_permits: usize,

    /// Current number of in-flight calls
    in_flight: AtomicUsize,

    /// Peak concurrent calls observed
    peak_in_flight: AtomicUsize,
}

impl OutboundThrottle {
    /// Creates a throttle with `max_concurrent` slots (minimum 1).
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Semaphore::new(max_concurrent),
            max_permits: max_concurrent,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Waits for a free slot.
    pub async fn acquire(&self) -> Result<ThrottlePermit<'_>, AcquireError> {
        let permit = self.semaphore.acquire().await?;
        Ok(self.track(permit))
    }

    fn track<'a>(&'a self, permit: SemaphorePermit<'a>) -> ThrottlePermit<'a> {
        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);
        ThrottlePermit {
            _permit: permit,
            in_flight: &self.in_flight,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A held outbound slot. Released on drop, on every exit path.
#[derive(Debug)]
pub struct ThrottlePermit<'a> {
    _permit: SemaphorePermit<'a>,
    in_flight: &'a AtomicUsize,
}

impl Drop for ThrottlePermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
