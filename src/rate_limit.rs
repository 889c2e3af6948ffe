//! Run-scoped count of rate-limit responses
//!
//! The counter is a heuristic trigger for the batch coordinator, not an exact
//! tally: concurrent fetches increment it without coordination and a lost
//! update only delays a mode switch by one response.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Shared, lock-free counter of HTTP 429 responses
///
/// Cloning yields another handle to the same counter. The fetcher increments
/// it, the enricher and coordinator read it, and only the coordinator resets
/// it (at the start of a run).
#[derive(Clone, Debug, Default)]
pub struct RateLimitCounter {
    count: Arc<AtomicU32>,
}

impl RateLimitCounter {
    /// Create a counter starting at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one rate-limit response, returning the new count
    pub fn increment(&self) -> u32 {
        self.count.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    /// Current count
    #[must_use]
    pub fn get(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Reset to zero (start of a new top-level run)
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    /// Whether the count has reached `threshold`
    #[must_use]
    pub fn reached(&self, threshold: u32) -> bool {
        self.get() >= threshold
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let counter = RateLimitCounter::new();
        let other = counter.clone();

        assert_eq!(counter.increment(), 1);
        assert_eq!(other.increment(), 2);
        assert_eq!(counter.get(), 2);

        other.reset();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn reached_is_inclusive() {
        let counter = RateLimitCounter::new();
        for _ in 0..9 {
            counter.increment();
        }
        assert!(!counter.reached(10));
        counter.increment();
        assert!(counter.reached(10));
    }

    #[tokio::test]
    async fn concurrent_increments_do_not_panic() {
        let counter = RateLimitCounter::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                tokio::spawn(async move {
                    for _ in 0..100 {
                        counter.increment();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(counter.get(), 800);
    }
}
