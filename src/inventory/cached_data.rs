use std::time::{Duration, Instant};

/// A value stamped with the moment it was fetched and how long it may be served.
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    data: T,
    fetched_at: Instant,
    ttl: Duration,
}

impl<T> CachedData<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    /// A zero TTL is never fresh.
    pub fn is_fresh(&self) -> bool {
        !self.ttl.is_zero() && self.fetched_at.elapsed() <= self.ttl
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// The payload, only while it may still be served.
    pub fn fresh(&self) -> Option<&T> {
        self.is_fresh().then_some(&self.data)
    }
}
