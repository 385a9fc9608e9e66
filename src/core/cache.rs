use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// A rate together with the moment it was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CachedRate {
    pub rate: Option<f64>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CachedRate {
    /// Returns the rate if it was fetched less than `ttl` before `now`.
    pub fn fresh(&self, now: DateTime<Utc>, ttl: Duration) -> Option<f64> {
        match (self.rate, self.fetched_at) {
            (Some(rate), Some(fetched_at)) if now - fetched_at < ttl => {
                debug!("Cache HIT");
                Some(rate)
            }
            (Some(_), Some(fetched_at)) => {
                debug!(%fetched_at, "Cache entry expired");
                None
            }
            _ => {
                debug!("Cache MISS");
                None
            }
        }
    }
}

/// Single-slot exchange rate cache. Cloning shares the slot.
#[derive(Clone, Default)]
pub struct RateCache {
    inner: Arc<Mutex<CachedRate>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> CachedRate {
        *self.inner.lock().await
    }

    pub async fn put(&self, rate: f64, fetched_at: DateTime<Utc>) {
        self.lock().await.store(rate, fetched_at);
    }

    /// Holds the slot exclusively, e.g. across a refresh.
    pub async fn lock(&self) -> RateCacheGuard<'_> {
        RateCacheGuard {
            guard: self.inner.lock().await,
        }
    }
}

pub struct RateCacheGuard<'a> {
    guard: MutexGuard<'a, CachedRate>,
}

impl RateCacheGuard<'_> {
    pub fn fresh(&self, now: DateTime<Utc>, ttl: Duration) -> Option<f64> {
        self.guard.fresh(now, ttl)
    }

    pub fn store(&mut self, rate: f64, fetched_at: DateTime<Utc>) {
        debug!(rate, %fetched_at, "Cache PUT");
        *self.guard = CachedRate {
            rate: Some(rate),
            fetched_at: Some(fetched_at),
        };
    }
}
