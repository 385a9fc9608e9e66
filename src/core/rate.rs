//! EUR/PLN rate lookup with a freshness window and a fixed fallback.
//!
//! [`ExchangeRateService`] never fails: a fresh cached rate is served as is,
//! a stale or empty cache triggers one remote fetch, and any fetch failure
//! yields the configured fallback without touching the cache.

use crate::core::cache::RateCache;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::RatesConfig;
use crate::core::currency::CurrencyRateProvider;
use async_trait::async_trait;
use chrono::Duration;
use serde::Serialize;
use tracing::{debug, instrument, warn};

pub const BASE_CURRENCY: &str = "EUR";
pub const QUOTE_CURRENCY: &str = "PLN";

/// Where a quoted rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateOrigin {
    Live,
    Cached,
    Fallback,
}

impl std::fmt::Display for RateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateOrigin::Live => "live",
                RateOrigin::Cached => "cached",
                RateOrigin::Fallback => "fallback",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateQuote {
    pub rate: f64,
    pub origin: RateOrigin,
}

/// The narrow rate capability the metrics engine depends on.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn quote(&self) -> RateQuote;

    async fn get_rate(&self) -> f64 {
        self.quote().await.rate
    }
}

pub struct ExchangeRateService<P, C = SystemClock> {
    provider: P,
    clock: C,
    cache: RateCache,
    fallback_rate: f64,
    ttl: Duration,
    timeout: std::time::Duration,
}

impl<P: CurrencyRateProvider> ExchangeRateService<P> {
    pub fn new(
        provider: P,
        cache: RateCache,
        settings: &RatesConfig,
        timeout: std::time::Duration,
    ) -> Self {
        Self::with_clock(provider, SystemClock, cache, settings, timeout)
    }
}

impl<P: CurrencyRateProvider, C: Clock> ExchangeRateService<P, C> {
    pub fn with_clock(
        provider: P,
        clock: C,
        cache: RateCache,
        settings: &RatesConfig,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            provider,
            clock,
            cache,
            fallback_rate: settings.fallback_rate,
            ttl: settings.cache_ttl(),
            timeout,
        }
    }

    pub fn fallback_rate(&self) -> f64 {
        self.fallback_rate
    }

    async fn fetch(&self) -> anyhow::Result<f64> {
        let rate = tokio::time::timeout(
            self.timeout,
            self.provider.get_rate(BASE_CURRENCY, QUOTE_CURRENCY),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Rate lookup timed out after {:?}", self.timeout))??;

        if !rate.is_finite() || rate <= 0.0 {
            anyhow::bail!("Rate source returned an unusable rate: {rate}");
        }
        Ok(rate)
    }
}

#[async_trait]
impl<P: CurrencyRateProvider, C: Clock> RateSource for ExchangeRateService<P, C> {
    #[instrument(name = "RateQuote", skip(self))]
    async fn quote(&self) -> RateQuote {
        // Refreshes are serialized on the slot so a stale window costs one fetch.
        let mut slot = self.cache.lock().await;
        if let Some(rate) = slot.fresh(self.clock.now(), self.ttl) {
            return RateQuote {
                rate,
                origin: RateOrigin::Cached,
            };
        }

        match self.fetch().await {
            Ok(rate) => {
                debug!(rate, "Fetched live {}/{} rate", BASE_CURRENCY, QUOTE_CURRENCY);
                slot.store(rate, self.clock.now());
                RateQuote {
                    rate,
                    origin: RateOrigin::Live,
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = self.fallback_rate,
                    "Rate lookup failed, using fallback rate"
                );
                RateQuote {
                    rate: self.fallback_rate,
                    origin: RateOrigin::Fallback,
                }
            }
        }
    }
}
