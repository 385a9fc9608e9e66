//! Currency conversion abstractions

use anyhow::Result;
use async_trait::async_trait;

/// A remote source of exchange rates. Implementations report every failure;
/// callers decide how to degrade.
#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}
