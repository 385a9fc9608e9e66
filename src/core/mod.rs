//! Core business logic abstractions

pub mod cache;
pub mod clock;
pub mod config;
pub mod currency;
pub mod log;
pub mod metrics;
pub mod profitability;
pub mod rate;
pub mod validation;

// Re-export main types for cleaner imports
pub use currency::CurrencyRateProvider;
pub use metrics::{Calculation, CalculationResult, Evaluation, MetricsEngine};
pub use rate::{ExchangeRateService, RateOrigin, RateQuote, RateSource};
pub use validation::{Validate, ValidationReport};
