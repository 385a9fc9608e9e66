pub mod cli;
pub mod core;
pub mod export;
pub mod providers;

use crate::core::cache::RateCache;
use crate::core::config::AppConfig;
use crate::core::{Calculation, ExchangeRateService, MetricsEngine};
use crate::providers::nbp::NbpCurrencyProvider;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

/// How a calculation result is presented.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Print the result record as JSON instead of tables.
    pub json: bool,
    /// Write the grouped report to this file (`.json` or `.csv`).
    pub export: Option<PathBuf>,
}

pub enum AppCommand {
    Calculate {
        calculation: Calculation,
        output: OutputOptions,
    },
    Rate,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("ACOS forecast starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let nbp = config.nbp();
    let currency_provider = NbpCurrencyProvider::new(&nbp.base_url, nbp.timeout());
    let rates = ExchangeRateService::new(
        currency_provider,
        RateCache::new(),
        &config.rates,
        nbp.timeout(),
    );

    match command {
        AppCommand::Calculate {
            mut calculation,
            output,
        } => {
            if let Calculation::Forecast(input) = &mut calculation
                && input.currency.trim().is_empty()
            {
                input.currency = config.currency.clone();
            }
            let engine = MetricsEngine::new(rates);
            cli::calculate::run(&engine, &calculation, &output).await
        }
        AppCommand::Rate => cli::rate::run(&rates).await,
    }
}
