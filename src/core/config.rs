use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_NBP_BASE_URL: &str = "https://api.nbp.pl";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FALLBACK_RATE: f64 = 4.30;
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NbpProviderConfig {
    #[serde(default = "default_nbp_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl NbpProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for NbpProviderConfig {
    fn default() -> Self {
        NbpProviderConfig {
            base_url: default_nbp_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProvidersConfig {
    pub nbp: Option<NbpProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            nbp: Some(NbpProviderConfig::default()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RatesConfig {
    /// Rate returned whenever the remote lookup fails.
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: f64,
    /// Freshness window of the cached rate.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: i64,
}

impl RatesConfig {
    /// Freshness window; values outside chrono's range saturate.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.cache_ttl_hours.max(0))
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fallback_rate.is_finite() || self.fallback_rate <= 0.0 {
            anyhow::bail!(
                "rates.fallback_rate must be a positive number, got {}",
                self.fallback_rate
            );
        }
        if self.cache_ttl_hours < 0 {
            anyhow::bail!(
                "rates.cache_ttl_hours must not be negative, got {}",
                self.cache_ttl_hours
            );
        }
        chrono::Duration::try_hours(self.cache_ttl_hours).with_context(|| {
            format!(
                "rates.cache_ttl_hours is out of range: {}",
                self.cache_ttl_hours
            )
        })?;
        Ok(())
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            fallback_rate: default_fallback_rate(),
            cache_ttl_hours: default_cache_ttl_hours(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    /// Display currency tag for forecasts.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            rates: RatesConfig::default(),
            currency: default_currency(),
        }
    }
}

fn default_nbp_base_url() -> String {
    DEFAULT_NBP_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_fallback_rate() -> f64 {
    DEFAULT_FALLBACK_RATE
}

fn default_cache_ttl_hours() -> i64 {
    DEFAULT_CACHE_TTL_HOURS
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "acos-forecast", "acos-forecast")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .rates
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Base URL and timeout of the NBP rate source.
    pub fn nbp(&self) -> NbpProviderConfig {
        self.providers.nbp.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load_yaml(yaml: &str) -> Result<AppConfig> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, yaml)?;
        AppConfig::load_from_path(&config_path)
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  nbp:
    base_url: "http://example.com/nbp"
    timeout_secs: 3
rates:
  fallback_rate: 4.5
  cache_ttl_hours: 6
currency: "USD"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        let nbp = config.nbp();
        assert_eq!(nbp.base_url, "http://example.com/nbp");
        assert_eq!(nbp.timeout(), Duration::from_secs(3));
        assert_eq!(config.rates.fallback_rate, 4.5);
        assert_eq!(config.rates.cache_ttl(), chrono::Duration::hours(6));
        assert_eq!(config.currency, "USD");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.nbp().base_url, DEFAULT_NBP_BASE_URL);
        assert_eq!(config.nbp().timeout_secs, 10);
        assert_eq!(config.rates.fallback_rate, 4.30);
        assert_eq!(config.rates.cache_ttl_hours, 24);
        assert_eq!(config.currency, "EUR");
    }

    #[test]
    fn test_partial_provider_section() {
        let yaml_str = r#"
providers:
  nbp:
    timeout_secs: 2
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.nbp().base_url, DEFAULT_NBP_BASE_URL);
        assert_eq!(config.nbp().timeout_secs, 2);
    }

    #[test]
    fn test_missing_provider_falls_back_to_default() {
        let yaml_str = r#"
providers:
  nbp: ~
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert!(config.providers.nbp.is_none());
        assert_eq!(config.nbp(), NbpProviderConfig::default());
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = AppConfig::load_from_path("/nonexistent/acos-forecast/config.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_out_of_range_cache_ttl_is_rejected() {
        let err = load_yaml("rates:\n  cache_ttl_hours: 9223372036854775807\n").unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
        assert!(format!("{err:#}").contains("rates.cache_ttl_hours is out of range"));
    }

    #[test]
    fn test_negative_cache_ttl_is_rejected() {
        let err = load_yaml("rates:\n  cache_ttl_hours: -1\n").unwrap_err();
        assert!(format!("{err:#}").contains("rates.cache_ttl_hours must not be negative"));
    }

    #[test]
    fn test_unusable_fallback_rate_is_rejected() {
        let err = load_yaml("rates:\n  fallback_rate: 0\n").unwrap_err();
        assert!(format!("{err:#}").contains("rates.fallback_rate must be a positive number"));
    }

    #[test]
    fn test_cache_ttl_saturates_instead_of_panicking() {
        let rates = RatesConfig {
            fallback_rate: 4.3,
            cache_ttl_hours: i64::MAX,
        };
        assert_eq!(rates.cache_ttl(), chrono::Duration::MAX);
        assert!(rates.validate().is_err());

        let negative = RatesConfig {
            fallback_rate: 4.3,
            cache_ttl_hours: -5,
        };
        assert_eq!(negative.cache_ttl(), chrono::Duration::zero());
    }

    #[test]
    fn test_load_valid_file() -> Result<()> {
        let config = load_yaml("rates:\n  cache_ttl_hours: 0\n")?;
        assert_eq!(config.rates.cache_ttl(), chrono::Duration::zero());
        Ok(())
    }
}
