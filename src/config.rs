use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::api::currency_api::CurrencyApiClient;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Process configuration, read from the environment (and `.env`) at start-up
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub base_currency: String,
    pub target_currency: String,
    pub api_base_url: String,
    pub refresh_interval: Duration,
    pub http_timeout: Duration,
    pub chart_width: u32,
    pub chart_height: u32,
    pub chart_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset or blank variables take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let refresh_secs: u64 = parse_or(&get, "RATE_REFRESH_SECS", 30 * 60)?;
        let timeout_secs: u64 = parse_or(&get, "RATE_HTTP_TIMEOUT_SECS", 30)?;
        let chart_width: u32 = parse_or(&get, "RATE_CHART_WIDTH", 500)?;
        let chart_height: u32 = parse_or(&get, "RATE_CHART_HEIGHT", 250)?;

        for (name, value) in [
            ("RATE_REFRESH_SECS", refresh_secs),
            ("RATE_HTTP_TIMEOUT_SECS", timeout_secs),
            ("RATE_CHART_WIDTH", u64::from(chart_width)),
            ("RATE_CHART_HEIGHT", u64::from(chart_height)),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        Ok(Self {
            base_currency: get("RATE_BASE_CURRENCY").unwrap_or_else(|| "USD".to_string()),
            target_currency: get("RATE_TARGET_CURRENCY").unwrap_or_else(|| "EUR".to_string()),
            api_base_url: get("RATE_API_BASE_URL")
                .unwrap_or_else(|| CurrencyApiClient::DEFAULT_BASE_URL.to_string()),
            refresh_interval: Duration::from_secs(refresh_secs),
            http_timeout: Duration::from_secs(timeout_secs),
            chart_width,
            chart_height,
            chart_path: get("RATE_CHART_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("rate_indicator_chart.png")),
        })
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.target_currency, "EUR");
        assert_eq!(config.api_base_url, "https://cdn.jsdelivr.net");
        assert_eq!(config.refresh_interval, Duration::from_secs(1800));
        assert_eq!((config.chart_width, config.chart_height), (500, 250));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("RATE_BASE_CURRENCY", "ZAR"),
            ("RATE_TARGET_CURRENCY", "INR"),
            ("RATE_REFRESH_SECS", "60"),
            ("RATE_CHART_PATH", "/tmp/chart.png"),
        ])
        .unwrap();
        assert_eq!(config.base_currency, "ZAR");
        assert_eq!(config.target_currency, "INR");
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.chart_path, PathBuf::from("/tmp/chart.png"));
    }

    #[test]
    fn test_invalid_and_zero_numbers() {
        assert_eq!(
            config_from(&[("RATE_CHART_WIDTH", "wide")]).unwrap_err(),
            ConfigError::InvalidNumber {
                name: "RATE_CHART_WIDTH",
                value: "wide".to_string()
            }
        );
        assert_eq!(
            config_from(&[("RATE_REFRESH_SECS", "0")]).unwrap_err(),
            ConfigError::Zero("RATE_REFRESH_SECS")
        );
    }
}
