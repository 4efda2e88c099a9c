use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_NUTRITION_API_URL: &str = "https://api.api-ninjas.com/v1/nutrition";
const DEFAULT_NUTRITION_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("{0} must be set (or NUTRITION_FIXTURE_PATH for offline lookups)")]
    Missing(&'static str),

    #[error("{key} has an invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

/// Where dish nutrition data comes from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NutritionSource {
    Api {
        url: String,
        api_key: String,
        timeout: Duration,
    },
    Fixture(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AppConfig {
    pub host: String,
    pub port: u16,
    pub nutrition: NutritionSource,
}

impl AppConfig {
    /// Reads the process environment; call `dotenv` first to pick up `.env`.
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = var("MEALS_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&var, "MEALS_PORT", DEFAULT_PORT)?;

        let nutrition = match var("NUTRITION_FIXTURE_PATH") {
            Some(path) => NutritionSource::Fixture(PathBuf::from(path)),
            None => NutritionSource::Api {
                url: var("NUTRITION_API_URL").unwrap_or_else(|| DEFAULT_NUTRITION_API_URL.to_string()),
                api_key: var("NUTRITION_API_KEY").ok_or(ConfigError::Missing("NUTRITION_API_KEY"))?,
                timeout: Duration::from_secs(parse_or(
                    &var,
                    "NUTRITION_TIMEOUT_SECS",
                    DEFAULT_NUTRITION_TIMEOUT_SECS,
                )?),
            },
        };

        Ok(AppConfig { host, port, nutrition })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
