use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use failsafe::backoff::EqualJittered;
use failsafe::failure_policy::{ConsecutiveFailures, OrElse, SuccessRateOverTimeWindow};
use failsafe::futures::CircuitBreaker;
use failsafe::{Config, StateMachine};
use serde::Deserialize;
use thiserror::Error;

use crate::config::NutritionSource;
use crate::models::NutritionFacts;

type CircuitBreakerType = StateMachine<
    OrElse<SuccessRateOverTimeWindow<EqualJittered>, ConsecutiveFailures<EqualJittered>>,
    (),
>;

#[derive(Debug, Error)]
pub(crate) enum LookupError {
    #[error("nutrition service is not responding, call rejected")]
    Rejected,

    #[error("nutrition service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cannot read nutrition fixture {path}: {source}")]
    FixtureIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse nutrition fixture {path}: {source}")]
    FixtureFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Resolves a food name to its nutrition facts.
///
/// `Ok(None)` means the name is not a food the source knows about; `Err`
/// is reserved for the source itself failing.
#[async_trait]
pub(crate) trait NutritionLookup: Send + Sync {
    async fn lookup(&self, food: &str) -> Result<Option<NutritionFacts>, LookupError>;
}

pub(crate) fn connect(source: &NutritionSource) -> Result<Arc<dyn NutritionLookup>, LookupError> {
    match source {
        NutritionSource::Api {
            url,
            api_key,
            timeout,
        } => {
            log::info!("looking up nutrition data at {}", url);
            Ok(Arc::new(NinjasClient::new(url, api_key, *timeout)?))
        }
        NutritionSource::Fixture(path) => {
            let fixture = FixtureNutrition::from_path(path)?;
            log::info!("serving nutrition data for {} foods from {}", fixture.foods.len(), path.display());
            Ok(Arc::new(fixture))
        }
    }
}

//api-ninjas answers with one item per food it recognised in the query
#[derive(Debug, Default, Deserialize)]
struct NinjasItem {
    #[serde(default)]
    calories: f64,
    #[serde(default)]
    serving_size_g: f64,
    #[serde(default)]
    sodium_mg: f64,
    #[serde(default)]
    sugar_g: f64,
}

impl From<&NinjasItem> for NutritionFacts {
    fn from(item: &NinjasItem) -> Self {
        NutritionFacts {
            cal: item.calories,
            size: item.serving_size_g,
            sodium: item.sodium_mg,
            sugar: item.sugar_g,
        }
    }
}

fn combine(items: &[NinjasItem]) -> Option<NutritionFacts> {
    if items.is_empty() {
        return None;
    }
    Some(
        items
            .iter()
            .fold(NutritionFacts::default(), |acc, item| acc + NutritionFacts::from(item)),
    )
}

pub(crate) struct NinjasClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    circuit_breaker: CircuitBreakerType,
}

impl NinjasClient {
    pub(crate) fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(NinjasClient {
            http,
            url: url.to_string(),
            api_key: api_key.to_string(),
            circuit_breaker: Config::new().build(),
        })
    }

    async fn fetch(&self, food: &str) -> Result<Vec<NinjasItem>, reqwest::Error> {
        self.http
            .get(&self.url)
            .query(&[("query", food)])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl NutritionLookup for NinjasClient {
    async fn lookup(&self, food: &str) -> Result<Option<NutritionFacts>, LookupError> {
        match self.circuit_breaker.call(self.fetch(food)).await {
            Ok(items) => Ok(combine(&items)),
            Err(failsafe::Error::Rejected) => {
                //upstream kept failing, don't wait on it again until the breaker closes
                log::error!("nutrition lookup for `{}` rejected by circuit breaker", food);
                Err(LookupError::Rejected)
            }
            Err(failsafe::Error::Inner(e)) => {
                log::warn!("nutrition lookup for `{}` failed: {}", food, e);
                Err(LookupError::Http(e))
            }
        }
    }
}

/// Fixed food table, read from a JSON object of name -> facts.
#[derive(Debug, Default)]
pub(crate) struct FixtureNutrition {
    foods: HashMap<String, NutritionFacts>,
}

impl FixtureNutrition {
    pub(crate) fn from_path(path: &Path) -> Result<Self, LookupError> {
        let raw = std::fs::read(path).map_err(|source| LookupError::FixtureIo {
            path: path.to_path_buf(),
            source,
        })?;
        let foods = serde_json::from_slice(&raw).map_err(|source| LookupError::FixtureFormat {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(FixtureNutrition { foods })
    }
}

impl<S: Into<String>> FromIterator<(S, NutritionFacts)> for FixtureNutrition {
    fn from_iter<I: IntoIterator<Item = (S, NutritionFacts)>>(iter: I) -> Self {
        FixtureNutrition {
            foods: iter.into_iter().map(|(name, facts)| (name.into(), facts)).collect(),
        }
    }
}

#[async_trait]
impl NutritionLookup for FixtureNutrition {
    async fn lookup(&self, food: &str) -> Result<Option<NutritionFacts>, LookupError> {
        Ok(self.foods.get(food).copied())
    }
}

/// Foods used across the test suites: orange + spaghetti + apple pie add up
/// to a meal between 400 and 500 calories.
#[cfg(test)]
pub(crate) fn sample_foods() -> FixtureNutrition {
    let facts = |cal, sodium, sugar| NutritionFacts {
        cal,
        size: 100.0,
        sodium,
        sugar,
    };
    [
        ("orange", facts(49.2, 1.0, 8.6)),
        ("spaghetti", facts(157.1, 1.0, 0.6)),
        ("apple pie", facts(265.3, 210.6, 15.7)),
        ("pasta", facts(500.0, 12.0, 1.0)),
        ("salad", facts(28.2, 78.2, 6.0)),
    ]
    .into_iter()
    .collect()
}
