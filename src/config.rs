//! Runtime configuration
//!
//! Read once from the environment at startup.

use std::time::Duration;

use thiserror::Error;

use crate::history::Goals;
use crate::tools::history::DEFAULT_HISTORY_LIMIT;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    /// IANA name; falls back to `TZ`, then UTC
    pub timezone: Option<String>,
    pub history_limit: u32,
    pub request_timeout: Duration,
    pub goals: Goals,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = get("DIETLENS_API_URL").ok_or(ConfigError::Missing("DIETLENS_API_URL"))?;
        let defaults = Goals::default();

        Ok(Self {
            api_url,
            api_token: get("DIETLENS_API_TOKEN"),
            timezone: get("DIETLENS_TIMEZONE"),
            history_limit: parse_or("DIETLENS_HISTORY_LIMIT", get("DIETLENS_HISTORY_LIMIT"), DEFAULT_HISTORY_LIMIT)?,
            request_timeout: Duration::from_secs(parse_or(
                "DIETLENS_REQUEST_TIMEOUT_SECS",
                get("DIETLENS_REQUEST_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?),
            goals: Goals {
                calories: parse_goal("DIETLENS_CALORIE_GOAL", get("DIETLENS_CALORIE_GOAL"), defaults.calories)?,
                protein: parse_goal("DIETLENS_PROTEIN_GOAL", get("DIETLENS_PROTEIN_GOAL"), defaults.protein)?,
                carbohydrates: parse_goal("DIETLENS_CARB_GOAL", get("DIETLENS_CARB_GOAL"), defaults.carbohydrates)?,
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Goals must be positive, or every adherence figure is meaningless
fn parse_goal(name: &'static str, raw: Option<String>, default: f64) -> Result<f64, ConfigError> {
    let goal: f64 = parse_or(name, raw, default)?;
    if goal.is_finite() && goal > 0.0 {
        Ok(goal)
    } else {
        Err(ConfigError::Invalid { name, value: goal.to_string() })
    }
}
