use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::pipeline::ingestion::retry::RetryPolicy;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const API_KEY_ENV: &str = "RIOT_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Pacing and retry constants for the match API client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Minimum gap between two request issuances, shared by every worker
    pub min_interval_ms: u64,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
    /// Ceiling on a server `Retry-After` hint
    pub max_retry_after_ms: u64,
    pub timeout_seconds: u64,
    /// Overrides `https://{region}.api.riotgames.com`
    pub api_base_url: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1250,
            base_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 60_000,
            max_attempts: 6,
            max_retry_after_ms: 900_000,
            timeout_seconds: 20,
            api_base_url: None,
        }
    }
}

impl FetchConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            self.backoff_multiplier,
            Duration::from_millis(self.max_delay_ms),
        )
        .with_max_hint(Duration::from_millis(self.max_retry_after_ms))
    }
}

impl Config {
    /// Load from an explicit path, else `config.toml` if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| PipelineError::Configuration(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let f = &self.fetch;
        if f.max_attempts == 0 {
            return Err(PipelineError::Configuration("fetch.max_attempts must be >= 1".into()));
        }
        if !f.backoff_multiplier.is_finite() || f.backoff_multiplier < 1.0 {
            return Err(PipelineError::Configuration(
                "fetch.backoff_multiplier must be a finite number >= 1.0".into(),
            ));
        }
        if f.max_delay_ms < f.base_delay_ms {
            return Err(PipelineError::Configuration(
                "fetch.max_delay_ms must be >= fetch.base_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

/// Read the API credential; absence is fatal before any work is scheduled.
pub fn api_key_from_env() -> Result<String> {
    api_key_from(std::env::var(API_KEY_ENV).ok().as_deref())
}

fn api_key_from(raw: Option<&str>) -> Result<String> {
    match raw.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(PipelineError::Configuration(format!("{} is not set", API_KEY_ENV))),
    }
}
