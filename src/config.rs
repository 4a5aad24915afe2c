//! Configuration management for the courier batch delivery tool.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use courier_delivery::SchedulerConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "courier.toml";
const ENV_PREFIX: &str = "COURIER_";

/// Run configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables prefixed `COURIER_` (highest priority)
/// 2. Configuration file (`courier.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Delays are given in seconds and may be fractional.
///
/// # Example
///
/// ```toml
/// input_path = "hooks.csv"
/// max_delay_time = 120.0
/// exponential_backoff_factor = 3.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Delimited file listing the notifications to deliver.
    ///
    /// Environment variable: `COURIER_INPUT_PATH`
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,

    /// Ceiling on the delay between attempts, in seconds.
    ///
    /// Environment variable: `COURIER_MAX_DELAY_TIME`
    #[serde(default = "default_max_delay_time")]
    pub max_delay_time: f64,

    /// Delay before the first retry, in seconds.
    ///
    /// Environment variable: `COURIER_INITIAL_DELAY_TIME`
    #[serde(default = "default_initial_delay_time")]
    pub initial_delay_time: f64,

    /// Growth of the delay per failed attempt.
    ///
    /// Environment variable: `COURIER_EXPONENTIAL_BACKOFF_FACTOR`
    #[serde(default = "default_backoff_factor")]
    pub exponential_backoff_factor: f64,

    /// Abandoned chains tolerated per destination.
    ///
    /// Environment variable: `COURIER_MAX_URL_FAILURE`
    #[serde(default = "default_max_url_failure")]
    pub max_url_failure: u32,

    /// Per-attempt response timeout, in seconds.
    ///
    /// Environment variable: `COURIER_RESPONSE_TIMEOUT`
    #[serde(default = "default_response_timeout")]
    pub response_timeout: f64,
}

impl Config {
    /// Load configuration from defaults, `courier.toml`, and `COURIER_`
    /// environment variables.
    pub fn load() -> Result<Self> {
        let config: Self = Self::figment().extract().context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Convert to the scheduler's configuration.
    pub fn to_scheduler_config(&self) -> Result<SchedulerConfig> {
        Ok(SchedulerConfig {
            max_delay_time: seconds("max_delay_time", self.max_delay_time)?,
            initial_delay_time: seconds("initial_delay_time", self.initial_delay_time)?,
            exponential_backoff_factor: self.exponential_backoff_factor,
            max_url_failure: self.max_url_failure,
            response_timeout: seconds("response_timeout", self.response_timeout)?,
        })
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_delay_time", self.max_delay_time),
            ("initial_delay_time", self.initial_delay_time),
            ("response_timeout", self.response_timeout),
        ] {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("{name} must be a finite, non-negative number of seconds");
            }
        }

        if self.initial_delay_time == 0.0 {
            anyhow::bail!("initial_delay_time must be greater than 0");
        }

        if self.response_timeout == 0.0 {
            anyhow::bail!("response_timeout must be greater than 0");
        }

        if !self.exponential_backoff_factor.is_finite() || self.exponential_backoff_factor <= 1.0 {
            anyhow::bail!("exponential_backoff_factor must be greater than 1");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            max_delay_time: default_max_delay_time(),
            initial_delay_time: default_initial_delay_time(),
            exponential_backoff_factor: default_backoff_factor(),
            max_url_failure: default_max_url_failure(),
            response_timeout: default_response_timeout(),
        }
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("{name} is out of range"))
}

fn default_input_path() -> PathBuf {
    PathBuf::from("webhooks.txt")
}

fn default_max_delay_time() -> f64 {
    courier_delivery::DEFAULT_MAX_DELAY_TIME.as_secs_f64()
}

fn default_initial_delay_time() -> f64 {
    courier_delivery::DEFAULT_INITIAL_DELAY_TIME.as_secs_f64()
}

fn default_backoff_factor() -> f64 {
    courier_delivery::DEFAULT_BACKOFF_FACTOR
}

fn default_max_url_failure() -> u32 {
    courier_delivery::DEFAULT_MAX_URL_FAILURE
}

fn default_response_timeout() -> f64 {
    courier_delivery::DEFAULT_RESPONSE_TIMEOUT.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_match_scheduler_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load().map_err(|e| e.to_string())?;

            assert_eq!(config.input_path, PathBuf::from("webhooks.txt"));
            assert_eq!(
                config.to_scheduler_config().map_err(|e| e.to_string())?,
                SchedulerConfig::default()
            );
            Ok(())
        });
    }

    #[test]
    fn file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                input_path = "hooks.csv"
                max_delay_time = 0.05
                initial_delay_time = 0.01
                exponential_backoff_factor = 3.0
                "#,
            )?;

            let config = Config::load().map_err(|e| e.to_string())?;
            let scheduler = config.to_scheduler_config().map_err(|e| e.to_string())?;

            assert_eq!(config.input_path, PathBuf::from("hooks.csv"));
            assert_eq!(scheduler.max_delay_time, Duration::from_millis(50));
            assert_eq!(scheduler.initial_delay_time, Duration::from_millis(10));
            assert_eq!(scheduler.max_url_failure, 5);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "max_url_failure = 3\nresponse_timeout = 5.0")?;
            jail.set_env("COURIER_MAX_URL_FAILURE", "1");

            let config = Config::load().map_err(|e| e.to_string())?;

            assert_eq!(config.max_url_failure, 1);
            assert!((config.response_timeout - 5.0).abs() < f64::EPSILON);
            Ok(())
        });
    }

    #[test]
    fn invalid_values_rejected() {
        Jail::expect_with(|jail| {
            for (key, value) in [
                ("COURIER_EXPONENTIAL_BACKOFF_FACTOR", "1.0"),
                ("COURIER_INITIAL_DELAY_TIME", "0"),
                ("COURIER_MAX_DELAY_TIME", "-1"),
                ("COURIER_RESPONSE_TIMEOUT", "0"),
            ] {
                jail.clear_env();
                jail.set_env(key, value);
                assert!(Config::load().is_err(), "{key}={value} should be rejected");
            }
            Ok(())
        });
    }
}
