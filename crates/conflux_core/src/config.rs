//! Process configuration read from the environment.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `CONFLUX_LOG` | tracing filter directive | `info` |
//! | `CONFLUX_LOG_FORMAT` | `pretty`, `compact` or `json` | `pretty` |
//! | `CONFLUX_DEFAULT_TEMPERATURE` | temperature applied when a call sets none, `0.0..=2.0` | unset |
//! | `CONFLUX_STREAM_DELAY_MS` | delay between simulated stream chunks | `0` |
//! | `CONFLUX_MAX_STEPS` | tool-calling step limit, at least 1 | `1` |
//!
//! Empty values count as unset.

use crate::error::ConfigError;
use crate::logging::{TracingConfig, TracingFormat};
use core::str::FromStr;
use core::time::Duration;

const LOG: &str = "CONFLUX_LOG";
const LOG_FORMAT: &str = "CONFLUX_LOG_FORMAT";
const DEFAULT_TEMPERATURE: &str = "CONFLUX_DEFAULT_TEMPERATURE";
const STREAM_DELAY_MS: &str = "CONFLUX_STREAM_DELAY_MS";
const MAX_STEPS: &str = "CONFLUX_MAX_STEPS";

/// Runtime settings for a conflux process.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Tracing filter directive.
    pub log_filter: Option<String>,
    /// Tracing output format.
    pub log_format: TracingFormat,
    /// Temperature injected into calls that do not set one.
    pub default_temperature: Option<f32>,
    /// Delay between simulated stream chunks.
    pub stream_delay: Duration,
    /// Step limit for tool-calling generations.
    pub max_steps: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_filter: None,
            log_format: TracingFormat::Pretty,
            default_temperature: None,
            stream_delay: Duration::ZERO,
            max_steps: 1,
        }
    }
}

impl RuntimeConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first malformed value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first malformed value.
    ///
    /// ```
    /// use conflux_core::{RuntimeConfig, TracingFormat};
    ///
    /// let config = RuntimeConfig::from_lookup(|key| match key {
    ///     "CONFLUX_LOG_FORMAT" => Some("json".to_string()),
    ///     "CONFLUX_MAX_STEPS" => Some("4".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.log_format, TracingFormat::Json);
    /// assert_eq!(config.max_steps, 4);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let log_format = match get(LOG_FORMAT) {
            Some(format) => format.parse()?,
            None => defaults.log_format,
        };

        let default_temperature = match get(DEFAULT_TEMPERATURE) {
            Some(raw) => {
                let temperature: f32 = parse(DEFAULT_TEMPERATURE, &raw)?;
                if !(0.0..=2.0).contains(&temperature) {
                    return Err(ConfigError::invalid(
                        DEFAULT_TEMPERATURE,
                        raw,
                        "expected a value between 0.0 and 2.0",
                    ));
                }
                Some(temperature)
            }
            None => defaults.default_temperature,
        };

        let stream_delay = match get(STREAM_DELAY_MS) {
            Some(raw) => Duration::from_millis(parse(STREAM_DELAY_MS, &raw)?),
            None => defaults.stream_delay,
        };

        let max_steps = match get(MAX_STEPS) {
            Some(raw) => match parse::<usize>(MAX_STEPS, &raw)? {
                0 => return Err(ConfigError::invalid(MAX_STEPS, raw, "must be at least 1")),
                steps => steps,
            },
            None => defaults.max_steps,
        };

        let config = Self {
            log_filter: get(LOG),
            log_format,
            default_temperature,
            stream_delay,
            max_steps,
        };
        tracing::debug!(?config, "runtime configuration loaded");
        Ok(config)
    }

    /// Tracing configuration matching these settings.
    #[must_use]
    pub fn tracing(&self) -> TracingConfig {
        let config = TracingConfig::new().with_format(self.log_format);
        match &self.log_filter {
            Some(filter) => config.with_env_filter(filter.clone()),
            None => config,
        }
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err: T::Err| ConfigError::invalid(key, raw, err.to_string()))
}
