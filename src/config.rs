//! Engine configuration from the environment

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::insight::CircuitBreakerConfig;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://lift-progression.db?mode=rwc";

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value}")]
  Invalid { key: String, value: String },
}

/// ---------------------------------------------------------------------------
/// Engine Config
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineConfig {
  pub database_url: String,
  /// Remote analysis service; local analysis only when unset
  pub remote_url: Option<Url>,
  pub remote_timeout: Duration,
  pub breaker_failures: u32,
  pub breaker_recovery: Duration,
  pub lookback_days: u32,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      database_url: DEFAULT_DATABASE_URL.to_string(),
      remote_url: None,
      remote_timeout: Duration::from_secs(10),
      breaker_failures: 3,
      breaker_recovery: Duration::from_secs(30),
      lookback_days: 30,
    }
  }
}

impl EngineConfig {
  /// Read `PROGRESSION_*` variables; unset ones keep their defaults
  pub fn from_env() -> Result<Self, ConfigError> {
    let defaults = Self::default();

    let remote_url = match non_empty("PROGRESSION_REMOTE_URL") {
      Some(raw) => Some(Url::parse(&raw).map_err(|_| ConfigError::Invalid {
        key: "PROGRESSION_REMOTE_URL".into(),
        value: raw,
      })?),
      None => None,
    };

    Ok(Self {
      database_url: non_empty("PROGRESSION_DATABASE_URL").unwrap_or(defaults.database_url),
      remote_url,
      remote_timeout: Duration::from_secs(parsed_or("PROGRESSION_REMOTE_TIMEOUT_SECS", defaults.remote_timeout.as_secs())?),
      breaker_failures: parsed_or("PROGRESSION_BREAKER_FAILURES", defaults.breaker_failures)?,
      breaker_recovery: Duration::from_secs(parsed_or("PROGRESSION_BREAKER_RECOVERY_SECS", defaults.breaker_recovery.as_secs())?),
      lookback_days: parsed_or("PROGRESSION_LOOKBACK_DAYS", defaults.lookback_days)?,
    })
  }

  pub fn breaker_config(&self) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
      failure_threshold: self.breaker_failures,
      recovery_timeout: self.breaker_recovery,
      ..CircuitBreakerConfig::default()
    }
  }
}

fn non_empty(key: &str) -> Option<String> {
  env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
  match non_empty(key) {
    Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
      key: key.to_string(),
      value: raw,
    }),
    None => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const KEYS: [&str; 6] = [
    "PROGRESSION_DATABASE_URL",
    "PROGRESSION_REMOTE_URL",
    "PROGRESSION_REMOTE_TIMEOUT_SECS",
    "PROGRESSION_BREAKER_FAILURES",
    "PROGRESSION_BREAKER_RECOVERY_SECS",
    "PROGRESSION_LOOKBACK_DAYS",
  ];

  /// Every key, unset unless overridden
  fn vars(overrides: &[(&'static str, &'static str)]) -> Vec<(&'static str, Option<&'static str>)> {
    KEYS
      .iter()
      .map(|k| (*k, overrides.iter().find(|(key, _)| key == k).map(|(_, v)| *v)))
      .collect()
  }

  #[test]
  #[serial]
  fn test_defaults_when_unset() {
    temp_env::with_vars(vars(&[]), || {
      let config = EngineConfig::from_env().unwrap();

      assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
      assert!(config.remote_url.is_none());
      assert_eq!(config.remote_timeout, Duration::from_secs(10));
      assert_eq!(config.breaker_failures, 3);
      assert_eq!(config.lookback_days, 30);
    });
  }

  #[test]
  #[serial]
  fn test_reads_overrides() {
    let vars = vars(&[
      ("PROGRESSION_REMOTE_URL", "http://localhost:8787"),
      ("PROGRESSION_BREAKER_FAILURES", "5"),
      ("PROGRESSION_LOOKBACK_DAYS", " 60 "),
    ]);

    temp_env::with_vars(vars, || {
      let config = EngineConfig::from_env().unwrap();

      assert_eq!(config.remote_url.as_ref().map(Url::as_str), Some("http://localhost:8787/"));
      assert_eq!(config.breaker_config().failure_threshold, 5);
      assert_eq!(config.breaker_config().success_threshold, 1);
      assert_eq!(config.lookback_days, 60);
    });
  }

  #[test]
  #[serial]
  fn test_rejects_bad_numbers() {
    temp_env::with_vars(vars(&[("PROGRESSION_REMOTE_TIMEOUT_SECS", "soon")]), || {
      match EngineConfig::from_env() {
        Err(ConfigError::Invalid { key, value }) => {
          assert_eq!(key, "PROGRESSION_REMOTE_TIMEOUT_SECS");
          assert_eq!(value, "soon");
        }
        other => panic!("expected invalid config, got {:?}", other),
      }
    });
  }

  #[test]
  #[serial]
  fn test_rejects_bad_url() {
    temp_env::with_vars(vars(&[("PROGRESSION_REMOTE_URL", "not a url")]), || {
      assert!(matches!(EngineConfig::from_env(), Err(ConfigError::Invalid { .. })));
    });
  }
}
