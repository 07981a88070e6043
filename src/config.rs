// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::defaults;
use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace to watch; `None` watches secrets in every namespace
    pub watch_namespace: Option<String>,
    /// Interval between full resync passes
    pub resync_interval: Duration,
    pub retry: RetryConfig,
}

/// Backoff settings for mirror writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(defaults::RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(defaults::RETRY_MAX_DELAY_MS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            resync_interval: Duration::from_secs(defaults::RESYNC_INTERVAL_SECS),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());

        let resync_secs: u64 =
            parse_or(&lookup, "RESYNC_INTERVAL_SECS", defaults::RESYNC_INTERVAL_SECS)?;
        let max_attempts: u32 = parse_or(&lookup, "SYNC_MAX_ATTEMPTS", defaults::MAX_ATTEMPTS)?;
        let base_delay_ms: u64 =
            parse_or(&lookup, "SYNC_RETRY_BASE_DELAY_MS", defaults::RETRY_BASE_DELAY_MS)?;
        let max_delay_ms: u64 =
            parse_or(&lookup, "SYNC_RETRY_MAX_DELAY_MS", defaults::RETRY_MAX_DELAY_MS)?;

        if resync_secs == 0 {
            bail!("RESYNC_INTERVAL_SECS must be greater than zero");
        }
        if max_attempts == 0 {
            bail!("SYNC_MAX_ATTEMPTS must be greater than zero");
        }
        if max_delay_ms < base_delay_ms {
            bail!("SYNC_RETRY_MAX_DELAY_MS must not be smaller than SYNC_RETRY_BASE_DELAY_MS");
        }

        Ok(Config {
            watch_namespace,
            resync_interval: Duration::from_secs(resync_secs),
            retry: RetryConfig {
                max_attempts,
                base_delay: Duration::from_millis(base_delay_ms),
                max_delay: Duration::from_millis(max_delay_ms),
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.watch_namespace, None);
        assert_eq!(config.resync_interval, Duration::from_secs(300));
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn test_values_from_environment() {
        let config = Config::from_lookup(lookup_from(&[
            ("WATCH_NAMESPACE", "apps"),
            ("RESYNC_INTERVAL_SECS", "60"),
            ("SYNC_MAX_ATTEMPTS", "3"),
            ("SYNC_RETRY_BASE_DELAY_MS", "50"),
            ("SYNC_RETRY_MAX_DELAY_MS", "400"),
        ]))
        .unwrap();

        assert_eq!(config.watch_namespace.as_deref(), Some("apps"));
        assert_eq!(config.resync_interval, Duration::from_secs(60));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(50));
        assert_eq!(config.retry.max_delay, Duration::from_millis(400));
    }

    #[test]
    fn test_empty_namespace_means_cluster_wide() {
        let config = Config::from_lookup(lookup_from(&[("WATCH_NAMESPACE", "  ")])).unwrap();
        assert_eq!(config.watch_namespace, None);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err =
            Config::from_lookup(lookup_from(&[("RESYNC_INTERVAL_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("RESYNC_INTERVAL_SECS"));
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("SYNC_MAX_ATTEMPTS", "0")])).is_err());
    }

    #[test]
    fn test_max_delay_below_base_is_rejected() {
        assert!(Config::from_lookup(lookup_from(&[
            ("SYNC_RETRY_BASE_DELAY_MS", "500"),
            ("SYNC_RETRY_MAX_DELAY_MS", "100"),
        ]))
        .is_err());
    }
}
