//! Tracker configuration
//!
//! Defaults suit tests and embedding. Deployments overlay environment
//! variables with [`TrackerConfig::from_env`] or load a JSON document with
//! [`TrackerConfig::from_json`].
//!
//! | Variable | Field |
//! |---|---|
//! | `EDITH_EXPORT_TTL_HOURS` | `export_ttl_hours` |
//! | `EDITH_PAGE_SIZE` | `default_page_size` |
//! | `EDITH_MAX_PAGE_SIZE` | `max_page_size` |
//! | `EDITH_LOG` / `RUST_LOG` | `log.level` |
//! | `EDITH_LOG_FORMAT` | `log.format` |

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::store::Pagination;
use crate::{Error, Result};

/// Default lifetime of an export job before it expires.
pub const DEFAULT_EXPORT_TTL_HOURS: u32 = 24 * 7;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Compact,
    /// Multi-line human readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging settings consumed by [`crate::logging::init`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `edith_tracker=debug`.
    pub level: String,
    /// Line format.
    pub format: LogFormat,
    /// Emit span enter/close events.
    pub span_events: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            span_events: false,
        }
    }
}

/// Settings for the execution tracker services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Hours an export job may stay unfinished before it expires.
    pub export_ttl_hours: u32,
    /// Page size used when a listing request does not give one.
    pub default_page_size: u32,
    /// Upper bound for any requested page size.
    pub max_page_size: u32,
    /// Logging settings.
    pub log: LogConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            export_ttl_hours: DEFAULT_EXPORT_TTL_HOURS,
            default_page_size: 20,
            max_page_size: 100,
            log: LogConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Defaults overlaid with `EDITH_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Validation` naming the variable if a value does not parse or
    /// the result is inconsistent.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse a JSON document; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the document is malformed or inconsistent.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::invalid("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Development preset: verbose pretty logs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            log: LogConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                span_events: true,
            },
            ..Self::default()
        }
    }

    /// Production preset: JSON logs at info level.
    #[must_use]
    pub fn production() -> Self {
        Self {
            log: LogConfig {
                level: "info".to_string(),
                format: LogFormat::Json,
                span_events: false,
            },
            ..Self::default()
        }
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero TTL, a zero page size, or a default
    /// page size above the maximum.
    pub fn validate(&self) -> Result<()> {
        if self.export_ttl_hours == 0 {
            return Err(Error::invalid("export_ttl_hours", "must be positive"));
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(Error::invalid("page_size", "must be positive"));
        }
        if self.default_page_size > self.max_page_size {
            return Err(Error::invalid(
                "default_page_size",
                format!("exceeds max_page_size ({})", self.max_page_size),
            ));
        }
        Ok(())
    }

    /// Export lifetime as a duration.
    #[must_use]
    pub fn export_ttl(&self) -> Duration {
        Duration::hours(i64::from(self.export_ttl_hours))
    }

    /// Turn an optional caller page request into a bounded one.
    #[must_use]
    pub fn paginate(&self, page: Option<u32>, limit: Option<u32>) -> Pagination {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size);
        Pagination::new(page.unwrap_or(1), limit)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(hours) = parse_var(&lookup, "EDITH_EXPORT_TTL_HOURS")? {
            config.export_ttl_hours = hours;
        }
        if let Some(size) = parse_var(&lookup, "EDITH_PAGE_SIZE")? {
            config.default_page_size = size;
        }
        if let Some(size) = parse_var(&lookup, "EDITH_MAX_PAGE_SIZE")? {
            config.max_page_size = size;
        }

        if let Some(level) = lookup("EDITH_LOG").or_else(|| lookup("RUST_LOG")) {
            config.log.level = level;
        }
        if let Some(format) = lookup("EDITH_LOG_FORMAT") {
            config.log.format = match format.to_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                other => {
                    return Err(Error::invalid(
                        "EDITH_LOG_FORMAT",
                        format!("'{other}' is not one of compact, pretty, json"),
                    ))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u32>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u32>()
                .map_err(|e| Error::invalid(key, format!("'{raw}': {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.export_ttl(), Duration::days(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overlay() {
        let config = TrackerConfig::from_lookup(lookup(&[
            ("EDITH_EXPORT_TTL_HOURS", "48"),
            ("EDITH_PAGE_SIZE", "10"),
            ("RUST_LOG", "warn"),
            ("EDITH_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.export_ttl_hours, 48);
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_edith_log_wins_over_rust_log() {
        let config =
            TrackerConfig::from_lookup(lookup(&[("EDITH_LOG", "debug"), ("RUST_LOG", "warn")]))
                .unwrap();
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_bad_env_value_names_variable() {
        let err = TrackerConfig::from_lookup(lookup(&[("EDITH_PAGE_SIZE", "ten")])).unwrap_err();
        assert!(err.to_string().contains("EDITH_PAGE_SIZE"));

        let err = TrackerConfig::from_lookup(lookup(&[("EDITH_PAGE_SIZE", "500")])).unwrap_err();
        assert!(err.to_string().contains("default_page_size"));
    }

    #[test]
    fn test_from_json_partial() {
        let config = TrackerConfig::from_json(r#"{"max_page_size": 50}"#).unwrap();
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.default_page_size, 20);
        assert!(TrackerConfig::from_json(r#"{"export_ttl_hours": 0}"#).is_err());
    }

    #[test]
    fn test_paginate_clamps() {
        let config = TrackerConfig::default();
        assert_eq!(config.paginate(None, None), Pagination::new(1, 20));
        assert_eq!(config.paginate(Some(2), Some(1000)), Pagination::new(2, 100));
        assert_eq!(config.paginate(Some(0), Some(0)), Pagination::new(1, 20));
    }
}
