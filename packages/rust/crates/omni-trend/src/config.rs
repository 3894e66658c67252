//! Runtime configuration for trend stores and delta definitions.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TrendError, TrendResult};

/// Environment variable holding the Valkey URL.
pub const TREND_VALKEY_URL_ENV: &str = "VALKEY_URL";
/// Environment variable overriding the key prefix.
pub const TREND_VALKEY_KEY_PREFIX_ENV: &str = "OMNI_TREND_VALKEY_KEY_PREFIX";
/// Key prefix used when none is configured.
pub const DEFAULT_TREND_KEY_PREFIX: &str = "omni-trend";

/// Resolved connection settings for [`crate::ValkeyTrendStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendRuntimeConfig {
    /// Valkey connection URL.
    pub valkey_url: String,
    /// Prefix namespacing every store key.
    pub key_prefix: String,
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl TrendRuntimeConfig {
    /// Resolve from `VALKEY_URL` / `OMNI_TREND_VALKEY_KEY_PREFIX`.
    ///
    /// Returns `None` when no Valkey URL is configured.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let valkey_url = non_empty_env(TREND_VALKEY_URL_ENV)?;
        let key_prefix = non_empty_env(TREND_VALKEY_KEY_PREFIX_ENV);
        Some(Self::from_parts(&valkey_url, key_prefix.as_deref()))
    }

    /// Build from explicit parts; blank prefixes fall back to the default.
    #[must_use]
    pub fn from_parts(valkey_url: &str, key_prefix: Option<&str>) -> Self {
        let key_prefix = key_prefix
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_TREND_KEY_PREFIX)
            .to_string();
        Self {
            valkey_url: valkey_url.trim().to_string(),
            key_prefix,
        }
    }
}

/// Declarative description of a delta, loadable from YAML or JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeltaSpec {
    /// Delta name (primary set key).
    pub name: String,
    /// Mean observation lifetime in seconds.
    pub lifetime_secs: i64,
    /// Anchor the delta one lifetime in the past to admit backdated observations.
    #[serde(default)]
    pub replay: bool,
    /// Explicit decay anchor (epoch seconds). Ignored when `replay` is set.
    #[serde(default)]
    pub anchor_unix: Option<i64>,
}

impl DeltaSpec {
    /// Lifetime as a duration. Range is checked, sign is left to delta creation.
    pub fn lifetime(&self) -> TrendResult<TimeDelta> {
        TimeDelta::try_seconds(self.lifetime_secs).ok_or_else(|| {
            TrendError::Validation(format!(
                "lifetime_secs {} out of range for delta '{}'",
                self.lifetime_secs, self.name
            ))
        })
    }

    /// Explicit anchor, if configured.
    pub fn anchor(&self) -> TrendResult<Option<DateTime<Utc>>> {
        self.anchor_unix
            .map(|secs| {
                DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
                    TrendError::Validation(format!(
                        "anchor_unix {secs} out of range for delta '{}'",
                        self.name
                    ))
                })
            })
            .transpose()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeltaSpecFile {
    #[serde(default)]
    deltas: Vec<DeltaSpec>,
}

/// Parse a `deltas:` list from YAML.
///
/// ```yaml
/// deltas:
///   - name: favorites
///     lifetime_secs: 604800
///     replay: true
/// ```
pub fn parse_delta_specs_yaml(raw: &str) -> TrendResult<Vec<DeltaSpec>> {
    let parsed: DeltaSpecFile = serde_yaml::from_str(raw)
        .map_err(|err| TrendError::Config(format!("invalid delta spec yaml: {err}")))?;
    Ok(parsed.deltas)
}
