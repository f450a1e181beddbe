//! # Configuration Module
//!
//! Dispatch settings, loaded from environment variables or a YAML document.
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `BRRTMVC_PATH_STRATEGY` | `path_strategy` (`parsed` / `template`) | `parsed` |
//! | `BRRTMVC_TRAILING_SLASH` | `trailing_slash_match` | `false` |
//! | `BRRTMVC_RESOLVER_CACHE` | `resolver_cache` | `true` |
//! | `BRRTMVC_SLOW_LOOKUP_US` | `slow_lookup_threshold_us` (`0` disables) | `1000` |
//!
//! Unparseable values are logged and replaced by the default.
//!
//! ## YAML
//!
//! ```yaml
//! path_strategy: template
//! trailing_slash_match: true
//! slow_lookup_threshold_us: 250
//! ```
//!
//! Missing keys take their defaults.

use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::warn;

use crate::condition::PathStrategy;

const DEFAULT_SLOW_LOOKUP_US: u64 = 1_000;

/// Settings that shape matching and dispatching.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Path representation used by every descriptor of a registry
    pub path_strategy: PathStrategy,
    /// Also match `/items/` for a `/items` pattern
    pub trailing_slash_match: bool,
    /// Remember the winning argument resolver per parameter
    pub resolver_cache: bool,
    /// Lookups slower than this are logged at `warn!`; `0` disables
    pub slow_lookup_threshold_us: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            path_strategy: PathStrategy::Parsed,
            trailing_slash_match: false,
            resolver_cache: true,
            slow_lookup_threshold_us: DEFAULT_SLOW_LOOKUP_US,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Returns the `serde_yaml` error for malformed documents or unknown
    /// strategy names.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    /// The slow-lookup threshold, `None` when disabled.
    #[must_use]
    pub fn slow_lookup_threshold(&self) -> Option<Duration> {
        (self.slow_lookup_threshold_us > 0).then(|| Duration::from_micros(self.slow_lookup_threshold_us))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let path_strategy = match lookup("BRRTMVC_PATH_STRATEGY") {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "parsed" => PathStrategy::Parsed,
                "template" => PathStrategy::Template,
                other => {
                    warn!(variable = "BRRTMVC_PATH_STRATEGY", value = %other, "Unknown path strategy, using default");
                    defaults.path_strategy
                }
            },
            None => defaults.path_strategy,
        };
        Self {
            path_strategy,
            trailing_slash_match: lookup("BRRTMVC_TRAILING_SLASH")
                .map_or(defaults.trailing_slash_match, |v| {
                    parse_flag("BRRTMVC_TRAILING_SLASH", &v, defaults.trailing_slash_match)
                }),
            resolver_cache: lookup("BRRTMVC_RESOLVER_CACHE").map_or(defaults.resolver_cache, |v| {
                parse_flag("BRRTMVC_RESOLVER_CACHE", &v, defaults.resolver_cache)
            }),
            slow_lookup_threshold_us: lookup("BRRTMVC_SLOW_LOOKUP_US").map_or(
                defaults.slow_lookup_threshold_us,
                |v| match v.trim().parse() {
                    Ok(us) => us,
                    Err(_) => {
                        warn!(variable = "BRRTMVC_SLOW_LOOKUP_US", value = %v, "Invalid number, using default");
                        defaults.slow_lookup_threshold_us
                    }
                },
            ),
        }
    }
}

fn parse_flag(variable: &str, value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(variable = %variable, value = %value, "Invalid boolean, using default");
            default
        }
    }
}
