// Configuration module for lsifg
// Reads from environment variables with sensible defaults

use crate::dump::OnError;
use clap::ValueEnum;
use log::warn;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Default policy for rejected records while loading a dump (LSIFG_ON_ERROR)
    pub on_error: OnError,

    /// Resolver queries slower than this are logged (LSIFG_SLOW_QUERY_MS)
    pub slow_query_ms: u64,

    /// Cap on violations printed by the CLI, 0 for no cap (LSIFG_MAX_VIOLATIONS)
    pub max_violations: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            on_error: OnError::Abort,
            slow_query_ms: 250,
            max_violations: 0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unparsable values keep the default.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(val) = lookup("LSIFG_ON_ERROR") {
            match <OnError as ValueEnum>::from_str(val.trim(), true) {
                Ok(parsed) => config.on_error = parsed,
                Err(_) => warn!(
                    "lsifg: invalid LSIFG_ON_ERROR value: {val}, using default: {}",
                    config.on_error
                ),
            }
        }

        parse_into(&lookup, "LSIFG_SLOW_QUERY_MS", &mut config.slow_query_ms);
        parse_into(&lookup, "LSIFG_MAX_VIOLATIONS", &mut config.max_violations);

        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }
}

fn parse_into<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T)
where
    T: FromStr + std::fmt::Display,
{
    let Some(val) = lookup(key) else {
        return;
    };
    match val.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!("lsifg: invalid {key} value: {val}, using default: {slot}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.on_error, OnError::Abort);
        assert_eq!(config.slow_query_ms, 250);
        assert_eq!(config.max_violations, 0);
        assert_eq!(Config::from_source(source(&[])), config);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_source(source(&[
            ("LSIFG_ON_ERROR", "Skip"),
            ("LSIFG_SLOW_QUERY_MS", "10"),
            ("LSIFG_MAX_VIOLATIONS", " 50 "),
        ]));
        assert_eq!(config.on_error, OnError::Skip);
        assert_eq!(config.slow_query_ms, 10);
        assert_eq!(config.max_violations, 50);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = Config::from_source(source(&[
            ("LSIFG_ON_ERROR", "retry"),
            ("LSIFG_SLOW_QUERY_MS", "soon"),
        ]));
        assert_eq!(config, Config::default());
    }
}
