use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("invalid {key} value '{value}': {message}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub transaction_timeout: Duration,
    pub secure_cookies: bool,
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/communifridge.db".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            transaction_timeout: Duration::from_secs(10),
            secure_cookies: false,
            max_connections: 5,
        }
    }
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout_secs: u64 = load(&lookup, "TRANSACTION_TIMEOUT_SECS", 10)?;

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: load(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            transaction_timeout: Duration::from_secs(timeout_secs),
            secure_cookies: load(&lookup, "SECURE_COOKIES", defaults.secure_cookies)?,
            max_connections: load(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections)?,
        })
    }
}

fn load<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            key,
            message: e.to_string(),
            value,
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_url, "sqlite:data/communifridge.db");
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.transaction_timeout, Duration::from_secs(10));
        assert!(!config.secure_cookies);
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn values_are_read_from_environment() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("TRANSACTION_TIMEOUT_SECS", "3"),
            ("SECURE_COOKIES", "true"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.transaction_timeout, Duration::from_secs(3));
        assert!(config.secure_cookies);
    }

    #[test]
    fn malformed_value_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("TRANSACTION_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert_eq!(err.key, "TRANSACTION_TIMEOUT_SECS");
        assert_eq!(err.value, "soon");
    }
}
