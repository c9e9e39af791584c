use std::{env, net::SocketAddr, path::PathBuf};

use thiserror::Error;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_DB: &str = "courses.db";
const DEFAULT_ADMIN_PASSWORD: &str = "password";
const DEFAULT_SECRET_KEY: &str = "my_secret_key";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Runtime settings, read once at process start
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,

    /// The single shared admin secret (no per-user accounts)
    pub admin_password: String,

    /// Key for signing flash-message cookies
    pub secret_key: String,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load from `COURSE_REVIEW_*` environment variables, after pulling in
    /// a `.env` file if one exists
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `load` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("COURSE_REVIEW_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::InvalidValue {
                key: "COURSE_REVIEW_BIND",
                reason: e.to_string(),
            }
        })?;

        let database_path = lookup("COURSE_REVIEW_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB));

        let admin_password = secret(&lookup, "COURSE_REVIEW_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD)?;
        let secret_key = secret(&lookup, "COURSE_REVIEW_SECRET_KEY", DEFAULT_SECRET_KEY)?;

        let format = lookup("COURSE_REVIEW_LOG_FORMAT").unwrap_or_else(|| "pretty".to_string());
        if format != "pretty" && format != "json" {
            return Err(ConfigError::InvalidValue {
                key: "COURSE_REVIEW_LOG_FORMAT",
                reason: format!("expected \"pretty\" or \"json\", got \"{format}\""),
            });
        }

        Ok(Self {
            bind_addr,
            database_path,
            admin_password,
            secret_key,
            logging: LoggingConfig {
                level: lookup("COURSE_REVIEW_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                format,
            },
        })
    }
}

fn secret<F>(lookup: &F, key: &'static str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if value.is_empty() => Err(ConfigError::InvalidValue {
            key,
            reason: "must not be empty".to_string(),
        }),
        Some(value) => Ok(value),
        // Logging is not up yet; `warn_on_defaults` reports this later
        None => Ok(default.to_string()),
    }
}

impl Config {
    /// Warn about secrets still set to their built-in values
    pub fn warn_on_defaults(&self) {
        if self.admin_password == DEFAULT_ADMIN_PASSWORD {
            warn!("COURSE_REVIEW_ADMIN_PASSWORD not set, using the built-in default");
        }
        if self.secret_key == DEFAULT_SECRET_KEY {
            warn!("COURSE_REVIEW_SECRET_KEY not set, using the built-in default");
        }
    }
}

impl LoggingConfig {
    /// Initialize the tracing subscriber. `RUST_LOG` overrides the level.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.database_path, PathBuf::from("courses.db"));
        assert_eq!(config.admin_password, "password");
        assert_eq!(config.secret_key, "my_secret_key");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_values_from_environment() {
        let config = Config::from_lookup(lookup_from(&[
            ("COURSE_REVIEW_BIND", "0.0.0.0:8080"),
            ("COURSE_REVIEW_DB", "/tmp/reviews.db"),
            ("COURSE_REVIEW_ADMIN_PASSWORD", "hunter2"),
            ("COURSE_REVIEW_SECRET_KEY", "k3y"),
            ("COURSE_REVIEW_LOG_LEVEL", "debug"),
            ("COURSE_REVIEW_LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.database_path, PathBuf::from("/tmp/reviews.db"));
        assert_eq!(config.admin_password, "hunter2");
        assert_eq!(config.secret_key, "k3y");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        let err = Config::from_lookup(lookup_from(&[("COURSE_REVIEW_BIND", "not-an-addr")]))
            .unwrap_err();
        assert!(err.to_string().contains("COURSE_REVIEW_BIND"));
    }

    #[test]
    fn test_rejects_empty_password() {
        let err = Config::from_lookup(lookup_from(&[("COURSE_REVIEW_ADMIN_PASSWORD", "")]))
            .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        assert!(Config::from_lookup(lookup_from(&[("COURSE_REVIEW_LOG_FORMAT", "xml")])).is_err());
    }
}
