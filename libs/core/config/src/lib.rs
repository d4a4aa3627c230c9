//! Environment-driven configuration shared by the pool crates.
//!
//! - `Environment`: development vs. production, from `APP_ENV`
//! - `FromEnv`: implemented by every config struct that reads the environment
//! - `env_*` helpers for defaulted and parsed variables

pub mod server;
pub mod tracing;

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Reads `APP_ENV`; anything other than "production" means development
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Read an environment variable, falling back to `default`
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// A set but unparsable value is an error, not a silent fallback.
pub fn env_parse_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_var_unset("APP_ENV", || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(env.is_development());
            assert!(!env.is_production());
        });
    }

    #[test]
    fn test_environment_production_case_insensitive() {
        temp_env::with_var("APP_ENV", Some("PRODUCTION"), || {
            assert_eq!(Environment::from_env(), Environment::Production);
        });
    }

    #[test]
    fn test_environment_unknown_defaults_to_development() {
        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn test_env_or_default() {
        temp_env::with_var("POOL_TEST_VAR", Some("set"), || {
            assert_eq!(env_or_default("POOL_TEST_VAR", "fallback"), "set");
        });
        temp_env::with_var_unset("POOL_TEST_VAR", || {
            assert_eq!(env_or_default("POOL_TEST_VAR", "fallback"), "fallback");
        });
    }

    #[test]
    fn test_env_parse_or_default() {
        temp_env::with_var("POOL_PARSE", Some(" 12 "), || {
            assert_eq!(env_parse_or_default("POOL_PARSE", 3usize).unwrap(), 12);
        });
        temp_env::with_var_unset("POOL_PARSE", || {
            assert_eq!(env_parse_or_default("POOL_PARSE", 3usize).unwrap(), 3);
        });
    }

    #[test]
    fn test_env_parse_invalid_value() {
        temp_env::with_var("POOL_PARSE_BOOL", Some("maybe"), || {
            let err = env_parse_or_default("POOL_PARSE_BOOL", false).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "POOL_PARSE_BOOL"));
        });
    }
}
