use crate::{env_or_default, env_parse_or_default, ConfigError, FromEnv};
use std::net::Ipv4Addr;

/// Bind address for the health and metrics server
#[derive(Clone, Debug)]
pub struct HealthServerConfig {
    pub host: String,
    pub port: u16,
}

impl HealthServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for HealthServerConfig {
    /// - HEALTH_HOST: defaults to 0.0.0.0
    /// - HEALTH_PORT: defaults to 8082
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HEALTH_HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_parse_or_default("HEALTH_PORT", 8082)?;

        Ok(Self { host, port })
    }
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED.to_string(), 8082)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_server_defaults() {
        temp_env::with_vars_unset(["HEALTH_HOST", "HEALTH_PORT"], || {
            let config = HealthServerConfig::from_env().unwrap();
            assert_eq!(config.address(), "0.0.0.0:8082");
        });
    }

    #[test]
    fn test_health_server_custom_port() {
        temp_env::with_var("HEALTH_PORT", Some("9100"), || {
            let config = HealthServerConfig::from_env().unwrap();
            assert_eq!(config.port, 9100);
        });
    }

    #[test]
    fn test_health_server_invalid_port() {
        temp_env::with_var("HEALTH_PORT", Some("70000"), || {
            let err = HealthServerConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("HEALTH_PORT"));
        });
    }
}
