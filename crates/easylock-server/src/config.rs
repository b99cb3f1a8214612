//! Server configuration from environment variables.
//!
//! - `EASYLOCK_HOST`: listen address (default "0.0.0.0")
//! - `EASYLOCK_PORT`: listen port (default "3000")
//! - `EASYLOCK_SHUTDOWN_GRACE_SECS`: how long in-flight requests may run after
//!   shutdown is signalled (default "5")

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServerConfig::default();

        if let Some(host) = lookup("EASYLOCK_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("EASYLOCK_PORT") {
            config.port = parse("EASYLOCK_PORT", port)?;
        }
        if let Some(secs) = lookup("EASYLOCK_SHUTDOWN_GRACE_SECS") {
            config.shutdown_grace = Duration::from_secs(parse("EASYLOCK_SHUTDOWN_GRACE_SECS", secs)?);
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("EASYLOCK_HOST", "127.0.0.1"),
            ("EASYLOCK_PORT", "4040"),
            ("EASYLOCK_SHUTDOWN_GRACE_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:4040");
        assert_eq!(config.shutdown_grace, Duration::ZERO);
    }

    #[test]
    fn rejects_bad_port() {
        let err = ServerConfig::from_lookup(lookup(&[("EASYLOCK_PORT", "70000")])).unwrap_err();
        assert!(err.to_string().contains("EASYLOCK_PORT"));
    }
}
