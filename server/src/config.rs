//! Configuration management for the server.

use std::env;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Upper bound on pooled database connections
    pub max_connections: u32,
    /// Shared bearer token. Requests are anonymous when unset.
    pub auth_secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidMaxConnections(raw))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let auth_secret = lookup("AUTH_SECRET").filter(|secret| !secret.is_empty());

        Ok(Self {
            host,
            port,
            database_url,
            max_connections,
            auth_secret,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid DATABASE_MAX_CONNECTIONS value: {0}")]
    InvalidMaxConnections(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/stride")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.auth_secret, None);
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingDatabaseUrl)));
        assert!(matches!(
            load(&[("DATABASE_URL", "")]),
            Err(ConfigError::MissingDatabaseUrl)
        ));
    }

    #[test]
    fn invalid_port() {
        let result = load(&[("DATABASE_URL", "postgres://x"), ("PORT", "http")]);
        assert!(matches!(result, Err(ConfigError::InvalidPort)));
    }

    #[test]
    fn max_connections_must_be_positive() {
        let result = load(&[("DATABASE_URL", "postgres://x"), ("DATABASE_MAX_CONNECTIONS", "0")]);
        assert!(matches!(result, Err(ConfigError::InvalidMaxConnections(_))));

        let config =
            load(&[("DATABASE_URL", "postgres://x"), ("DATABASE_MAX_CONNECTIONS", "4")]).unwrap();
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn empty_secret_means_open() {
        let config = load(&[("DATABASE_URL", "postgres://x"), ("AUTH_SECRET", "")]).unwrap();
        assert_eq!(config.auth_secret, None);
    }
}
