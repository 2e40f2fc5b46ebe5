use serde::Deserialize;

use crate::days::service::DEFAULT_WRITE_RETRIES;
use crate::error::{Error, Result};

/// Runtime settings, read from the environment.
///
/// * `DATABASE_URL`: Postgres connection string (required).
/// * `NUTRILOG_MAX_CONNECTIONS`: pool size, default 10.
/// * `NUTRILOG_WRITE_RETRIES`: conflict retries per write, default 5.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub write_retries: u32,
}

impl AppConfig {
    /// Read configuration, loading a `.env` file first when one is present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".into()))?;
        let max_connections = std::env::var("NUTRILOG_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let write_retries = std::env::var("NUTRILOG_WRITE_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_WRITE_RETRIES);

        Ok(Self {
            database_url,
            max_connections,
            write_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // env vars are process-global, so the cases run inside one test
    #[test]
    fn from_env_reads_and_defaults() {
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("NUTRILOG_MAX_CONNECTIONS");
        std::env::remove_var("NUTRILOG_WRITE_RETRIES");

        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        std::env::set_var("DATABASE_URL", "postgres://localhost/nutrilog");
        let config = AppConfig::from_env().expect("config ok");
        assert_eq!(config.database_url, "postgres://localhost/nutrilog");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.write_retries, DEFAULT_WRITE_RETRIES);

        std::env::set_var("NUTRILOG_MAX_CONNECTIONS", "32");
        std::env::set_var("NUTRILOG_WRITE_RETRIES", "9");
        let config = AppConfig::from_env().expect("config ok");
        assert_eq!(config.max_connections, 32);
        assert_eq!(config.write_retries, 9);

        std::env::set_var("NUTRILOG_WRITE_RETRIES", "not-a-number");
        let config = AppConfig::from_env().expect("config ok");
        assert_eq!(config.write_retries, DEFAULT_WRITE_RETRIES);
    }
}
