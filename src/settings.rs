//! Database connection settings
//!
//! Credentials come from an opaque key-value store: four fixed environment
//! variables, typically sourced from a `.env` file by the CLI entry point.

use crate::error::LoadError;

/// Connection parameters for the destination database.
///
/// Sourced once per run; lives for a single loader invocation.
#[derive(Clone, Debug)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl ConnectionSettings {
    /// Resolve settings from the environment.
    ///
    /// Expected variables:
    /// - `POSTGRES_URL`: database host
    /// - `POSTGRES_PORT`: database port
    /// - `POSTGRES_USER`: username
    /// - `POSTGRES_PASSWORD`: password
    pub fn from_env() -> Result<Self, LoadError> {
        let host = require("POSTGRES_URL")?;
        let port_raw = require("POSTGRES_PORT")?;
        let port = port_raw.parse::<u16>().map_err(|_| LoadError::Settings {
            reason: format!("POSTGRES_PORT is not a valid port number: '{}'", port_raw),
        })?;
        let user = require("POSTGRES_USER")?;
        let password = require("POSTGRES_PASSWORD")?;

        Ok(Self {
            host,
            port,
            user,
            password,
        })
    }
}

fn require(key: &str) -> Result<String, LoadError> {
    std::env::var(key).map_err(|_| LoadError::Settings {
        reason: format!("{} environment variable not set", key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_all() {
        unsafe {
            std::env::set_var("POSTGRES_URL", "db.example.com");
            std::env::set_var("POSTGRES_PORT", "5432");
            std::env::set_var("POSTGRES_USER", "etl");
            std::env::set_var("POSTGRES_PASSWORD", "secret");
        }
    }

    #[test]
    #[serial]
    fn test_from_env() {
        set_all();
        let settings = ConnectionSettings::from_env().unwrap();
        assert_eq!(settings.host, "db.example.com");
        assert_eq!(settings.port, 5432);
        assert_eq!(settings.user, "etl");
        assert_eq!(settings.password, "secret");
    }

    #[test]
    #[serial]
    fn test_missing_variable() {
        set_all();
        unsafe {
            std::env::remove_var("POSTGRES_PASSWORD");
        }
        let error = ConnectionSettings::from_env().unwrap_err();
        assert!(error.to_string().contains("POSTGRES_PASSWORD"));
    }

    #[test]
    #[serial]
    fn test_invalid_port() {
        set_all();
        unsafe {
            std::env::set_var("POSTGRES_PORT", "not-a-port");
        }
        let error = ConnectionSettings::from_env().unwrap_err();
        assert!(error.to_string().contains("valid port"));
    }
}
