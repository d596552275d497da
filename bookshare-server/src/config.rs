//! Server configuration
//!
//! All configuration is loaded from environment variables at startup. A `.env`
//! file in the working directory is honoured for local development.

use axum::http::HeaderValue;
use bookshare_core::Principal;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_STORAGE_PATH: &str = "./bookshare_data";

/// Snapshot file name inside the storage directory
pub const SNAPSHOT_FILE: &str = "library.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which browser origins may call the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    /// localhost on the usual dev ports
    LocalDevelopment,
    Any,
    Origins(Vec<HeaderValue>),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub storage_path: PathBuf,
    /// Principals that are made admin when they register
    pub admins: Vec<Principal>,
    pub cors: CorsPolicy,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// `.env` is skipped under `cfg(test)` so tests stay hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_address_str =
            lookup("BOOKSHARE_BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BOOKSHARE_BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let storage_path = lookup("BOOKSHARE_STORAGE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH));

        let admins = lookup("BOOKSHARE_ADMINS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(Principal::new)
                    .collect()
            })
            .unwrap_or_default();

        let cors = match lookup("BOOKSHARE_CORS_ORIGINS") {
            None => CorsPolicy::LocalDevelopment,
            Some(origins) if origins.trim() == "*" => CorsPolicy::Any,
            Some(origins) => {
                let parsed = origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(|o| {
                        o.parse::<HeaderValue>().map_err(|_| {
                            ConfigError::InvalidValue(
                                "BOOKSHARE_CORS_ORIGINS".to_string(),
                                format!("'{}' is not a valid origin", o),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                CorsPolicy::Origins(parsed)
            }
        };

        Ok(Self {
            bind_address,
            storage_path,
            admins,
            cors,
        })
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.storage_path.join(SNAPSHOT_FILE)
    }
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
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.to_string(), DEFAULT_BIND_ADDRESS);
        assert_eq!(config.snapshot_path(), PathBuf::from("./bookshare_data/library.json"));
        assert!(config.admins.is_empty());
        assert_eq!(config.cors, CorsPolicy::LocalDevelopment);
    }

    #[test]
    fn test_admin_list() {
        let config = load(&[("BOOKSHARE_ADMINS", " alice, ,bob ")]).unwrap();
        assert_eq!(config.admins, vec![Principal::new("alice"), Principal::new("bob")]);
    }

    #[test]
    fn test_cors_origins() {
        assert_eq!(
            load(&[("BOOKSHARE_CORS_ORIGINS", "*")]).unwrap().cors,
            CorsPolicy::Any
        );
        let config = load(&[(
            "BOOKSHARE_CORS_ORIGINS",
            "https://books.example, https://admin.books.example",
        )])
        .unwrap();
        match config.cors {
            CorsPolicy::Origins(origins) => assert_eq!(origins.len(), 2),
            other => panic!("unexpected policy {:?}", other),
        }
    }

    #[test]
    fn test_invalid_bind_address() {
        let err = load(&[("BOOKSHARE_BIND_ADDRESS", "not-an-address")]).unwrap_err();
        assert!(err.to_string().contains("BOOKSHARE_BIND_ADDRESS"));
    }
}
