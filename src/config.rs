//! Server configuration from environment variables.

use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Where tournaments are kept.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StorageConfig {
    /// In-memory only; lost on restart.
    Memory,
    /// SQLite database at this path (`:memory:` for a private in-memory database).
    Sqlite(PathBuf),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            storage: StorageConfig::Memory,
        }
    }
}

impl ServerConfig {
    /// Read `HOST`, `PORT` and `DATABASE_PATH` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unset, empty or unparsable values fall back
    /// to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: non_empty("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            storage: non_empty("DATABASE_PATH")
                .map(|p| StorageConfig::Sqlite(PathBuf::from(p)))
                .unwrap_or(defaults.storage),
        }
    }
}
