//! Store configuration
//!
//! Values the storage core consumes as opaque settings: where the database
//! lives, how large the pool is, per-table row ceilings and the self-healing
//! read policy. Loaded from environment variables or a JSON file; anything
//! malformed is reported instead of silently replaced by a default.

use crate::error::{Result, StoreError};
use crate::storage::sql::Table;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_DB_PATH: &str = "BOOKSTORE_DB_PATH";
pub const ENV_MAX_CONNECTIONS: &str = "BOOKSTORE_MAX_CONNECTIONS";
pub const ENV_MAX_BOOKS: &str = "BOOKSTORE_MAX_BOOKS";
pub const ENV_MAX_OTHER_ROWS: &str = "BOOKSTORE_MAX_OTHER_ROWS";
pub const ENV_SELF_HEAL: &str = "BOOKSTORE_SELF_HEAL";

/// Row-count ceilings enforced before every insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLimits {
    /// Ceiling for the primary entity table (books)
    pub primary: u64,
    /// Ceiling for every other table (authors, genres, languages, link tables)
    pub auxiliary: u64,
}

impl Default for TableLimits {
    fn default() -> Self {
        Self {
            primary: 1000,
            auxiliary: 500,
        }
    }
}

impl TableLimits {
    pub fn ceiling_for(&self, table: Table) -> u64 {
        if table.is_primary() {
            self.primary
        } else {
            self.auxiliary
        }
    }
}

/// Retry-and-seed policy for the "read all books" path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfHealingPolicy {
    /// Seed an empty database on read; disable in production
    pub enabled: bool,
    /// Total number of query attempts, seeding included
    pub max_attempts: u32,
}

impl Default for SelfHealingPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
        }
    }
}

impl SelfHealingPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file; `None` means an in-memory database
    pub database_path: Option<PathBuf>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub limits: TableLimits,
    pub self_healing: SelfHealingPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_connections: 5,
            acquire_timeout_secs: 30,
            limits: TableLimits::default(),
            self_healing: SelfHealingPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Build a configuration from `BOOKSTORE_*` environment variables,
    /// falling back to defaults for unset ones
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`StoreConfig::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH) {
            let path = path.trim();
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }
        if let Some(value) = lookup(ENV_MAX_CONNECTIONS) {
            config.max_connections = parse_var(ENV_MAX_CONNECTIONS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_BOOKS) {
            config.limits.primary = parse_var(ENV_MAX_BOOKS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_OTHER_ROWS) {
            config.limits.auxiliary = parse_var(ENV_MAX_OTHER_ROWS, &value)?;
        }
        if let Some(value) = lookup(ENV_SELF_HEAL) {
            config.self_healing.enabled = parse_var(ENV_SELF_HEAL, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file; missing fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidConfiguration(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(StoreError::InvalidConfiguration(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.self_healing.max_attempts == 0 {
            return Err(StoreError::InvalidConfiguration(
                "self_healing.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        StoreError::InvalidConfiguration(format!("{} has an invalid value: '{}'", key, value))
    })
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
    fn test_defaults_when_unset() {
        let config = StoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.self_healing.max_attempts, 5);
    }

    #[test]
    fn test_env_overrides() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, "/tmp/inventory.db"),
            (ENV_MAX_BOOKS, "20"),
            (ENV_MAX_OTHER_ROWS, " 40 "),
            (ENV_SELF_HEAL, "false"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/inventory.db")));
        assert_eq!(config.limits.ceiling_for(Table::Books), 20);
        assert_eq!(config.limits.ceiling_for(Table::Authors), 40);
        assert!(!config.self_healing.enabled);
    }

    #[test]
    fn test_malformed_value_is_rejected() {
        let err = StoreConfig::from_lookup(lookup_from(&[(ENV_MAX_BOOKS, "lots")])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_json_file_with_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{ "limits": { "primary": 3 } }"#).unwrap();

        let config = StoreConfig::from_json_file(&path).unwrap();
        assert_eq!(config.limits.primary, 3);
        assert_eq!(config.limits.auxiliary, TableLimits::default().auxiliary);
        assert_eq!(config.max_connections, 5);
    }
}
