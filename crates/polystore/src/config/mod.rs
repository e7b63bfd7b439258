//! Configuration loading, normalization and persistence.

mod normalize;
mod types;
mod validation;

pub use normalize::{apply_secret_preservation, merge, normalize, public_view};
pub use types::*;
pub use validation::{validate, validate_distinct};

use crate::error::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Loads and persists the provider configuration file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Create a manager for the JSON file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the persisted configuration.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted configuration.
    ///
    /// A missing or malformed file is not an error: defaults are returned.
    pub fn load(&self) -> DatabaseConfig {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No configuration at {:?} ({}), using defaults", self.path, e);
                return DatabaseConfig::default();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(raw) => normalize(&raw),
            Err(e) => {
                warn!(
                    "Configuration at {:?} is malformed ({}), using defaults",
                    self.path, e
                );
                DatabaseConfig::default()
            }
        }
    }

    /// Normalize and persist a configuration, returning what was written.
    pub fn save(&self, config: &DatabaseConfig) -> Result<DatabaseConfig> {
        let normalized = normalize(&config.to_value());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&normalized.to_value())?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!("Saved configuration to {:?}", self.path);
        Ok(normalized)
    }

    /// Apply a partial update without clearing stored passwords, then persist.
    pub fn update(&self, patch: &Value) -> Result<DatabaseConfig> {
        let current = self.load();
        let merged = apply_secret_preservation(&current, patch);
        self.save(&merged)
    }

    /// Secret-free view of the persisted configuration.
    pub fn public_config(&self) -> PublicConfig {
        public_view(&self.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("absent.json"));
        assert_eq!(manager.load(), DatabaseConfig::default());
    }

    #[test]
    fn test_load_malformed_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ provider: postgres").unwrap();

        let manager = ConfigManager::new(&path);
        assert_eq!(manager.load(), DatabaseConfig::default());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("nested").join("config.json"));

        let mut config = DatabaseConfig::default().with_provider(Provider::Mariadb);
        config.mariadb.password = "pw".to_string();
        config.mariadb.port = 3307;

        let saved = manager.save(&config).unwrap();
        assert_eq!(saved, config);
        assert_eq!(manager.load(), config);

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(manager.path()).unwrap()).unwrap();
        assert_eq!(raw["provider"], "mariadb");
        assert_eq!(raw["sqlite"]["filePath"], "data/polystore.db");
    }

    #[test]
    fn test_update_preserves_password() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("config.json"));

        let mut config = DatabaseConfig::default();
        config.postgres.password = "secret".to_string();
        manager.save(&config).unwrap();

        let updated = manager
            .update(&json!({ "provider": "postgres", "postgres": { "host": "pg", "password": "" } }))
            .unwrap();

        assert_eq!(updated.provider, Provider::Postgres);
        assert_eq!(updated.postgres.host, "pg");
        assert_eq!(updated.postgres.password, "secret");
        assert!(manager.public_config().postgres.has_password);
    }
}
