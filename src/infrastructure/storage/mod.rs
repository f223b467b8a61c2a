//! File-based plugin storage
//!
//! Layout: `<base>/<plugin>/config.json` for config and `<base>/<plugin>/<key>`
//! for data blobs.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::application::errors::StorageError;
use crate::domain::traits::PluginStore;

const CONFIG_FILE: &str = "config.json";

/// Directory-per-plugin store
pub struct FilePluginStore {
    base_path: PathBuf,
}

impl FilePluginStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn plugin_dir(&self, plugin: &str) -> Result<PathBuf, StorageError> {
        validate_component(plugin)?;
        Ok(self.base_path.join(plugin))
    }

    fn data_path(&self, plugin: &str, key: &str) -> Result<PathBuf, StorageError> {
        validate_component(key)?;
        Ok(self.plugin_dir(plugin)?.join(key))
    }
}

/// Names and keys must stay inside their directory
fn validate_component(name: &str) -> Result<(), StorageError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if bad {
        return Err(StorageError::InvalidKey(name.to_string()));
    }
    Ok(())
}

fn not_found(path: &Path, e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound(path.display().to_string())
    } else {
        StorageError::Io(e)
    }
}

/// Fill top-level keys missing from `config` with the ones in `defaults`
fn merge_defaults(config: &mut serde_json::Value, defaults: &serde_json::Value) -> bool {
    let (Some(config), Some(defaults)) = (config.as_object_mut(), defaults.as_object()) else {
        return false;
    };

    let mut changed = false;
    for (key, value) in defaults {
        if !config.contains_key(key) {
            config.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

#[async_trait]
impl PluginStore for FilePluginStore {
    async fn load_plugin_config(&self, plugin: &str, defaults: &serde_json::Value) -> Result<serde_json::Value, StorageError> {
        let dir = self.plugin_dir(plugin)?;
        let path = dir.join(CONFIG_FILE);

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let mut config: serde_json::Value = serde_json::from_str(&content)?;
                if merge_defaults(&mut config, defaults) {
                    tracing::debug!("Filled missing config keys for plugin '{}' from defaults", plugin);
                }
                Ok(config)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No config found for plugin '{}', writing defaults to {}", plugin, path.display());
                tokio::fs::create_dir_all(&dir).await?;
                let content = serde_json::to_string_pretty(defaults)?;
                tokio::fs::write(&path, content).await?;
                Ok(defaults.clone())
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write_plugin_data(&self, plugin: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.data_path(plugin, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn load_plugin_data(&self, plugin: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.data_path(plugin, key)?;
        tokio::fs::read(&path).await.map_err(|e| not_found(&path, e))
    }

    async fn delete_plugin_data(&self, plugin: &str, key: &str) -> Result<(), StorageError> {
        let path = self.data_path(plugin, key)?;
        tokio::fs::remove_file(&path).await.map_err(|e| not_found(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_data_round_trip_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePluginStore::new(dir.path());

        let blob = [0u8, 159, 146, 150, b'\n', 42];
        store.write_plugin_data("template", "data.bin", &blob).await.unwrap();
        assert_eq!(store.load_plugin_data("template", "data.bin").await.unwrap(), blob);

        store.delete_plugin_data("template", "data.bin").await.unwrap();
        let err = store.load_plugin_data("template", "data.bin").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePluginStore::new(dir.path());

        let err = store.delete_plugin_data("template", "nothing").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePluginStore::new(dir.path());

        for key in ["", "..", "../secret", "a/b", "a\\b"] {
            let err = store.write_plugin_data("template", key, b"x").await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "key {:?}", key);
        }
        let err = store.load_plugin_data("..", "data").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_config_seeded_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePluginStore::new(dir.path());
        let defaults = json!({ "greeting": "Hello world!", "guardTimeoutSecs": 30 });

        let config = store.load_plugin_config("template", &defaults).await.unwrap();
        assert_eq!(config, defaults);
        assert!(dir.path().join("template").join(CONFIG_FILE).exists());
    }

    #[tokio::test]
    async fn test_config_keeps_user_values_and_fills_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let plugin_dir = dir.path().join("template");
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join(CONFIG_FILE), r#"{ "greeting": "Hi" }"#).unwrap();

        let store = FilePluginStore::new(dir.path());
        let defaults = json!({ "greeting": "Hello world!", "guardTimeoutSecs": 30 });

        let config = store.load_plugin_config("template", &defaults).await.unwrap();
        assert_eq!(config, json!({ "greeting": "Hi", "guardTimeoutSecs": 30 }));
    }

    #[tokio::test]
    async fn test_config_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let plugin_dir = dir.path().join("template");
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join(CONFIG_FILE), "{ not json").unwrap();

        let store = FilePluginStore::new(dir.path());
        let err = store.load_plugin_config("template", &json!({})).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
