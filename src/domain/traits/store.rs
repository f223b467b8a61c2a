use async_trait::async_trait;
use crate::application::errors::StorageError;

/// Store trait - per-plugin scoped persistence
#[async_trait]
pub trait PluginStore: Send + Sync {
    /// Load a plugin's JSON config, seeding the file from `defaults` when missing
    async fn load_plugin_config(&self, plugin: &str, defaults: &serde_json::Value) -> Result<serde_json::Value, StorageError>;

    // Data blob operations
    async fn write_plugin_data(&self, plugin: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
    async fn load_plugin_data(&self, plugin: &str, key: &str) -> Result<Vec<u8>, StorageError>;
    async fn delete_plugin_data(&self, plugin: &str, key: &str) -> Result<(), StorageError>;
}
