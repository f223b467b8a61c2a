//! System handle - a plugin's connection to the host

use std::sync::Arc;

use crate::application::errors::StorageError;
use crate::application::services::{AccountRegistry, CommandHandler, DataManager};
use crate::domain::entities::Command;
use crate::domain::traits::{PluginStore, Responder};
use crate::infrastructure::logging::HostLogger;

/// Host subsystems shared by every plugin
#[derive(Clone)]
pub struct HostContext {
    pub logger: HostLogger,
    pub accounts: Arc<AccountRegistry>,
    pub data: Arc<DataManager>,
    pub command_handler: Arc<CommandHandler>,
    pub store: Arc<dyn PluginStore>,
    /// Sends chat messages on behalf of the bot
    pub chat: Arc<dyn Responder>,
}

/// Handed to a plugin's constructor. Cloning is cheap.
#[derive(Clone)]
pub struct SystemHandle {
    plugin_name: String,
    pub logger: HostLogger,
    pub accounts: Arc<AccountRegistry>,
    pub data: Arc<DataManager>,
    pub command_handler: Arc<CommandHandler>,
    pub chat: Arc<dyn Responder>,
    store: Arc<dyn PluginStore>,
}

impl SystemHandle {
    pub fn new(plugin_name: impl Into<String>, host: &HostContext) -> Self {
        let plugin_name = plugin_name.into();
        Self {
            logger: host.logger.scoped(&plugin_name),
            accounts: Arc::clone(&host.accounts),
            data: Arc::clone(&host.data),
            command_handler: Arc::clone(&host.command_handler),
            chat: Arc::clone(&host.chat),
            store: Arc::clone(&host.store),
            plugin_name,
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Register a command owned by this plugin, so a reload removes it
    pub fn register_command(&self, command: Command) -> bool {
        self.command_handler
            .register_command(command.with_owner(self.plugin_name.clone()))
    }

    pub async fn load_plugin_config(&self, defaults: &serde_json::Value) -> Result<serde_json::Value, StorageError> {
        self.store.load_plugin_config(&self.plugin_name, defaults).await
    }

    pub async fn write_plugin_data(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store.write_plugin_data(&self.plugin_name, key, data).await
    }

    pub async fn load_plugin_data(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.store.load_plugin_data(&self.plugin_name, key).await
    }

    pub async fn delete_plugin_data(&self, key: &str) -> Result<(), StorageError> {
        self.store.delete_plugin_data(&self.plugin_name, key).await
    }
}
