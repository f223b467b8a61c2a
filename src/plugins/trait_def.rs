//! Plugin trait definitions

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::application::errors::{PluginError, PluginResult};
use crate::domain::entities::{BotAccount, BotStatus, CodeSubmitter};
use super::handle::SystemHandle;

/// Core plugin trait that all plugins must implement.
///
/// Every hook has a default so a plugin only overrides what it needs. Event
/// hooks are notifications: they return nothing the host acts on and should
/// hand long work off to a spawned task.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique identifier for the plugin
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str {
        ""
    }

    /// Called after the update check and before any account logs in
    async fn load(&self) -> PluginResult<()> {
        Ok(())
    }

    /// Called once every configured account finished logging in
    async fn ready(&self) -> PluginResult<()> {
        Ok(())
    }

    /// Release whatever `load` acquired before the plugin is reloaded.
    ///
    /// The default reports that cleanup is missing so the host can warn;
    /// override with an empty `Ok(())` when there is nothing to release.
    async fn unload(&self) -> PluginResult<()> {
        Err(PluginError::UnloadNotImplemented)
    }

    /// A bot account's connection status changed
    async fn status_update(&self, _bot: &BotAccount, _old: BotStatus, _new: BotStatus) {}

    /// A bot account needs a Steam Guard code. Submit one, or `""` to skip.
    async fn steam_guard_input(&self, _bot: &BotAccount, _submitter: CodeSubmitter) {}

    /// A bot account started a QR code login; surface `challenge_url`
    async fn steam_guard_qr_code(&self, _bot: &BotAccount, _challenge_url: &str) {}

    /// A tracked data key was imported or exported. `old` is `None` on export.
    async fn data_update(&self, _key: &str, _old: Option<&serde_json::Value>, _new: &serde_json::Value) {}

    /// Optional: Get plugin metadata
    fn metadata(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Builds a fresh plugin instance from its system handle. Must not do I/O.
pub type PluginFactory = Arc<dyn Fn(SystemHandle) -> Arc<dyn Plugin> + Send + Sync>;

/// Lifecycle state tracked by the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Constructed,
    Loaded,
    Failed,
    Ready,
}
