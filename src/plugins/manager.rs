//! Plugin manager - handles plugin lifecycle and event delivery

use crate::application::errors::{PluginError, PluginResult};
use crate::domain::entities::HostEvent;
use crate::plugins::handle::{HostContext, SystemHandle};
use crate::plugins::trait_def::{Plugin, PluginFactory, PluginState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn, error};

struct LoadedPlugin {
    name: String,
    instance: Arc<dyn Plugin>,
    state: PluginState,
}

/// Manages all plugins for the bot
pub struct PluginManager {
    host: HostContext,
    factories: std::sync::RwLock<HashMap<String, PluginFactory>>,
    plugins: RwLock<Vec<LoadedPlugin>>,
    ready: AtomicBool,
}

impl PluginManager {
    /// Create a new plugin manager for the given host subsystems
    pub fn new(host: HostContext) -> Self {
        Self {
            host,
            factories: std::sync::RwLock::new(HashMap::new()),
            plugins: RwLock::new(Vec::new()),
            ready: AtomicBool::new(false),
        }
    }

    /// Make a plugin available under `name`
    pub fn register_factory<F>(&self, name: impl Into<String>, factory: F) -> PluginResult<()>
    where
        F: Fn(SystemHandle) -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut factories = self.factories.write()
            .map_err(|_| PluginError::Internal("Lock poisoned".to_string()))?;

        if factories.contains_key(&name) {
            return Err(PluginError::AlreadyLoaded(name));
        }
        factories.insert(name, Arc::new(factory));
        Ok(())
    }

    fn factory(&self, name: &str) -> PluginResult<PluginFactory> {
        self.factories.read()
            .map_err(|_| PluginError::Internal("Lock poisoned".to_string()))?
            .get(name)
            .cloned()
            .ok_or_else(|| PluginError::NotFound(name.to_string()))
    }

    /// Construct and load a plugin. A failing `load` is logged, drops any
    /// commands the plugin registered and leaves it in the `Failed` state.
    pub async fn load(&self, name: &str) -> PluginResult<PluginState> {
        let factory = self.factory(name)?;
        let instance = {
            let mut plugins = self.plugins.write().await;
            if plugins.iter().any(|p| p.name == name) {
                return Err(PluginError::AlreadyLoaded(name.to_string()));
            }
            let instance = factory(SystemHandle::new(name, &self.host));
            plugins.push(LoadedPlugin {
                name: name.to_string(),
                instance: Arc::clone(&instance),
                state: PluginState::Constructed,
            });
            instance
        };

        let state = match instance.load().await {
            Ok(()) => {
                info!("Loaded plugin: {}", name);
                PluginState::Loaded
            }
            Err(e) => {
                let removed = self.host.command_handler.unregister_owned_by(name);
                error!("Plugin '{}' failed to load: {} ({} commands removed)", name, e, removed);
                PluginState::Failed
            }
        };
        self.set_state(name, state).await;

        if state == PluginState::Loaded && self.is_ready() {
            self.ready_one(name, &instance).await;
        }
        Ok(self.state(name).await.unwrap_or(state))
    }

    /// Load every named plugin in order, continuing past failures
    pub async fn load_all(&self, names: &[String]) -> usize {
        let mut loaded = 0;
        for name in names {
            match self.load(name).await {
                Ok(PluginState::Loaded) | Ok(PluginState::Ready) => loaded += 1,
                Ok(_) => {}
                Err(e) => warn!("Skipping plugin '{}': {}", name, e),
            }
        }
        loaded
    }

    /// Fire `ready` on every loaded plugin. Plugins loaded later get it immediately.
    pub async fn ready_all(&self) {
        self.ready.store(true, Ordering::SeqCst);

        let pending: Vec<(String, Arc<dyn Plugin>)> = self.plugins.read().await
            .iter()
            .filter(|p| p.state == PluginState::Loaded)
            .map(|p| (p.name.clone(), Arc::clone(&p.instance)))
            .collect();

        for (name, instance) in pending {
            self.ready_one(&name, &instance).await;
        }
    }

    async fn ready_one(&self, name: &str, instance: &Arc<dyn Plugin>) {
        match instance.ready().await {
            Ok(()) => self.set_state(name, PluginState::Ready).await,
            Err(e) => error!("Plugin '{}' failed in ready: {}", name, e),
        }
    }

    /// Unload a plugin and drop the commands it registered
    pub async fn unload(&self, name: &str) -> PluginResult<()> {
        let plugin = {
            let mut plugins = self.plugins.write().await;
            let idx = plugins.iter().position(|p| p.name == name)
                .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
            plugins.remove(idx)
        };

        match plugin.instance.unload().await {
            Ok(()) => {}
            Err(PluginError::UnloadNotImplemented) => {
                warn!("Plugin '{}' does not implement unload, reloading might not work properly", name);
            }
            Err(e) => error!("Plugin '{}' failed to unload: {}", name, e),
        }

        let removed = self.host.command_handler.unregister_owned_by(name);
        info!("Unloaded plugin: {} ({} commands removed)", name, removed);
        Ok(())
    }

    /// Unload then construct and load again from the factory
    pub async fn reload(&self, name: &str) -> PluginResult<PluginState> {
        self.unload(name).await?;
        self.load(name).await
    }

    /// Unload every plugin, newest first
    pub async fn unload_all(&self) {
        let names: Vec<String> = self.plugins.read().await.iter().rev().map(|p| p.name.clone()).collect();
        for name in names {
            if let Err(e) = self.unload(&name).await {
                warn!("Failed to unload '{}': {}", name, e);
            }
        }
    }

    /// Deliver one event to every plugin whose `load` completed successfully
    pub async fn dispatch(&self, event: &HostEvent) {
        let targets: Vec<Arc<dyn Plugin>> = self.plugins.read().await
            .iter()
            .filter(|p| matches!(p.state, PluginState::Loaded | PluginState::Ready))
            .map(|p| Arc::clone(&p.instance))
            .collect();

        for plugin in targets {
            match event {
                HostEvent::StatusUpdate { bot, old, new } => plugin.status_update(bot, *old, *new).await,
                HostEvent::SteamGuardInput { bot, submitter } => plugin.steam_guard_input(bot, submitter.clone()).await,
                HostEvent::SteamGuardQrCode { bot, challenge_url } => plugin.steam_guard_qr_code(bot, challenge_url).await,
                HostEvent::DataUpdate { key, old, new } => plugin.data_update(key, old.as_ref(), new).await,
            }
        }
    }

    async fn set_state(&self, name: &str, state: PluginState) {
        if let Some(plugin) = self.plugins.write().await.iter_mut().find(|p| p.name == name) {
            plugin.state = state;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// List all loaded plugins
    pub async fn list_plugins(&self) -> Vec<PluginInfo> {
        self.plugins.read().await.iter().map(|p| {
            PluginInfo {
                name: p.name.clone(),
                description: p.instance.description().to_string(),
                state: p.state,
                metadata: p.instance.metadata(),
            }
        }).collect()
    }

    /// Check if a plugin exists
    pub async fn has_plugin(&self, name: &str) -> bool {
        self.plugins.read().await.iter().any(|p| p.name == name)
    }

    pub async fn state(&self, name: &str) -> Option<PluginState> {
        self.plugins.read().await.iter().find(|p| p.name == name).map(|p| p.state)
    }
}

/// Plugin information for listing
#[derive(Debug, Clone, serde::Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
    pub state: PluginState,
    pub metadata: HashMap<String, String>,
}
