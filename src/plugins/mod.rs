//! Plugin system for steambot
//!
//! Plugins are constructed with a `SystemHandle`, driven through the
//! load/ready/unload lifecycle and notified of host events.

pub mod handle;
pub mod manager;
pub mod template;
pub mod trait_def;

pub use handle::{HostContext, SystemHandle};
pub use manager::{PluginInfo, PluginManager};
pub use trait_def::{Plugin, PluginFactory, PluginState};

use crate::application::errors::PluginResult;

/// Make the plugins shipped with the host available to `manager`
pub fn register_builtin(manager: &PluginManager) -> PluginResult<()> {
    manager.register_factory(template::NAME, template::TemplatePlugin::factory)
}
