//! steambot-plugins - plugin host contract for a Steam chat bot
//!
//! Plugins implement [`plugins::Plugin`], receive a [`plugins::SystemHandle`]
//! at construction and are driven by the host through `load`, `ready` and
//! `unload` plus a stream of status, Steam Guard and data events.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod plugins;

pub use application::host::Host;
