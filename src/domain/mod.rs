//! Domain layer - Core objects shared by host and plugins
//!
//! This layer contains:
//! - Entities: SteamId, BotAccount, Command, HostEvent, ResponseInfo
//! - Traits: Abstractions for infrastructure (Responder, PluginStore)

pub mod entities;
pub mod traits;
