//! Domain traits - Abstractions for infrastructure implementations

pub mod responder;
pub mod store;

pub use responder::Responder;
pub use store::PluginStore;
