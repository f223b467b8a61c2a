//! Application layer - Host services and orchestration
//!
//! This layer contains:
//! - Services: Command handler, data cache, account registry
//! - Errors: Domain-specific errors
//! - Messaging: Ordered event delivery to plugins
//! - Host: Wiring of the above plus the simulated login flow

pub mod errors;
pub mod host;
pub mod services;
pub mod messaging;
