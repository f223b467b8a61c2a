//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Per-plugin file storage
//! - Logging: The ready-after host logger
//! - Adapters: Console front end

pub mod config;
pub mod storage;
pub mod logging;
pub mod adapters;
