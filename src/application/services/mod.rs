//! Application services - Host subsystems plugins talk to

pub mod account_service;
pub mod command_service;
pub mod data_service;

pub use account_service::{AccountRegistry, PendingCode};
pub use command_service::CommandHandler;
pub use data_service::{CacheFile, DataManager, OWNER_ID_KEY};
