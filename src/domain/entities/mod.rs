//! Domain entities - Core business objects

pub mod account;
pub mod command;
pub mod event;
pub mod response;
pub mod steam_id;

pub use account::{BotAccount, BotStatus};
pub use command::{Command, CommandRegistry, CommandRun, Invocation};
pub use event::{CodeSubmitter, HostEvent};
pub use response::{ResponseInfo, RunRejection, RunResult};
pub use steam_id::SteamId;
