use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection status of a bot account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    Offline,
    Online,
    Error,
    Skipped,
    Poisoned,
}

impl BotStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BotStatus::Offline => "OFFLINE",
            BotStatus::Online => "ONLINE",
            BotStatus::Error => "ERROR",
            BotStatus::Skipped => "SKIPPED",
            BotStatus::Poisoned => "POISONED",
        }
    }

    /// Whether the account has finished its login attempt, successfully or not
    pub fn is_settled(&self) -> bool {
        !matches!(self, BotStatus::Offline)
    }
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a bot account handed to plugin hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotAccount {
    pub index: usize,
    pub account_name: String,
    pub status: BotStatus,
}

impl BotAccount {
    pub fn new(index: usize, account_name: impl Into<String>) -> Self {
        Self {
            index,
            account_name: account_name.into(),
            status: BotStatus::Offline,
        }
    }
}

impl fmt::Display for BotAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.index, self.account_name)
    }
}
