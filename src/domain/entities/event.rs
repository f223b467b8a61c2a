use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use super::{BotAccount, BotStatus};

/// Notifications the host delivers to every loaded plugin
#[derive(Debug, Clone)]
pub enum HostEvent {
    StatusUpdate {
        bot: BotAccount,
        old: BotStatus,
        new: BotStatus,
    },
    SteamGuardInput {
        bot: BotAccount,
        submitter: CodeSubmitter,
    },
    SteamGuardQrCode {
        bot: BotAccount,
        challenge_url: String,
    },
    DataUpdate {
        key: String,
        old: Option<serde_json::Value>,
        new: serde_json::Value,
    },
}

impl HostEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::StatusUpdate { .. } => "statusUpdate",
            HostEvent::SteamGuardInput { .. } => "steamGuardInput",
            HostEvent::SteamGuardQrCode { .. } => "steamGuardQrCode",
            HostEvent::DataUpdate { .. } => "dataUpdate",
        }
    }
}

/// One-shot Steam Guard code channel shared by every party that may answer.
///
/// Clones share the same slot: the first `submit` wins and later calls
/// return `false`. An empty code skips the account.
#[derive(Clone)]
pub struct CodeSubmitter {
    slot: Arc<Mutex<Option<oneshot::Sender<String>>>>,
}

impl CodeSubmitter {
    pub fn channel() -> (Self, oneshot::Receiver<String>) {
        let (tx, rx) = oneshot::channel();
        let submitter = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (submitter, rx)
    }

    pub fn submit(&self, code: impl Into<String>) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        match sender {
            Some(tx) => tx.send(code.into()).is_ok(),
            None => false,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}

impl std::fmt::Debug for CodeSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeSubmitter")
            .field("answered", &self.is_answered())
            .finish()
    }
}
