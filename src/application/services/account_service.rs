//! Bot account registry - status transitions and Steam Guard requests

use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use uuid::Uuid;

use crate::application::errors::BotError;
use crate::application::messaging::EventSender;
use crate::domain::entities::{BotAccount, BotStatus, CodeSubmitter, HostEvent};

/// A Steam Guard code request waiting for its answer
pub struct PendingCode {
    id: Uuid,
    rx: oneshot::Receiver<String>,
    // Holding a clone keeps the channel open even if every plugin drops theirs
    _keepalive: CodeSubmitter,
    timeout: Option<Duration>,
}

impl PendingCode {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the code. `None` means skip the account: an empty code or
    /// the configured timeout expiring.
    pub async fn wait(self) -> Option<String> {
        let id = self.id;
        let received = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.rx).await {
                Ok(received) => received.ok(),
                Err(_) => {
                    tracing::warn!(%id, "Steam Guard code not submitted within {:?}, skipping account", limit);
                    return None;
                }
            },
            None => self.rx.await.ok(),
        };

        received.map(|code| code.trim().to_string()).filter(|code| !code.is_empty())
    }
}

/// All bot accounts managed by the host
pub struct AccountRegistry {
    accounts: RwLock<Vec<BotAccount>>,
    events: Option<EventSender>,
    guard_timeout: Option<Duration>,
}

impl AccountRegistry {
    pub fn new<I, S>(names: I, events: Option<EventSender>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accounts = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| BotAccount::new(index, name))
            .collect();

        Self {
            accounts: RwLock::new(accounts),
            events,
            guard_timeout: None,
        }
    }

    pub fn with_guard_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.guard_timeout = timeout;
        self
    }

    pub async fn accounts(&self) -> Vec<BotAccount> {
        self.accounts.read().await.clone()
    }

    pub async fn get(&self, index: usize) -> Option<BotAccount> {
        self.accounts.read().await.get(index).cloned()
    }

    /// Every account finished its login attempt
    pub async fn all_settled(&self) -> bool {
        self.accounts.read().await.iter().all(|a| a.status.is_settled())
    }

    /// Change an account's status, returning the previous one.
    /// A `statusUpdate` event is emitted only on an actual transition.
    pub async fn set_status(&self, index: usize, status: BotStatus) -> Result<BotStatus, BotError> {
        let (bot, old) = {
            let mut accounts = self.accounts.write().await;
            let account = accounts
                .get_mut(index)
                .ok_or_else(|| BotError::NotFound(format!("bot account #{}", index)))?;

            let old = account.status;
            account.status = status;
            (account.clone(), old)
        };

        if old != status {
            tracing::info!("Bot {} changed status from {} to {}", bot, old, status);
            if let Some(events) = &self.events {
                events.emit(HostEvent::StatusUpdate { bot, old, new: status });
            }
        }
        Ok(old)
    }

    /// Ask plugins for a Steam Guard code.
    ///
    /// The returned submitter can be handed to other sources (a console
    /// prompt); the first submission resolves the `PendingCode`.
    pub async fn request_steam_guard_code(&self, index: usize) -> Result<(CodeSubmitter, PendingCode), BotError> {
        let bot = self
            .get(index)
            .await
            .ok_or_else(|| BotError::NotFound(format!("bot account #{}", index)))?;

        let (submitter, rx) = CodeSubmitter::channel();
        let pending = PendingCode {
            id: Uuid::new_v4(),
            rx,
            _keepalive: submitter.clone(),
            timeout: self.guard_timeout,
        };

        tracing::info!(id = %pending.id, "Bot {} requested a Steam Guard code", bot);
        if let Some(events) = &self.events {
            events.emit(HostEvent::SteamGuardInput {
                bot,
                submitter: submitter.clone(),
            });
        }
        Ok((submitter, pending))
    }

    /// Announce a QR code login challenge for an account
    pub async fn request_qr_login(&self, index: usize, challenge_url: impl Into<String>) -> Result<(), BotError> {
        let bot = self
            .get(index)
            .await
            .ok_or_else(|| BotError::NotFound(format!("bot account #{}", index)))?;

        let challenge_url = challenge_url.into();
        tracing::info!("Bot {} started a QR code login: {}", bot, challenge_url);
        if let Some(events) = &self.events {
            events.emit(HostEvent::SteamGuardQrCode { bot, challenge_url });
        }
        Ok(())
    }
}
