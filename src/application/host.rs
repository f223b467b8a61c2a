//! Host wiring - builds the subsystems plugins see and drives startup

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::application::errors::BotError;
use crate::application::messaging::{event_channel, EventSender};
use crate::application::services::{AccountRegistry, CommandHandler, DataManager};
use crate::domain::entities::{BotStatus, ResponseInfo, SteamId};
use crate::domain::traits::{PluginStore, Responder};
use crate::infrastructure::adapters::ConsoleAdapter;
use crate::infrastructure::config::{Config, GuardMode};
use crate::infrastructure::logging::HostLogger;
use crate::infrastructure::storage::FilePluginStore;
use crate::plugins::{HostContext, PluginManager};

/// Characters a long response may be split after
const CUT_CHARS: [char; 3] = ['\n', '.', ' '];

/// The running host. Must be created inside a tokio runtime.
pub struct Host {
    config: Config,
    logger: HostLogger,
    events: EventSender,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    pub accounts: Arc<AccountRegistry>,
    pub data: Arc<DataManager>,
    pub commands: Arc<CommandHandler>,
    pub plugins: Arc<PluginManager>,
}

impl Host {
    pub fn new(config: Config, chat: Arc<dyn Responder>) -> Self {
        let store = Arc::new(FilePluginStore::new(&config.plugins.directory));
        Self::with_store(config, store, chat)
    }

    pub fn with_store(config: Config, store: Arc<dyn PluginStore>, chat: Arc<dyn Responder>) -> Self {
        let logger = HostLogger::new();
        let (events, dispatcher) = event_channel();

        let guard_timeout = config.steam_guard.timeout_secs.map(Duration::from_secs);
        let accounts = Arc::new(
            AccountRegistry::new(config.accounts.iter().map(|a| a.name.clone()), Some(events.clone()))
                .with_guard_timeout(guard_timeout),
        );
        let data = Arc::new(DataManager::new(&config.bot.data_dir, Some(events.clone())));
        let commands = Arc::new(CommandHandler::new(config.bot.prefix.clone(), Arc::clone(&data)));
        commands.register_defaults();

        let plugins = Arc::new(PluginManager::new(HostContext {
            logger: logger.clone(),
            accounts: Arc::clone(&accounts),
            data: Arc::clone(&data),
            command_handler: Arc::clone(&commands),
            store,
            chat,
        }));
        let handle = dispatcher.spawn(Arc::clone(&plugins));

        Self {
            config,
            logger,
            events,
            dispatcher: Mutex::new(Some(handle)),
            accounts,
            data,
            commands,
            plugins,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn logger(&self) -> &HostLogger {
        &self.logger
    }

    /// Response metadata for a console or chat invocation by `caller`
    pub fn response_info(&self, caller: Option<SteamId>) -> ResponseInfo {
        let mut info = ResponseInfo {
            steam_id64: caller,
            ..Default::default()
        }
        .with_prefix(self.config.bot.prefix.clone());

        if let Some(limit) = self.config.bot.char_limit {
            info = info.with_char_limit(limit, CUT_CHARS.to_vec());
        }
        info
    }

    /// Load plugins, then import the data cache so plugins observe the updates.
    /// Storage failures are logged; the host keeps going with what it has.
    pub async fn start(&self) -> usize {
        let loaded = self.plugins.load_all(&self.config.plugins.enabled).await;
        tracing::info!("Plugin system initialized with {} plugins", loaded);

        if let Err(e) = self.data.import_cache().await {
            tracing::error!("Failed to import data cache: {}", e);
        }

        let owners = self.config.owner_ids();
        if !owners.is_empty() {
            if let Err(e) = self.data.import_owner_ids(owners).await {
                tracing::error!("Failed to import owner ids: {}", e);
            }
        }
        if let Err(e) = self.data.export_cache().await {
            tracing::error!("Failed to export data cache: {}", e);
        }
        loaded
    }

    /// Simulated login of every configured account
    pub async fn login_all(&self, prompt: Option<Arc<ConsoleAdapter>>) -> Result<(), BotError> {
        for account in self.accounts.accounts().await {
            let guard = self
                .config
                .accounts
                .get(account.index)
                .map(|a| a.guard)
                .unwrap_or(GuardMode::None);

            let status = match guard {
                GuardMode::None => BotStatus::Online,
                GuardMode::Code => self.await_guard_code(account.index, &account.account_name, prompt.clone()).await?,
                GuardMode::Qr => {
                    let url = format!("https://s.team/q/1/{}", Uuid::new_v4().simple());
                    self.accounts.request_qr_login(account.index, url).await?;
                    BotStatus::Online
                }
            };
            self.accounts.set_status(account.index, status).await?;
        }
        Ok(())
    }

    async fn await_guard_code(
        &self,
        index: usize,
        account_name: &str,
        prompt: Option<Arc<ConsoleAdapter>>,
    ) -> Result<BotStatus, BotError> {
        let (submitter, pending) = self.accounts.request_steam_guard_code(index).await?;

        let prompt_task = prompt.filter(|_| self.config.steam_guard.console_prompt).map(|console| {
            let question = format!("Steam Guard code for {} (empty to skip):", account_name);
            tokio::spawn(async move {
                if let Some(line) = console.read_line(&question).await {
                    submitter.submit(line);
                }
            })
        });

        let code = pending.wait().await;
        if let Some(task) = prompt_task {
            task.abort();
        }

        Ok(match code {
            Some(_) => BotStatus::Online,
            None => {
                tracing::info!("Skipping account {}", account_name);
                BotStatus::Skipped
            }
        })
    }

    /// Deliver queued events, release buffered logs and fire `ready`
    pub async fn ready(&self) {
        self.events.flush().await;
        let replayed = self.logger.mark_ready();
        tracing::debug!("Replayed {} buffered log messages", replayed);
        self.plugins.ready_all().await;
    }

    /// Wait until every event emitted so far reached the plugins
    pub async fn flush_events(&self) -> bool {
        self.events.flush().await
    }

    pub async fn shutdown(&self) {
        self.events.flush().await;
        self.plugins.unload_all().await;
        if let Some(handle) = self.dispatcher.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}
