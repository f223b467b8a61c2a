//! Template plugin
//!
//! Shows the shape of a plugin: it registers a `hello` command, echoes bot
//! status changes to the log, keeps a small data file between runs and
//! skips Steam Guard prompts nobody answers in time.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::application::errors::{CommandError, PluginResult};
use crate::domain::entities::{BotAccount, BotStatus, CodeSubmitter, Command, Invocation, ResponseInfo};
use crate::infrastructure::logging::{HostLogger, LogLevel};
use crate::plugins::handle::SystemHandle;
use crate::plugins::trait_def::Plugin;

pub const NAME: &str = "template";

/// Data file written on load and read back on ready
const LAST_LOAD_KEY: &str = "lastload.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    /// Reply of the `hello` command
    pub greeting: String,
    /// Skip an account after this long without a Steam Guard code
    pub guard_timeout_secs: u64,
    /// Run `ping` as the first owner once ready
    pub ping_first_owner: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello world!".to_string(),
            guard_timeout_secs: 90,
            ping_first_owner: true,
        }
    }
}

pub struct TemplatePlugin {
    sys: SystemHandle,
    logger: HostLogger,
    config: Arc<RwLock<TemplateConfig>>,
    guard_timers: Mutex<Vec<JoinHandle<()>>>,
}

impl TemplatePlugin {
    pub fn new(sys: SystemHandle) -> Self {
        Self {
            logger: sys.logger.clone(),
            sys,
            config: Arc::new(RwLock::new(TemplateConfig::default())),
            guard_timers: Mutex::new(Vec::new()),
        }
    }

    pub fn factory(sys: SystemHandle) -> Arc<dyn Plugin> {
        Arc::new(Self::new(sys))
    }

    pub async fn config(&self) -> TemplateConfig {
        self.config.read().await.clone()
    }

    async fn load_config(&self) {
        let defaults = match serde_json::to_value(TemplateConfig::default()) {
            Ok(v) => v,
            Err(e) => {
                self.logger.error(format!("Template Plugin: cannot serialize default config: {}", e));
                return;
            }
        };

        let loaded = self
            .sys
            .load_plugin_config(&defaults)
            .await
            .map_err(|e| e.to_string())
            .and_then(|v| serde_json::from_value::<TemplateConfig>(v).map_err(|e| e.to_string()));

        match loaded {
            Ok(config) => *self.config.write().await = config,
            Err(e) => self
                .logger
                .error(format!("Template Plugin: failed to load config, using defaults: {}", e)),
        }
    }

    fn track_timer(&self, handle: JoinHandle<()>) {
        let mut timers = self.guard_timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.retain(|t| !t.is_finished());
        timers.push(handle);
    }
}

#[async_trait]
impl Plugin for TemplatePlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Example plugin demonstrating the plugin hooks"
    }

    async fn load(&self) -> PluginResult<()> {
        self.logger.info("Hello World!");

        self.load_config().await;

        let config = Arc::clone(&self.config);
        let registered = self.sys.register_command(
            Command::new("hello")
                .with_alias("cool-alias")
                .with_description("Responds with Hello World!")
                .owners_only(false)
                .with_handler(move |inv: Invocation| {
                    let config = Arc::clone(&config);
                    async move {
                        let greeting = config.read().await.greeting.clone();
                        inv.respond(&greeting).await?;
                        Ok::<(), CommandError>(())
                    }
                }),
        );
        if !registered {
            self.logger.warn("Template Plugin: command 'hello' is already taken");
        }

        let stamp = Utc::now().to_rfc3339();
        if let Err(e) = self.sys.write_plugin_data(LAST_LOAD_KEY, stamp.as_bytes()).await {
            self.logger.error(format!("Template Plugin: failed to write {}: {}", LAST_LOAD_KEY, e));
        }
        Ok(())
    }

    async fn ready(&self) -> PluginResult<()> {
        self.logger.info("I am the plugin and we seem to be ready!");

        match self.sys.load_plugin_data(LAST_LOAD_KEY).await {
            Ok(bytes) => self.logger.info(format!(
                "Template Plugin: loaded at {}",
                String::from_utf8_lossy(&bytes)
            )),
            Err(e) => self.logger.warn(format!("Template Plugin: no load stamp: {}", e)),
        }

        if !self.config.read().await.ping_first_owner {
            return Ok(());
        }

        // Pretend the first owner used the ping command
        let Some(owner) = self.sys.data.first_owner().await else {
            self.logger.warn("Template Plugin: no owner configured, not running ping");
            return Ok(());
        };

        let res_info = ResponseInfo::new(owner).with_prefix(self.sys.command_handler.prefix());
        let result = self
            .sys
            .command_handler
            .run_command("ping", vec![], Arc::clone(&self.sys.chat), res_info)
            .await;

        if !result.success {
            self.logger.warn(format!(
                "Template Plugin: ping was refused ({:?}): {}",
                result.reason,
                result.message.unwrap_or_default()
            ));
        }
        Ok(())
    }

    async fn unload(&self) -> PluginResult<()> {
        let timers = std::mem::take(&mut *self.guard_timers.lock().unwrap_or_else(|e| e.into_inner()));
        for timer in timers {
            timer.abort();
        }
        self.logger.info("Template Plugin: unloaded");
        Ok(())
    }

    async fn status_update(&self, bot: &BotAccount, old: BotStatus, new: BotStatus) {
        self.logger.info(format!(
            "Template Plugin: Bot with index {} changed status from {} to {}!",
            bot.index, old, new
        ));
    }

    async fn steam_guard_input(&self, bot: &BotAccount, submitter: CodeSubmitter) {
        self.logger.force(
            LogLevel::Info,
            format!("Template Plugin: Bot with index {} requested a Steam Guard Code!", bot.index),
        );

        // Nothing here can answer the prompt, so only bound how long it may stall
        let timeout = Duration::from_secs(self.config.read().await.guard_timeout_secs);
        let logger = self.logger.clone();
        let index = bot.index;
        self.track_timer(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if submitter.submit("") {
                logger.force(
                    LogLevel::Warn,
                    format!("Template Plugin: no Steam Guard code for bot {} after {:?}, skipping it", index, timeout),
                );
            }
        }));
    }

    async fn steam_guard_qr_code(&self, bot: &BotAccount, challenge_url: &str) {
        self.logger.force(
            LogLevel::Info,
            format!("Template Plugin: Bot with index {} wants a QR code scanned: {}", bot.index, challenge_url),
        );
    }

    async fn data_update(&self, key: &str, old: Option<&serde_json::Value>, new: &serde_json::Value) {
        let direction = if old.is_some() { "imported" } else { "exported" };
        self.logger.debug(format!("Template Plugin: {} {}: {}", direction, key, new));
    }
}
