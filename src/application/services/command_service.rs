use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::application::errors::CommandError;
use crate::application::services::DataManager;
use crate::domain::entities::{Command, CommandRegistry, Invocation, ResponseInfo, RunRejection, RunResult};
use crate::domain::traits::Responder;

const OWNERS_ONLY_MESSAGE: &str = "This command can only be used by the owners of this bot.";

/// Host command handler: registration and invocation of chat commands
pub struct CommandHandler {
    registry: Arc<RwLock<CommandRegistry>>,
    data: Arc<DataManager>,
    prefix: String,
}

impl CommandHandler {
    pub fn new(prefix: impl Into<String>, data: Arc<DataManager>) -> Self {
        Self {
            registry: Arc::new(RwLock::new(CommandRegistry::new())),
            data,
            prefix: prefix.into(),
        }
    }

    /// Register a command; `false` if any of its names is already taken
    pub fn register_command(&self, command: Command) -> bool {
        let name = command.name().to_string();
        let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());

        match registry.register(command) {
            Ok(()) => {
                tracing::debug!("Registered command '{}'", name);
                true
            }
            Err(e) => {
                tracing::warn!("Rejected command '{}': {}", name, e);
                false
            }
        }
    }

    pub fn unregister_command(&self, name: &str) -> bool {
        let removed = self
            .registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .unregister(name);
        removed.is_some()
    }

    /// Drop every command a plugin registered
    pub fn unregister_owned_by(&self, plugin: &str) -> usize {
        self.registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .unregister_owned_by(plugin)
    }

    pub fn command_names(&self) -> Vec<String> {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .all()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Run a command as if `res_info.steam_id64` had typed it.
    ///
    /// Rejections are decided before the run function is called, so the
    /// responder never fires for a result with `success == false`.
    pub async fn run_command(
        &self,
        name: &str,
        args: Vec<String>,
        responder: Arc<dyn Responder>,
        mut res_info: ResponseInfo,
    ) -> RunResult {
        res_info.received_at.get_or_insert_with(Instant::now);

        let command = self
            .registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .find(name)
            .cloned();

        let Some(command) = command else {
            tracing::debug!("runCommand: no command named '{}'", name);
            return RunResult::rejected(RunRejection::NotFound, format!("Command {}{} not found", self.prefix, name));
        };

        if command.owners_only && !self.caller_is_owner(&res_info).await {
            tracing::debug!("runCommand: '{}' refused for non-owner {:?}", name, res_info.steam_id64);
            return RunResult::rejected(RunRejection::OwnersOnly, OWNERS_ONLY_MESSAGE);
        }

        let invocation = Invocation {
            steam_id64: res_info.steam_id64,
            args,
            responder,
            res_info,
        };

        match &command.run {
            Some(run) => {
                if let Err(e) = run(invocation.clone()).await {
                    tracing::error!("Command '{}' failed: {}", command.name(), e);
                    if let Err(e) = invocation.respond(&format!("Error: {}", e)).await {
                        tracing::error!("Failed to deliver error for '{}': {}", command.name(), e);
                    }
                }
            }
            None => {
                if let Err(e) = invocation
                    .respond(&format!("Command {} not implemented", command.name()))
                    .await
                {
                    tracing::error!("Failed to deliver reply for '{}': {}", command.name(), e);
                }
            }
        }
        RunResult::accepted()
    }

    async fn caller_is_owner(&self, res_info: &ResponseInfo) -> bool {
        let Some(caller) = res_info.steam_id64 else {
            return false;
        };
        match &res_info.owner_ids {
            Some(owners) => owners.contains(&caller),
            None => self.data.is_owner(caller).await,
        }
    }

    /// Host built-ins: ping and help
    pub fn register_defaults(&self) {
        self.register_command(
            Command::new("ping")
                .with_description("Checks that the bot responds")
                .owners_only(true)
                .with_handler(|inv: Invocation| async move {
                    let elapsed = inv.res_info.received_at.map(|at| at.elapsed()).unwrap_or_default();
                    inv.respond(&format!("Pong! 🏓 ({} ms)", elapsed.as_millis())).await?;
                    Ok::<(), CommandError>(())
                }),
        );

        let registry = Arc::clone(&self.registry);
        let data = Arc::clone(&self.data);
        let prefix = self.prefix.clone();
        self.register_command(
            Command::new("help")
                .with_alias("commands")
                .with_description("Lists the commands you can use")
                .with_handler(move |inv: Invocation| {
                    let registry = Arc::clone(&registry);
                    let data = Arc::clone(&data);
                    let prefix = prefix.clone();
                    async move {
                        let is_owner = match (inv.steam_id64, &inv.res_info.owner_ids) {
                            (Some(id), Some(owners)) => owners.contains(&id),
                            (Some(id), None) => data.is_owner(id).await,
                            (None, _) => false,
                        };
                        let text = help_text(&registry, &prefix, is_owner)?;
                        inv.respond(&text).await?;
                        Ok::<(), CommandError>(())
                    }
                }),
        );
    }
}

fn help_text(registry: &RwLock<CommandRegistry>, prefix: &str, is_owner: bool) -> Result<String, CommandError> {
    let registry = registry
        .read()
        .map_err(|_| CommandError::ExecutionFailed("Lock poisoned".to_string()))?;

    let mut help = "Available commands:\n".to_string();
    for cmd in registry.all().filter(|c| is_owner || !c.owners_only) {
        help.push_str(&format!("  {}{} - {}\n", prefix, cmd.names.join(", "), cmd.description.as_deref().unwrap_or("")));
    }
    Ok(help)
}
