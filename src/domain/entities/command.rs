use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::application::errors::CommandError;
use crate::domain::entities::{ResponseInfo, SteamId};
use crate::domain::traits::Responder;

/// Everything a command's run function receives
#[derive(Clone)]
pub struct Invocation {
    pub steam_id64: Option<SteamId>,
    pub args: Vec<String>,
    pub responder: Arc<dyn Responder>,
    pub res_info: ResponseInfo,
}

impl Invocation {
    /// Send text back through the invocation's response path
    pub async fn respond(&self, text: &str) -> Result<(), CommandError> {
        self.responder
            .respond(&self.res_info, text)
            .await
            .map_err(|e| CommandError::ExecutionFailed(e.to_string()))
    }
}

pub type CommandFuture = Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send>>;

/// Command run function type
pub type CommandRun = Arc<dyn Fn(Invocation) -> CommandFuture + Send + Sync>;

/// A registered chat command and its aliases
#[derive(Clone)]
pub struct Command {
    pub names: Vec<String>,
    pub description: Option<String>,
    pub owners_only: bool,
    pub run: Option<CommandRun>,
    /// Plugin that registered the command, `None` for host built-ins
    pub owner: Option<String>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
            description: None,
            owners_only: false,
            run: None,
            owner: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.names.push(alias.into());
        self
    }

    pub fn owners_only(mut self, owners_only: bool) -> Self {
        self.owners_only = owners_only;
        self
    }

    pub fn with_owner(mut self, plugin: impl Into<String>) -> Self {
        self.owner = Some(plugin.into());
        self
    }

    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
    {
        let run: CommandRun = Arc::new(move |inv| -> CommandFuture { Box::pin(handler(inv)) });
        self.run = Some(run);
        self
    }

    /// Primary name, the first alias
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    pub fn matches(&self, input: &str) -> bool {
        let input_lower = input.to_lowercase();
        self.names.iter().any(|n| n.to_lowercase() == input_lower)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("names", &self.names)
            .field("description", &self.description)
            .field("owners_only", &self.owners_only)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Command registry keyed by lowercase alias
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
    aliases: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. Fails without side effects when any alias is taken.
    pub fn register(&mut self, command: Command) -> Result<(), CommandError> {
        if command.names.is_empty() || command.names.iter().any(|n| n.trim().is_empty()) {
            return Err(CommandError::InvalidArgs("command needs at least one non-empty name".to_string()));
        }

        let mut keys: Vec<String> = Vec::with_capacity(command.names.len());
        for name in &command.names {
            let key = name.to_lowercase();
            if self.aliases.contains_key(&key) || keys.contains(&key) {
                return Err(CommandError::Duplicate(name.clone()));
            }
            keys.push(key);
        }

        let idx = self.commands.len();
        self.commands.push(command);
        for key in keys {
            self.aliases.insert(key, idx);
        }
        Ok(())
    }

    /// Remove the command owning `name` together with all its aliases
    pub fn unregister(&mut self, name: &str) -> Option<Command> {
        let idx = *self.aliases.get(&name.to_lowercase())?;
        Some(self.remove_at(idx))
    }

    /// Remove every command registered by `plugin`, returning how many were dropped
    pub fn unregister_owned_by(&mut self, plugin: &str) -> usize {
        let mut removed = 0;
        while let Some(idx) = self.commands.iter().position(|c| c.owner.as_deref() == Some(plugin)) {
            self.remove_at(idx);
            removed += 1;
        }
        removed
    }

    fn remove_at(&mut self, idx: usize) -> Command {
        let command = self.commands.remove(idx);
        self.aliases.clear();
        for (i, cmd) in self.commands.iter().enumerate() {
            for name in &cmd.names {
                self.aliases.insert(name.to_lowercase(), i);
            }
        }
        command
    }

    pub fn find(&self, input: &str) -> Option<&Command> {
        self.aliases.get(&input.to_lowercase()).map(|&i| &self.commands[i])
    }

    pub fn all(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
