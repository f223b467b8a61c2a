//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;
use crate::domain::entities::SteamId;

/// Host configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub plugins: PluginConfig,
    pub steam_guard: SteamGuardConfig,
    pub logging: LoggingConfig,
    pub accounts: Vec<AccountConfig>,
    /// Owner SteamID64s, in priority order
    pub owners: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
    /// Directory holding the host's data cache
    pub data_dir: PathBuf,
    /// Split responses longer than this many characters
    pub char_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginConfig {
    /// Root of per-plugin config and data directories
    pub directory: PathBuf,
    /// Built-in plugins to load, in order
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SteamGuardConfig {
    /// Skip an account whose code was not submitted in time; `None` waits forever
    pub timeout_secs: Option<u64>,
    /// Ask for codes on stdin in addition to plugins
    pub console_prompt: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub level: String,
}

/// How an account authenticates in the simulated login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    None,
    Code,
    Qr,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AccountConfig {
    pub name: String,
    pub guard: GuardMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "steambot".to_string(),
                prefix: "!".to_string(),
                data_dir: PathBuf::from("./data"),
                char_limit: Some(750),
            },
            plugins: PluginConfig {
                directory: PathBuf::from("./plugins"),
                enabled: vec!["template".to_string()],
            },
            steam_guard: SteamGuardConfig {
                timeout_secs: None,
                console_prompt: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            accounts: vec![AccountConfig {
                name: "bot0".to_string(),
                guard: GuardMode::None,
            }],
            owners: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.trim().is_empty() {
            return Err(ConfigError::MissingField("bot.prefix".to_string()));
        }
        if self.accounts.is_empty() {
            return Err(ConfigError::MissingField("accounts".to_string()));
        }
        for (i, account) in self.accounts.iter().enumerate() {
            if self.accounts[..i].iter().any(|a| a.name == account.name) {
                return Err(ConfigError::InvalidValue(format!("duplicate account name: {}", account.name)));
            }
        }
        Ok(())
    }

    /// Owner ids that parse as SteamID64, warning about the rest
    pub fn owner_ids(&self) -> Vec<SteamId> {
        self.owners
            .iter()
            .filter_map(|raw| match raw.parse::<SteamId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!("Ignoring owner {:?}: {}", raw, e);
                    None
                }
            })
            .collect()
    }

    /// Environment overrides on top of a loaded config
    pub fn apply_env(&mut self) {
        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }

        if let Ok(owners) = std::env::var("BOT_OWNERS") {
            self.owners = owners
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }
}
