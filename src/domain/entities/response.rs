use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::SteamId;

/// Metadata travelling with a command invocation to its response path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseInfo {
    /// Who invoked the command and who receives the response
    pub steam_id64: Option<SteamId>,
    /// Prefix shown in usage hints
    pub cmd_prefix: String,
    /// The recipient id comes from a group chat channel rather than the caller
    pub from_steam_chat: bool,
    /// Replaces the cached owner list for this invocation
    pub owner_ids: Option<Vec<SteamId>>,
    pub char_limit: Option<usize>,
    pub cut_chars: Vec<char>,
    /// When the host received the message; stamped by `run_command` if unset
    pub received_at: Option<Instant>,
}

impl ResponseInfo {
    pub fn new(steam_id64: SteamId) -> Self {
        Self {
            steam_id64: Some(steam_id64),
            cmd_prefix: "!".to_string(),
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cmd_prefix = prefix.into();
        self
    }

    pub fn with_owner_ids(mut self, owners: Vec<SteamId>) -> Self {
        self.owner_ids = Some(owners);
        self
    }

    pub fn with_char_limit(mut self, limit: usize, cut_chars: Vec<char>) -> Self {
        self.char_limit = Some(limit);
        self.cut_chars = cut_chars;
        self
    }

    pub fn from_chat(mut self) -> Self {
        self.from_steam_chat = true;
        self
    }

    /// Split a response into messages that fit `char_limit`.
    ///
    /// Each part breaks after the last cut character inside the limit, or hard
    /// at the limit when the window holds none.
    pub fn split_response(&self, text: &str) -> Vec<String> {
        let Some(limit) = self.char_limit.filter(|l| *l > 0) else {
            return vec![text.to_string()];
        };

        let chars: Vec<char> = text.chars().collect();
        let mut parts = Vec::new();
        let mut start = 0;

        while chars.len() - start > limit {
            let window = &chars[start..start + limit];
            let cut = window
                .iter()
                .rposition(|c| self.cut_chars.contains(c))
                .map(|i| i + 1)
                .unwrap_or(limit);

            parts.push(window[..cut].iter().collect::<String>());
            start += cut;
        }

        if start < chars.len() || parts.is_empty() {
            parts.push(chars[start..].iter().collect());
        }
        parts
    }
}

/// Why `run_command` refused to execute a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunRejection {
    NotFound,
    OwnersOnly,
}

/// Outcome of a programmatic command invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    pub reason: Option<RunRejection>,
    pub message: Option<String>,
}

impl RunResult {
    pub fn accepted() -> Self {
        Self {
            success: true,
            reason: None,
            message: None,
        }
    }

    pub fn rejected(reason: RunRejection, message: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            message: Some(message.into()),
        }
    }
}
