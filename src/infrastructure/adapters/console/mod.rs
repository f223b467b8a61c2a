//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use crate::domain::entities::ResponseInfo;
use crate::domain::traits::Responder;
use crate::application::errors::BotError;

/// Console front end standing in for Steam chat
pub struct ConsoleAdapter {
    name: String,
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsoleAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Next trimmed line from stdin, `None` on EOF
    pub async fn read_line(&self, prompt: &str) -> Option<String> {
        if !prompt.is_empty() {
            println!("{}", prompt);
        }
        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read console input: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Responder for ConsoleAdapter {
    async fn respond(&self, res_info: &ResponseInfo, text: &str) -> Result<(), BotError> {
        let recipient = recipient_label(res_info);
        for part in res_info.split_response(text) {
            println!("[{} -> {}] {}", self.name, recipient, part);
        }
        Ok(())
    }
}

/// Where a reply goes: the caller, or the group chat it was sent from
fn recipient_label(res_info: &ResponseInfo) -> String {
    let id = res_info
        .steam_id64
        .map(|id| id.to_string())
        .unwrap_or_else(|| "console".to_string());

    if res_info.from_steam_chat {
        format!("group chat of {}", id)
    } else {
        id
    }
}
