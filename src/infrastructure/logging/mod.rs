//! Host logger handed to plugins
//!
//! Messages logged before the host is ready are held back and replayed once
//! every account has logged in, so startup output stays readable. Forced
//! messages skip the buffer.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
struct Entry {
    at: DateTime<Local>,
    level: LogLevel,
    source: Option<Arc<str>>,
    message: String,
}

#[derive(Default)]
struct LogBuffer {
    ready: bool,
    entries: Vec<Entry>,
}

/// Cloneable logging sink backed by `tracing`
#[derive(Clone)]
pub struct HostLogger {
    buffer: Arc<Mutex<LogBuffer>>,
    source: Option<Arc<str>>,
}

impl HostLogger {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(LogBuffer::default())),
            source: None,
        }
    }

    /// Same sink, tagging every message with `source`
    pub fn scoped(&self, source: &str) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            source: Some(Arc::from(source)),
        }
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let entry = Entry {
            at: Local::now(),
            level,
            source: self.source.clone(),
            message: message.into(),
        };

        let mut buffer = self.lock();
        if buffer.ready {
            drop(buffer);
            emit(&entry, false);
        } else {
            buffer.entries.push(entry);
        }
    }

    /// Log immediately, even before the host is ready
    pub fn force(&self, level: LogLevel, message: impl Into<String>) {
        let entry = Entry {
            at: Local::now(),
            level,
            source: self.source.clone(),
            message: message.into(),
        };
        emit(&entry, false);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Switch to direct output and replay everything held back so far
    pub fn mark_ready(&self) -> usize {
        let entries = {
            let mut buffer = self.lock();
            buffer.ready = true;
            std::mem::take(&mut buffer.entries)
        };

        for entry in &entries {
            emit(entry, true);
        }
        entries.len()
    }

    pub fn is_ready(&self) -> bool {
        self.lock().ready
    }

    /// Number of messages waiting for `mark_ready`
    pub fn pending(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LogBuffer> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for HostLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn emit(entry: &Entry, replayed: bool) {
    let source = entry.source.as_deref().unwrap_or("host");
    let at = replayed.then(|| entry.at.format("%H:%M:%S").to_string());
    let at = at.as_deref().unwrap_or("");

    match entry.level {
        LogLevel::Debug => tracing::debug!(source, at, "{}", entry.message),
        LogLevel::Info => tracing::info!(source, at, "{}", entry.message),
        LogLevel::Warn => tracing::warn!(source, at, "{}", entry.message),
        LogLevel::Error => tracing::error!(source, at, "{}", entry.message),
    }
}
