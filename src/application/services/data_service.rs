//! Host data cache - owner ids and other persisted state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::application::messaging::EventSender;
use crate::domain::entities::{HostEvent, SteamId};

const CACHE_FILE: &str = "cache.json";

/// Tracked key for the owner list in `dataUpdate` events
pub const OWNER_ID_KEY: &str = "ownerid";

/// Contents of `cache.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFile {
    #[serde(default)]
    pub ownerid: Vec<SteamId>,
    #[serde(default)]
    pub last_export: Option<DateTime<Utc>>,
}

/// Accessor for cached host data
pub struct DataManager {
    cache_path: PathBuf,
    cache: RwLock<CacheFile>,
    events: Option<EventSender>,
}

impl DataManager {
    pub fn new(data_dir: impl AsRef<Path>, events: Option<EventSender>) -> Self {
        Self {
            cache_path: data_dir.as_ref().join(CACHE_FILE),
            cache: RwLock::new(CacheFile::default()),
            events,
        }
    }

    pub async fn cachefile(&self) -> CacheFile {
        self.cache.read().await.clone()
    }

    /// Owner ids in configured order
    pub async fn owner_ids(&self) -> Vec<SteamId> {
        self.cache.read().await.ownerid.clone()
    }

    pub async fn first_owner(&self) -> Option<SteamId> {
        self.cache.read().await.ownerid.first().copied()
    }

    pub async fn is_owner(&self, id: SteamId) -> bool {
        self.cache.read().await.ownerid.contains(&id)
    }

    /// Read `cache.json` if present. A missing file leaves the cache untouched.
    pub async fn import_cache(&self) -> Result<bool, StorageError> {
        let content = match tokio::fs::read_to_string(&self.cache_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No cache file at {}", self.cache_path.display());
                return Ok(false);
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        let imported: CacheFile = serde_json::from_str(&content)?;
        let new_owners = imported.ownerid.clone();
        let old_owners = {
            let mut cache = self.cache.write().await;
            std::mem::replace(&mut *cache, imported).ownerid
        };

        self.emit_owner_update(Some(old_owners.as_slice()), &new_owners)?;
        Ok(true)
    }

    /// Replace the owner list, e.g. with the ids from config
    pub async fn import_owner_ids(&self, ids: Vec<SteamId>) -> Result<(), StorageError> {
        let old = {
            let mut cache = self.cache.write().await;
            std::mem::replace(&mut cache.ownerid, ids.clone())
        };
        self.emit_owner_update(Some(old.as_slice()), &ids)
    }

    /// Write `cache.json` and announce the exported values
    pub async fn export_cache(&self) -> Result<(), StorageError> {
        let snapshot = {
            let mut cache = self.cache.write().await;
            cache.last_export = Some(Utc::now());
            cache.clone()
        };

        if let Some(parent) = self.cache_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(&self.cache_path, content).await?;
        tracing::debug!("Exported cache to {}", self.cache_path.display());

        self.emit_owner_update(None, &snapshot.ownerid)
    }

    fn emit_owner_update(&self, old: Option<&[SteamId]>, new: &[SteamId]) -> Result<(), StorageError> {
        let Some(events) = &self.events else {
            return Ok(());
        };

        let old = old.map(serde_json::to_value).transpose()?;
        let new = serde_json::to_value(new)?;
        events.emit(HostEvent::DataUpdate {
            key: OWNER_ID_KEY.to_string(),
            old,
            new,
        });
        Ok(())
    }
}
