//! # Snapshot Store
//!
//! Persists the vote record as a whole-object JSON snapshot (overwrite, never append).
//! A missing or undecodable file reads as "no prior vote".

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::application::state::VoteRecord;

/// Durable slot holding the single vote record.
pub trait SnapshotStore: Send + Sync {
    /// Returns `None` when the slot is empty or unreadable.
    fn load(&self) -> Option<VoteRecord>;

    /// Overwrites the slot with `record`.
    fn save(&self, record: &VoteRecord) -> Result<()>;
}

/// Snapshot kept in a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Option<VoteRecord> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Can't open snapshot {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<VoteRecord>(&content) {
            Ok(record) => {
                tracing::info!("Snapshot {} loaded", self.path.display());
                Some(record)
            }
            Err(e) => {
                tracing::error!("Can't decode snapshot {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&self, record: &VoteRecord) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(record).context("Failed to encode snapshot")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

/// Snapshot kept in memory only, for runs without a save file.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<VoteRecord>>,
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Option<VoteRecord> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn save(&self, record: &VoteRecord) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("snapshot slot poisoned"))?;
        *slot = Some(record.clone());
        Ok(())
    }
}

/// Loads the record for `chat_id`, falling back to a fresh one.
///
/// A stored record that belongs to another chat is discarded. A fresh record is
/// saved right away so the slot always matches the configured chat.
pub fn restore(store: &dyn SnapshotStore, chat_id: i64) -> VoteRecord {
    if let Some(record) = store.load() {
        if record.chat_id == chat_id {
            return record;
        }
        tracing::warn!(
            "Snapshot belongs to chat {}, configured chat is {}; starting fresh",
            record.chat_id,
            chat_id
        );
    }
    let record = VoteRecord::new(chat_id);
    if let Err(e) = store.save(&record) {
        tracing::warn!("Failed to save fresh vote record: {:#}", e);
    }
    record
}
