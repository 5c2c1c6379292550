//! Run history: a bounded per-account record of finished runs, keyed by
//! the run's session timestamp.

use crate::codec::SaveCodec;
use crate::error::SaveResult;
use crate::snapshot::{RunEntry, SessionSaveData};
use crate::store::{keys, SaveStore};
use crate::types::Timestamp;
use std::collections::BTreeMap;

/// Finished runs, ascending by timestamp.
pub type RunHistoryData = BTreeMap<Timestamp, RunEntry>;

/// Insert a run, first evicting the oldest runs until there is room.
/// An entry with the same timestamp is replaced.
pub fn insert_bounded(history: &mut RunHistoryData, entry: SessionSaveData, is_victory: bool, limit: usize) {
    let limit = limit.max(1);
    while history.len() >= limit {
        if let Some((oldest, _)) = history.pop_first() {
            log::debug!("Run history full, evicted run {oldest}");
        }
    }
    let timestamp = entry.timestamp;
    history.insert(timestamp, RunEntry { entry, is_victory, is_favorite: false });
}

pub struct RunHistory<'a> {
    store:    &'a SaveStore,
    codec:    &'a SaveCodec,
    username: &'a str,
    limit:    usize,
}

impl<'a> RunHistory<'a> {
    pub fn new(store: &'a SaveStore, codec: &'a SaveCodec, username: &'a str, limit: usize) -> Self {
        Self { store, codec, username, limit }
    }

    fn key(&self) -> String {
        keys::run_history_key(self.username)
    }

    /// Create the storage record if it does not exist yet.
    pub fn ensure_key(&self) -> SaveResult<()> {
        let key = self.key();
        if !self.store.has_item(&key)? {
            self.store.set_item(&key, "")?;
        }
        Ok(())
    }

    pub fn load(&self) -> SaveResult<RunHistoryData> {
        self.ensure_key()?;
        let raw = self.store.get_item(&self.key())?.unwrap_or_default();
        if raw.is_empty() {
            return Ok(RunHistoryData::new());
        }
        let plain = self.codec.decode(&raw)?;
        Ok(serde_json::from_str(&plain)?)
    }

    fn persist(&self, history: &RunHistoryData) -> SaveResult<()> {
        let plain = serde_json::to_string(history)?;
        self.store.set_item(&self.key(), &self.codec.encode(&plain)?)
    }

    /// Record a finished run.
    pub fn append(&self, entry: SessionSaveData, is_victory: bool) -> SaveResult<()> {
        let mut history = self.load()?;
        insert_bounded(&mut history, entry, is_victory, self.limit);
        self.persist(&history)
    }

    /// Returns false when no run has that timestamp.
    pub fn set_favorite(&self, timestamp: Timestamp, favorite: bool) -> SaveResult<bool> {
        let mut history = self.load()?;
        let Some(run) = history.get_mut(&timestamp) else {
            return Ok(false);
        };
        run.is_favorite = favorite;
        self.persist(&history)?;
        Ok(true)
    }
}
