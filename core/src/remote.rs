//! Remote save store boundary.
//!
//! The coordinator talks to the account server only through `SaveApi`.
//! Failures are classified into `RemoteError` so callers can tell a new
//! account apart from an overloaded server or a stale session.

use crate::types::SlotId;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("no save data on the server")]
    NotFound,
    #[error("server is over capacity")]
    ServerCapacity,
    #[error("session out of date")]
    SessionOutOfDate,
    #[error("transport failure: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Classify a raw error body returned by the server.
    pub fn from_response(body: &str) -> Self {
        let body = body.trim();
        if body.is_empty() || body.starts_with("sql: no rows in result set") {
            Self::NotFound
        } else if body.contains("Too many connections") {
            Self::ServerCapacity
        } else if body.starts_with("session out of date") {
            Self::SessionOutOfDate
        } else {
            Self::Transport(body.to_string())
        }
    }
}

/// Who is asking, and about which slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiIdentity {
    pub client_session_id: String,
    pub slot:              Option<SlotId>,
    pub trainer_id:        Option<u32>,
    pub secret_id:         Option<u32>,
}

impl ApiIdentity {
    pub fn new(client_session_id: impl Into<String>) -> Self {
        Self {
            client_session_id: client_session_id.into(),
            slot:              None,
            trainer_id:        None,
            secret_id:         None,
        }
    }

    pub fn with_slot(mut self, slot: SlotId) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_account(mut self, trainer_id: u32, secret_id: u32) -> Self {
        self.trainer_id = Some(trainer_id);
        self.secret_id = Some(secret_id);
        self
    }
}

/// Remote save endpoints. Payloads are serialized JSON strings.
#[async_trait]
pub trait SaveApi: Send + Sync {
    async fn get_system(&self, id: &ApiIdentity) -> Result<Option<String>, RemoteError>;
    async fn update_system(&self, id: &ApiIdentity, system: &str) -> Result<(), RemoteError>;
    /// `Some(snapshot)` when another client holds a newer system save.
    async fn verify_system(&self, id: &ApiIdentity) -> Result<Option<String>, RemoteError>;
    async fn get_session(&self, id: &ApiIdentity) -> Result<Option<String>, RemoteError>;
    async fn update_session(&self, id: &ApiIdentity, session: &str) -> Result<(), RemoteError>;
    async fn delete_session(&self, id: &ApiIdentity) -> Result<(), RemoteError>;
    /// Clear a finished session. Returns whether this was a first clear.
    async fn clear_session(&self, id: &ApiIdentity, session: &str) -> Result<bool, RemoteError>;
    async fn update_all(&self, id: &ApiIdentity, system: &str, session: &str) -> Result<(), RemoteError>;
}

/// Used when the game runs without an account server. Every call fails;
/// offline coordinators never make one.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineSaveApi;

fn offline() -> RemoteError {
    RemoteError::Transport("offline".into())
}

#[async_trait]
impl SaveApi for OfflineSaveApi {
    async fn get_system(&self, _: &ApiIdentity) -> Result<Option<String>, RemoteError> { Err(offline()) }
    async fn update_system(&self, _: &ApiIdentity, _: &str) -> Result<(), RemoteError> { Err(offline()) }
    async fn verify_system(&self, _: &ApiIdentity) -> Result<Option<String>, RemoteError> { Err(offline()) }
    async fn get_session(&self, _: &ApiIdentity) -> Result<Option<String>, RemoteError> { Err(offline()) }
    async fn update_session(&self, _: &ApiIdentity, _: &str) -> Result<(), RemoteError> { Err(offline()) }
    async fn delete_session(&self, _: &ApiIdentity) -> Result<(), RemoteError> { Err(offline()) }
    async fn clear_session(&self, _: &ApiIdentity, _: &str) -> Result<bool, RemoteError> { Err(offline()) }
    async fn update_all(&self, _: &ApiIdentity, _: &str, _: &str) -> Result<(), RemoteError> { Err(offline()) }
}

// ── In-memory server ───────────────────────────────

#[derive(Default)]
struct MemoryState {
    system:        Option<String>,
    sessions:      BTreeMap<SlotId, String>,
    conflict:      Option<String>,
    fail_next:     Option<RemoteError>,
    cleared_seeds: BTreeSet<String>,
    calls:         Vec<&'static str>,
}

/// In-process account server for tests and tools, with fault injection.
#[derive(Default)]
pub struct MemorySaveApi {
    state: Mutex<MemoryState>,
}

impl MemorySaveApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and return an injected failure if one is queued.
    fn enter(&self, call: &'static str) -> Result<std::sync::MutexGuard<'_, MemoryState>, RemoteError> {
        let mut state = self.state();
        state.calls.push(call);
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    pub fn set_system(&self, system: Option<String>) {
        self.state().system = system;
    }

    pub fn system(&self) -> Option<String> {
        self.state().system.clone()
    }

    pub fn set_session(&self, slot: SlotId, session: Option<String>) {
        let mut state = self.state();
        match session {
            Some(s) => state.sessions.insert(slot, s),
            None => state.sessions.remove(&slot),
        };
    }

    pub fn session(&self, slot: SlotId) -> Option<String> {
        self.state().sessions.get(&slot).cloned()
    }

    /// Make the next call fail with `err`.
    pub fn fail_next(&self, err: RemoteError) {
        self.state().fail_next = Some(err);
    }

    /// Make verification report a newer save held elsewhere.
    pub fn set_conflict(&self, snapshot: Option<String>) {
        self.state().conflict = snapshot;
    }

    /// Names of the endpoints called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }
}

fn seed_of(session: &str) -> String {
    serde_json::from_str::<serde_json::Value>(session)
        .ok()
        .and_then(|v| v.get("seed").and_then(|s| s.as_str()).map(str::to_string))
        .unwrap_or_default()
}

#[async_trait]
impl SaveApi for MemorySaveApi {
    async fn get_system(&self, _: &ApiIdentity) -> Result<Option<String>, RemoteError> {
        Ok(self.enter("get_system")?.system.clone())
    }

    async fn update_system(&self, _: &ApiIdentity, system: &str) -> Result<(), RemoteError> {
        self.enter("update_system")?.system = Some(system.to_string());
        Ok(())
    }

    async fn verify_system(&self, _: &ApiIdentity) -> Result<Option<String>, RemoteError> {
        Ok(self.enter("verify_system")?.conflict.clone())
    }

    async fn get_session(&self, id: &ApiIdentity) -> Result<Option<String>, RemoteError> {
        let state = self.enter("get_session")?;
        Ok(state.sessions.get(&id.slot.unwrap_or(0)).cloned())
    }

    async fn update_session(&self, id: &ApiIdentity, session: &str) -> Result<(), RemoteError> {
        self.enter("update_session")?
            .sessions
            .insert(id.slot.unwrap_or(0), session.to_string());
        Ok(())
    }

    async fn delete_session(&self, id: &ApiIdentity) -> Result<(), RemoteError> {
        self.enter("delete_session")?.sessions.remove(&id.slot.unwrap_or(0));
        Ok(())
    }

    async fn clear_session(&self, id: &ApiIdentity, session: &str) -> Result<bool, RemoteError> {
        let mut state = self.enter("clear_session")?;
        state.sessions.remove(&id.slot.unwrap_or(0));
        Ok(state.cleared_seeds.insert(seed_of(session)))
    }

    async fn update_all(&self, id: &ApiIdentity, system: &str, session: &str) -> Result<(), RemoteError> {
        let mut state = self.enter("update_all")?;
        state.system = Some(system.to_string());
        state.sessions.insert(id.slot.unwrap_or(0), session.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bodies_are_classified() {
        assert_eq!(RemoteError::from_response(""), RemoteError::NotFound);
        assert_eq!(RemoteError::from_response("sql: no rows in result set"), RemoteError::NotFound);
        assert_eq!(RemoteError::from_response("Error 1040: Too many connections"), RemoteError::ServerCapacity);
        assert_eq!(RemoteError::from_response("session out of date\n"), RemoteError::SessionOutOfDate);
        assert_eq!(RemoteError::from_response("bad gateway"), RemoteError::Transport("bad gateway".into()));
    }

    #[tokio::test]
    async fn injected_failure_hits_one_call() {
        let api = MemorySaveApi::new();
        let id = ApiIdentity::new("client").with_slot(1);
        api.fail_next(RemoteError::ServerCapacity);
        assert_eq!(api.get_session(&id).await, Err(RemoteError::ServerCapacity));
        assert_eq!(api.get_session(&id).await, Ok(None));
        assert_eq!(api.calls(), vec!["get_session", "get_session"]);
    }
}
