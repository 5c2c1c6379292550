//! SQLite-backed local storage.
//!
//! RULE: Only the store talks to the database.
//! Everything above it sees a flat key/value namespace: one row per
//! record (system save, per-slot sessions, settings, run history, ...),
//! each holding already-encoded text.

use crate::error::SaveResult;
pub mod keys;
mod slots;
use rusqlite::{params, Connection, OptionalExtension};

pub struct SaveStore {
    conn: Connection,
}

impl SaveStore {
    pub fn open(path: &str) -> SaveResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SaveResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to run repeatedly.
    pub fn migrate(&self) -> SaveResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_local_storage.sql"))?;
        Ok(())
    }

    // ── Key/value access ───────────────────────────

    pub fn get_item(&self, key: &str) -> SaveResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_item(&self, key: &str, value: &str) -> SaveResult<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO local_storage (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    /// Returns whether a row was removed.
    pub fn remove_item(&self, key: &str) -> SaveResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
        Ok(n > 0)
    }

    pub fn has_item(&self, key: &str) -> SaveResult<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM local_storage WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn item_count(&self) -> SaveResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM local_storage", [], |row| row.get(0))?;
        Ok(n)
    }
}
