//! Shared primitive types used across the persistence core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A species identifier (national dex number).
pub type SpeciesId = u32;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// A numbered session save slot. Slot 0 is the default slot.
pub type SlotId = u8;

/// The categories of persisted data. Each has its own storage key and,
/// for system/session/settings, its own schema version history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveCategory {
    System,
    Session,
    Settings,
    Tutorials,
    SeenDialogues,
    RunHistory,
}

impl SaveCategory {
    /// Base storage key, before user scoping.
    pub fn data_key(&self, slot: SlotId) -> String {
        match self {
            Self::System => "data".to_string(),
            Self::Session if slot == 0 => "sessionData".to_string(),
            Self::Session => format!("sessionData{slot}"),
            Self::Settings => "settings".to_string(),
            Self::Tutorials => "tutorials".to_string(),
            Self::SeenDialogues => "seenDialogues".to_string(),
            Self::RunHistory => "runHistoryData".to_string(),
        }
    }

    /// Name shown to the player in import/export messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Session => "session",
            Self::Settings => "settings",
            Self::Tutorials => "tutorials",
            Self::SeenDialogues => "seen dialogues",
            Self::RunHistory => "run history",
        }
    }

    /// System and session data are mirrored to the remote store.
    pub fn is_account_data(&self) -> bool {
        matches!(self, Self::System | Self::Session)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "system" | "data" => Some(Self::System),
            "session" => Some(Self::Session),
            "settings" => Some(Self::Settings),
            "tutorials" => Some(Self::Tutorials),
            "seen_dialogues" | "dialogues" => Some(Self::SeenDialogues),
            "run_history" | "history" => Some(Self::RunHistory),
            _ => None,
        }
    }
}

impl fmt::Display for SaveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
