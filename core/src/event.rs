//! Notifications raised by the save core.
//!
//! RULE: The save core never drives presentation or game flow itself.
//! Anything the surrounding game must react to (a new starter message, a
//! reload after a save conflict) is queued as an event for the caller to
//! drain.

use crate::types::SpeciesId;
use serde::{Deserialize, Serialize};

/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SaveEvent {
    // ── Dex events ─────────────────────────────────
    StarterUnlocked {
        species_id: SpeciesId,
    },
    CandyAwarded {
        species_id: SpeciesId,
        amount:     u32,
    },
    EggMoveUnlocked {
        species_id: SpeciesId,
        index:      u8,
        rare:       bool,
    },
    AchievementUnlocked {
        achievement: String,
    },

    // ── Persistence events ─────────────────────────
    /// Pending game phases must be discarded before the reload.
    PhaseQueueCleared,
    /// The game must reload. `snapshot` carries the authoritative remote
    /// system data when a conflict was detected.
    ReloadScheduled {
        snapshot: Option<String>,
    },
    /// User-visible message.
    Notice {
        message: String,
    },
}
