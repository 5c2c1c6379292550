//! Serialized save shapes: the system save, session saves, and the
//! modifier and trainer records inside them.
//!
//! Field names are camelCase on the wire. Nested game objects this crate
//! does not interpret (party members, arena, eggs) stay as raw JSON.

use crate::dex::DexEntry;
use crate::error::{SaveError, SaveResult};
use crate::game_stats::GameStats;
use crate::starter::{StarterDataEntry, StarterMoveset};
use crate::types::{SaveCategory, SpeciesId, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Read an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

macro_rules! numeric_enum {
    ($name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub enum $name {
            #[default]
            $($variant = $value),+
        }

        impl TryFrom<u8> for $name {
            type Error = String;

            fn try_from(v: u8) -> Result<Self, Self::Error> {
                match v {
                    $($value => Ok(Self::$variant),)+
                    other => Err(format!("invalid {} {other}", stringify!($name))),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(v: $name) -> u8 {
                v as u8
            }
        }
    };
}

numeric_enum!(PlayerGender { Unset = 0, Male = 1, Female = 2 });
numeric_enum!(GameMode { Classic = 0, Endless = 1, SplicedEndless = 2, Daily = 3, Challenge = 4 });
numeric_enum!(BattleType { Wild = 0, Trainer = 1, Clear = 2, MysteryEncounter = 3 });

// ── System ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSaveData {
    pub trainer_id:     u32,
    pub secret_id:      u32,
    #[serde(default)]
    pub gender:         PlayerGender,
    #[serde(default)]
    pub dex_data:       BTreeMap<SpeciesId, DexEntry>,
    /// Absent on saves that predate starter records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starter_data:   Option<BTreeMap<SpeciesId, StarterDataEntry>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub game_stats:     GameStats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unlocks:        BTreeMap<u32, bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub achv_unlocks:   BTreeMap<String, Timestamp>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub voucher_unlocks: BTreeMap<String, Timestamp>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub voucher_counts: BTreeMap<u32, u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub eggs:           Vec<Value>,
    #[serde(default)]
    pub game_version:   String,
    pub timestamp:      Timestamp,
    #[serde(default, deserialize_with = "null_as_default")]
    pub egg_pity:       Vec<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unlock_pity:    Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starter_move_data: Option<BTreeMap<SpeciesId, StarterMoveset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starter_egg_move_data: Option<BTreeMap<SpeciesId, u8>>,
}

// ── Session ────────────────────────────────────────

pub const EXP_BALANCE_MODIFIER: &str = "ExpBalanceModifier";
pub const EXP_BALANCE_MAX_STACKS: u32 = 4;
pub const ENEMY_STATUS_CHANCE_MODIFIER: &str = "EnemyAttackStatusEffectChanceModifier";

/// Status effect ids whose enemy chance modifiers are no longer allowed.
pub const RETIRED_ENEMY_STATUS_EFFECTS: [u64; 2] = [4, 5];

/// No mystery encounter active.
pub const NO_MYSTERY_ENCOUNTER: i32 = -1;

fn no_mystery_encounter() -> i32 { NO_MYSTERY_ENCOUNTER }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierData {
    pub class_name:       String,
    #[serde(default)]
    pub player:           bool,
    #[serde(default)]
    pub stack_count:      u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id:          Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_pregen_args: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub args:             Vec<Value>,
    #[serde(flatten)]
    pub extra:            BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerData {
    pub trainer_type: u32,
    #[serde(default)]
    pub variant:      u8,
    #[serde(flatten)]
    pub extra:        BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSaveData {
    #[serde(default)]
    pub seed:            String,
    #[serde(default)]
    pub play_time:       u64,
    #[serde(default)]
    pub game_mode:       GameMode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub party:           Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enemy_party:     Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub modifiers:       Vec<ModifierData>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enemy_modifiers: Vec<ModifierData>,
    #[serde(default)]
    pub arena:           Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pokeball_counts: BTreeMap<u32, u32>,
    #[serde(default)]
    pub money:           u64,
    #[serde(default)]
    pub score:           u64,
    #[serde(default)]
    pub wave_index:      u32,
    #[serde(default)]
    pub battle_type:     BattleType,
    #[serde(default)]
    pub trainer:         Option<TrainerData>,
    #[serde(default)]
    pub game_version:    String,
    pub timestamp:       Timestamp,
    #[serde(default, deserialize_with = "null_as_default")]
    pub challenges:      Vec<Value>,
    #[serde(default = "no_mystery_encounter")]
    pub mystery_encounter_type: i32,
    #[serde(default)]
    pub mystery_encounter_save_data: Value,
}

impl SessionSaveData {
    /// Empty wave-one session, used by tools and tests.
    pub fn new(seed: impl Into<String>, game_mode: GameMode, timestamp: Timestamp) -> Self {
        Self {
            seed: seed.into(),
            play_time: 0,
            game_mode,
            party: Vec::new(),
            enemy_party: Vec::new(),
            modifiers: Vec::new(),
            enemy_modifiers: Vec::new(),
            arena: Value::Null,
            pokeball_counts: BTreeMap::new(),
            money: 0,
            score: 0,
            wave_index: 1,
            battle_type: BattleType::Wild,
            trainer: None,
            game_version: String::new(),
            timestamp,
            challenges: Vec::new(),
            mystery_encounter_type: NO_MYSTERY_ENCOUNTER,
            mystery_encounter_save_data: Value::Null,
        }
    }

    /// A trainer battle must name its trainer.
    pub fn validate(&self) -> SaveResult<()> {
        if self.battle_type == BattleType::Trainer && self.trainer.is_none() {
            return Err(SaveError::malformed(SaveCategory::Session, "trainer battle without trainer data"));
        }
        Ok(())
    }

    /// Apply load-time corrections: experience balance stacks are capped
    /// and retired enemy status chance modifiers are dropped.
    pub fn sanitize(&mut self) {
        for list in [&mut self.modifiers, &mut self.enemy_modifiers] {
            for m in list.iter_mut().filter(|m| m.class_name == EXP_BALANCE_MODIFIER) {
                m.stack_count = m.stack_count.min(EXP_BALANCE_MAX_STACKS);
            }
            list.retain(|m| !is_retired_status_chance(m));
        }
    }
}

fn is_retired_status_chance(m: &ModifierData) -> bool {
    m.class_name == ENEMY_STATUS_CHANCE_MODIFIER
        && m.args
            .first()
            .and_then(Value::as_u64)
            .is_some_and(|effect| RETIRED_ENEMY_STATUS_EFFECTS.contains(&effect))
}

// ── Run history ────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEntry {
    pub entry:       SessionSaveData,
    pub is_victory:  bool,
    pub is_favorite: bool,
}
