//! Schema migrator.
//!
//! Every persisted object records the app version that wrote it in a
//! top-level `gameVersion` field. On load, each registered step whose
//! version is newer than the recorded one and not newer than the target is
//! applied in ascending order, then `gameVersion` is stamped with the
//! target. Steps are append-only and must be idempotent: migrating twice
//! yields the same result as migrating once.

use crate::types::SaveCategory;
use serde_json::{json, Map, Value};
use std::fmt;

/// Semantic version. Ordering is lexicographic on (major, minor, patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SchemaVersion(pub u32, pub u32, pub u32);

impl SchemaVersion {
    pub const ZERO: SchemaVersion = SchemaVersion(0, 0, 0);

    /// Parse "major.minor.patch". Missing components read as zero;
    /// anything unparseable reads as 0.0.0 so every step applies.
    pub fn parse(s: &str) -> Self {
        let mut parts = [0u32; 3];
        for (i, part) in s.trim().split('.').take(3).enumerate() {
            match part.trim().parse::<u32>() {
                Ok(n) => parts[i] = n,
                Err(_) => return Self::ZERO,
            }
        }
        Self(parts[0], parts[1], parts[2])
    }

    /// Version recorded on a stored object.
    pub fn of(data: &Map<String, Value>) -> Self {
        data.get("gameVersion")
            .and_then(Value::as_str)
            .map(Self::parse)
            .unwrap_or(Self::ZERO)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

pub struct MigrationStep {
    pub version: SchemaVersion,
    pub name:    &'static str,
    pub apply:   fn(&mut Map<String, Value>),
}

/// Registered steps for a category, ascending by version.
pub fn steps_for(category: SaveCategory) -> &'static [MigrationStep] {
    match category {
        SaveCategory::System => SYSTEM_STEPS,
        SaveCategory::Session => SESSION_STEPS,
        SaveCategory::Settings => SETTINGS_STEPS,
        _ => &[],
    }
}

/// Migrate `data` up to `target`. Data recorded at a newer version than
/// `target` is left untouched. Non-object input is ignored.
pub fn migrate_to(data: &mut Value, category: SaveCategory, target: SchemaVersion) {
    let Value::Object(map) = data else {
        log::warn!("Skipping {category} migration: data is not an object");
        return;
    };
    let recorded = SchemaVersion::of(map);
    if recorded > target {
        log::warn!("{category} data is from {recorded}, newer than {target}; leaving as is");
        return;
    }
    for step in steps_for(category) {
        if step.version > recorded && step.version <= target {
            log::debug!("Migrating {category} data: {} ({})", step.name, step.version);
            (step.apply)(map);
        }
    }
    map.insert("gameVersion".into(), Value::String(target.to_string()));
}

/// Migrate `data` up to the current app version string.
pub fn migrate(data: &mut Value, category: SaveCategory, game_version: &str) {
    migrate_to(data, category, SchemaVersion::parse(game_version));
}

fn pad_array(value: Option<&mut Value>, len: usize, fill: Value) -> Option<Value> {
    match value {
        Some(Value::Array(items)) => {
            items.resize(len, fill);
            None
        }
        _ => Some(Value::Array(vec![fill; len])),
    }
}

fn ensure_default(map: &mut Map<String, Value>, key: &str, default: Value) {
    if map.get(key).map_or(true, Value::is_null) {
        map.insert(key.to_string(), default);
    }
}

fn object_entries<'a>(map: &'a mut Map<String, Value>, key: &str) -> impl Iterator<Item = &'a mut Map<String, Value>> {
    map.get_mut(key)
        .and_then(Value::as_object_mut)
        .into_iter()
        .flat_map(|m| m.values_mut())
        .filter_map(Value::as_object_mut)
}

// ── System ─────────────────────────────────────────

const SYSTEM_STEPS: &[MigrationStep] = &[
    MigrationStep {
        version: SchemaVersion(1, 0, 4),
        name:    "pity counters, voucher counts, classic wins",
        apply:   system_fill_counters,
    },
    MigrationStep {
        version: SchemaVersion(1, 1, 0),
        name:    "six iv slots, passive and value reduction defaults",
        apply:   system_fill_starter_fields,
    },
];

fn system_fill_counters(data: &mut Map<String, Value>) {
    for key in ["eggPity", "unlockPity"] {
        if let Some(fresh) = pad_array(data.get_mut(key), 4, json!(0)) {
            data.insert(key.into(), fresh);
        }
    }
    if !data.get("voucherCounts").is_some_and(Value::is_object) {
        data.insert("voucherCounts".into(), json!({}));
    }
    if let Some(counts) = data.get_mut("voucherCounts").and_then(Value::as_object_mut) {
        for voucher_type in 0..4 {
            ensure_default(counts, &voucher_type.to_string(), json!(0));
        }
    }
    for entry in object_entries(data, "starterData") {
        ensure_default(entry, "classicWinCount", json!(0));
    }
}

fn system_fill_starter_fields(data: &mut Map<String, Value>) {
    for entry in object_entries(data, "dexData") {
        if let Some(fresh) = pad_array(entry.get_mut("ivs"), 6, json!(0)) {
            entry.insert("ivs".into(), fresh);
        }
    }
    for entry in object_entries(data, "starterData") {
        ensure_default(entry, "passiveAttr", json!(0));
        ensure_default(entry, "valueReduction", json!(0));
        ensure_default(entry, "eggMoves", json!(0));
    }
}

// ── Session ────────────────────────────────────────

const SESSION_STEPS: &[MigrationStep] = &[
    MigrationStep {
        version: SchemaVersion(1, 0, 4),
        name:    "modifier class renames",
        apply:   session_rename_modifiers,
    },
    MigrationStep {
        version: SchemaVersion(1, 1, 0),
        name:    "challenge and encounter defaults",
        apply:   session_fill_encounter_fields,
    },
];

/// (old class name, new class name, new type id)
const MODIFIER_RENAMES: &[(&str, &str, Option<&str>)] = &[
    ("TempBattleStatBoosterModifier", "TempStatStageBoosterModifier", Some("TEMP_STAT_STAGE_BOOSTER")),
    ("PokemonBaseStatModifier", "BaseStatModifier", None),
    ("PokemonResetNegativeStatStageModifier", "ResetNegativeStatStageModifier", None),
    ("DoubleBattleChanceBoosterModifier", "LureModifier", None),
];

fn session_rename_modifiers(data: &mut Map<String, Value>) {
    for list in ["modifiers", "enemyModifiers"] {
        let Some(items) = data.get_mut(list).and_then(Value::as_array_mut) else {
            continue;
        };
        for modifier in items.iter_mut().filter_map(Value::as_object_mut) {
            let Some(class_name) = modifier.get("className").and_then(Value::as_str) else {
                continue;
            };
            if let Some((_, renamed, type_id)) = MODIFIER_RENAMES.iter().find(|(old, _, _)| *old == class_name) {
                modifier.insert("className".into(), json!(renamed));
                if let Some(type_id) = type_id {
                    modifier.insert("typeId".into(), json!(type_id));
                }
            }
        }
    }
}

fn session_fill_encounter_fields(data: &mut Map<String, Value>) {
    ensure_default(data, "challenges", json!([]));
    ensure_default(data, "mysteryEncounterType", json!(-1));
    ensure_default(data, "mysteryEncounterSaveData", json!({}));
}

// ── Settings ───────────────────────────────────────

const SETTINGS_STEPS: &[MigrationStep] = &[
    MigrationStep {
        version: SchemaVersion(1, 0, 4),
        name:    "shop cursor setting rename",
        apply:   settings_rename_cursor_target,
    },
    MigrationStep {
        version: SchemaVersion(1, 1, 0),
        name:    "boolean settings to option indices",
        apply:   settings_booleans_to_indices,
    },
];

fn settings_rename_cursor_target(data: &mut Map<String, Value>) {
    if let Some(value) = data.remove("REROLL_TARGET") {
        data.entry("SHOP_CURSOR_TARGET").or_insert(value);
    }
}

fn settings_booleans_to_indices(data: &mut Map<String, Value>) {
    for value in data.values_mut() {
        if let Value::Bool(b) = value {
            let index = u8::from(*b);
            *value = json!(index);
        }
    }
}
