//! Device and account preferences kept beside the saves: settings,
//! control mappings, tutorial and dialogue flags, starter display
//! preferences and the offline daily-run ledger.
//!
//! These are plain JSON in local storage and are never sent to the
//! account server.

use crate::error::SaveResult;
use crate::migration;
use crate::starter::StarterAttributes;
use crate::store::{keys, SaveStore};
use crate::types::{SaveCategory, SpeciesId};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub type StarterPreferences = BTreeMap<SpeciesId, StarterAttributes>;

/// Last starter preference text written to storage. Writes that would
/// store identical text are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefsShadow {
    last_written: String,
}

impl Default for PrefsShadow {
    fn default() -> Self {
        Self { last_written: "{}".to_string() }
    }
}

impl PrefsShadow {
    pub fn last_written(&self) -> &str {
        &self.last_written
    }
}

/// Preference access for one account.
pub struct Prefs<'a> {
    store:        &'a SaveStore,
    username:     &'a str,
    game_version: &'a str,
}

impl<'a> Prefs<'a> {
    pub fn new(store: &'a SaveStore, username: &'a str, game_version: &'a str) -> Self {
        Self { store, username, game_version }
    }

    fn read_object(&self, key: &str) -> SaveResult<Map<String, Value>> {
        let Some(raw) = self.store.get_item(key)? else {
            return Ok(Map::new());
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                log::warn!("Discarding unreadable {key}");
                Ok(Map::new())
            }
        }
    }

    fn write_object(&self, key: &str, map: &Map<String, Value>) -> SaveResult<()> {
        self.store.set_item(key, &serde_json::to_string(map)?)
    }

    // ── Settings ───────────────────────────────────

    /// Store one setting's option index, stamping the current version.
    pub fn save_setting(&self, setting: &str, value_index: i64) -> SaveResult<()> {
        let mut settings = self.read_object(keys::SETTINGS_KEY)?;
        settings.insert(setting.to_string(), Value::from(value_index));
        settings.insert("gameVersion".into(), Value::from(self.game_version));
        self.write_object(keys::SETTINGS_KEY, &settings)
    }

    /// Stored settings, migrated to the current version. Migrated data is
    /// written back. `None` when nothing is stored.
    pub fn load_settings(&self) -> SaveResult<Option<Map<String, Value>>> {
        if !self.store.has_item(keys::SETTINGS_KEY)? {
            return Ok(None);
        }
        let before = Value::Object(self.read_object(keys::SETTINGS_KEY)?);
        let mut settings = before.clone();
        migration::migrate(&mut settings, SaveCategory::Settings, self.game_version);
        if settings != before {
            self.store.set_item(keys::SETTINGS_KEY, &serde_json::to_string(&settings)?)?;
        }
        match settings {
            Value::Object(map) => Ok(Some(map)),
            _ => Ok(None),
        }
    }

    /// Store a control setting under `storage_key` (gamepad or keyboard).
    /// Settings not listed in `known` are ignored. Returns whether the
    /// setting was stored.
    pub fn save_control_setting(&self, storage_key: &str, setting: &str, known: &[&str], value_index: i64) -> SaveResult<bool> {
        let mut controls = self.read_object(storage_key)?;
        let is_known = known.contains(&setting);
        if is_known {
            controls.insert(setting.to_string(), Value::from(value_index));
        }
        self.write_object(storage_key, &controls)?;
        Ok(is_known)
    }

    pub fn load_control_settings(&self, storage_key: &str) -> SaveResult<Option<Map<String, Value>>> {
        if !self.store.has_item(storage_key)? {
            return Ok(None);
        }
        self.read_object(storage_key).map(Some)
    }

    // ── Input mappings ─────────────────────────────

    /// Store a custom mapping for a device. Device names are case-folded.
    pub fn save_mapping_config(&self, device_name: &str, custom: Value) -> SaveResult<()> {
        let mut configs = self.read_object(keys::MAPPING_CONFIGS_KEY)?;
        let device = configs
            .entry(device_name.to_lowercase())
            .or_insert_with(|| Value::Object(Map::new()));
        if !device.is_object() {
            *device = Value::Object(Map::new());
        }
        if let Value::Object(device) = device {
            device.insert("custom".into(), custom);
        }
        self.write_object(keys::MAPPING_CONFIGS_KEY, &configs)
    }

    pub fn load_mapping_configs(&self) -> SaveResult<Option<Map<String, Value>>> {
        self.load_control_settings(keys::MAPPING_CONFIGS_KEY)
    }

    /// Forget all custom mappings. Returns false when there were none.
    pub fn reset_mapping_to_factory(&self) -> SaveResult<bool> {
        self.store.remove_item(keys::MAPPING_CONFIGS_KEY)
    }

    // ── Tutorials and dialogues ────────────────────

    /// Set one tutorial flag. Every tutorial in `known` is written, unset
    /// ones as false.
    pub fn save_tutorial_flag(&self, tutorial: &str, flag: bool, known: &[String]) -> SaveResult<()> {
        let key = keys::category_key(SaveCategory::Tutorials, 0, self.username);
        let mut flags = self.read_object(&key)?;
        for name in known {
            if name == tutorial {
                flags.insert(name.clone(), Value::Bool(flag));
            } else {
                flags.entry(name.clone()).or_insert(Value::Bool(false));
            }
        }
        self.write_object(&key, &flags)
    }

    pub fn tutorial_flags(&self, known: &[String]) -> SaveResult<BTreeMap<String, bool>> {
        let key = keys::category_key(SaveCategory::Tutorials, 0, self.username);
        let stored = self.read_object(&key)?;
        Ok(known
            .iter()
            .map(|name| (name.clone(), stored.get(name).and_then(Value::as_bool).unwrap_or(false)))
            .collect())
    }

    pub fn save_seen_dialogue(&self, dialogue: &str) -> SaveResult<()> {
        let key = keys::category_key(SaveCategory::SeenDialogues, 0, self.username);
        let mut seen = self.read_object(&key)?;
        seen.insert(dialogue.to_string(), Value::Bool(true));
        self.write_object(&key, &seen)
    }

    pub fn seen_dialogues(&self) -> SaveResult<BTreeMap<String, bool>> {
        let key = keys::category_key(SaveCategory::SeenDialogues, 0, self.username);
        Ok(self
            .read_object(&key)?
            .into_iter()
            .filter_map(|(k, v)| v.as_bool().map(|b| (k, b)))
            .collect())
    }

    // ── Starter preferences ────────────────────────

    pub fn load_starter_prefs(&self, shadow: &mut PrefsShadow) -> SaveResult<StarterPreferences> {
        let key = keys::starter_prefs_key(self.username);
        let raw = self.store.get_item(&key)?.unwrap_or_else(|| "{}".to_string());
        let prefs = match serde_json::from_str::<StarterPreferences>(&raw) {
            Ok(prefs) => prefs,
            Err(e) => {
                log::warn!("Discarding unreadable {key}: {e}");
                StarterPreferences::new()
            }
        };
        shadow.last_written = raw;
        Ok(prefs)
    }

    /// Persist starter preferences unless the text equals the last write.
    /// Returns whether storage was touched.
    pub fn save_starter_prefs(&self, prefs: &StarterPreferences, shadow: &mut PrefsShadow) -> SaveResult<bool> {
        let text = serde_json::to_string(prefs)?;
        if text == shadow.last_written {
            return Ok(false);
        }
        self.store.set_item(&keys::starter_prefs_key(self.username), &text)?;
        shadow.last_written = text;
        Ok(true)
    }

    // ── Offline daily runs ─────────────────────────

    pub fn cleared_daily_seeds(&self) -> SaveResult<Vec<String>> {
        let Some(raw) = self.store.get_item(keys::DAILY_SEEDS_KEY)? else {
            return Ok(Vec::new());
        };
        let bytes = BASE64.decode(raw.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Record a cleared daily seed. Returns false if it was already cleared.
    pub fn record_daily_clear(&self, seed: &str) -> SaveResult<bool> {
        let mut seeds = self.cleared_daily_seeds()?;
        if seeds.iter().any(|s| s == seed) {
            return Ok(false);
        }
        seeds.push(seed.to_string());
        let encoded = BASE64.encode(serde_json::to_vec(&seeds)?);
        self.store.set_item(keys::DAILY_SEEDS_KEY, &encoded)?;
        Ok(true)
    }
}
