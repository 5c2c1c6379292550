//! Storage key naming. Account data is scoped by username; settings and
//! input mappings are shared by every account on the device.

use crate::types::{SaveCategory, SlotId};

pub const SETTINGS_KEY: &str = "settings";
pub const GAMEPAD_SETTINGS_KEY: &str = "settingsGamepad";
pub const KEYBOARD_SETTINGS_KEY: &str = "settingsKeyboard";
pub const MAPPING_CONFIGS_KEY: &str = "mappingConfigs";
pub const DAILY_SEEDS_KEY: &str = "daily";

pub fn system_key(username: &str) -> String {
    category_key(SaveCategory::System, 0, username)
}

pub fn session_key(slot: SlotId, username: &str) -> String {
    category_key(SaveCategory::Session, slot, username)
}

pub fn run_history_key(username: &str) -> String {
    category_key(SaveCategory::RunHistory, 0, username)
}

pub fn starter_prefs_key(username: &str) -> String {
    format!("starterPrefs_{username}")
}

/// Local storage key for a category. Settings are not user-scoped.
pub fn category_key(category: SaveCategory, slot: SlotId, username: &str) -> String {
    match category {
        SaveCategory::Settings => SETTINGS_KEY.to_string(),
        _ => format!("{}_{username}", category.data_key(slot)),
    }
}
