use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Saved moveset for a starter: a flat list, or one list per form index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StarterMoveset {
    Moves(Vec<u32>),
    ByForm(BTreeMap<String, Vec<u32>>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarterDataEntry {
    #[serde(default)]
    pub moveset:           Option<StarterMoveset>,
    /// Egg move unlock bits; bit `i` is egg move `i`.
    #[serde(default)]
    pub egg_moves:         u8,
    #[serde(default)]
    pub candy_count:       u32,
    #[serde(default)]
    pub friendship:        u32,
    #[serde(default)]
    pub ability_attr:      u8,
    #[serde(default)]
    pub passive_attr:      u8,
    #[serde(default)]
    pub value_reduction:   u8,
    #[serde(default)]
    pub classic_win_count: u32,
}

/// Player-chosen starter presentation, stored per account outside the
/// system save. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarterAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nature:   Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability:  Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant:  Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form:     Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub female:   Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shiny:    Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}
