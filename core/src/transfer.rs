//! Save file export and import.
//!
//! Export files are always strong-encoded. Exported system data also has
//! its dex and starter field names shortened. Import is two-phase:
//! `prepare_import` decodes and validates without touching storage, and
//! `commit_import` writes the data (and pushes account data to the server
//! when online).

use crate::codec::{self, AccountIds};
use crate::error::SaveResult;
use crate::event::SaveEvent;
use crate::game_data::GameData;
use crate::migration;
use crate::remote::RemoteError;
use crate::snapshot::SystemSaveData;
use crate::store::keys;
use crate::types::{SaveCategory, SlotId};
use serde_json::Value;

pub const SAVE_FILE_EXTENSION: &str = "prsv";

const RUN_ENTRY_FIELDS: [&str; 3] = ["isFavorite", "isVictory", "entry"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents:  String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Data written; the game must reload.
    Imported,
    Corrupted { data_name: String },
    ServerUnreachable { data_name: String },
    UpdateFailed { data_name: String },
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Imported)
    }

    /// Message shown to the player.
    pub fn message(&self) -> String {
        match self {
            Self::Imported => "Import complete. The game will now reload.".to_string(),
            Self::Corrupted { data_name } => {
                format!("Your {data_name} data could not be loaded. It may be corrupted.")
            }
            Self::ServerUnreachable { data_name } => {
                format!("Could not contact the server. Your {data_name} data could not be imported.")
            }
            Self::UpdateFailed { data_name } => {
                format!("An error occurred while updating {data_name} data. Please contact the administrator.")
            }
        }
    }
}

/// Validated import, ready to be written.
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub category: SaveCategory,
    pub slot:     SlotId,
    data_key:     String,
    plain:        String,
}

impl PreparedImport {
    /// Decoded text that will be stored.
    pub fn plain(&self) -> &str {
        &self.plain
    }
}

/// Stored through the save codec rather than as plain JSON.
fn is_encoded(category: SaveCategory) -> bool {
    matches!(category, SaveCategory::System | SaveCategory::Session | SaveCategory::RunHistory)
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Every run must carry exactly the run entry fields. An empty history
/// is rejected.
pub fn validate_run_history_import(plain: &str) -> bool {
    let Ok(Value::Object(runs)) = serde_json::from_str::<Value>(plain) else {
        return false;
    };
    !runs.is_empty()
        && runs.values().all(|run| {
            run.as_object().is_some_and(|fields| {
                fields.len() == RUN_ENTRY_FIELDS.len() && RUN_ENTRY_FIELDS.iter().all(|f| fields.contains_key(*f))
            })
        })
}

impl GameData {
    /// Build an export file for a category. Online, account data is read
    /// from the server. Returns `None` when there is nothing to export.
    pub async fn export_data(&self, category: SaveCategory, slot: SlotId) -> SaveResult<Option<ExportFile>> {
        if category == SaveCategory::Session {
            self.check_slot(slot)?;
        }
        let data_key = keys::category_key(category, slot, &self.config.username);

        let plain = if !self.config.offline && category.is_account_data() {
            let identity = self.identity(Some(slot));
            let response = match category {
                SaveCategory::System => self.api.get_system(&identity).await,
                _ => self.api.get_session(&identity).await,
            };
            match response {
                Ok(Some(raw)) if raw.starts_with('{') => raw,
                Ok(_) | Err(RemoteError::NotFound) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        } else {
            match self.store.get_item(&data_key)? {
                Some(stored) if stored.is_empty() => return Ok(None),
                Some(stored) if is_encoded(category) => self.codec.decode(&stored)?,
                Some(stored) => stored,
                None => return Ok(None),
            }
        };

        let plain = match category {
            SaveCategory::System => codec::convert_system_data_str(&plain, true, None)?,
            _ => plain,
        };
        log::info!("Exported {category} data as {data_key}.{SAVE_FILE_EXTENSION}");
        Ok(Some(ExportFile {
            file_name: format!("{data_key}.{SAVE_FILE_EXTENSION}"),
            contents:  self.codec.encrypt(&plain)?,
        }))
    }

    fn validate_system_import(&self, plain: &str) -> bool {
        let Ok(mut value) = serde_json::from_str::<Value>(plain) else {
            return false;
        };
        if !is_truthy(value.get("dexData")) || !is_truthy(value.get("timestamp")) {
            return false;
        }
        migration::migrate(&mut value, SaveCategory::System, &self.config.game_version);
        serde_json::from_value::<SystemSaveData>(value).is_ok()
    }

    fn validate_session_import(&self, plain: &str) -> bool {
        let Ok(value) = serde_json::from_str::<Value>(plain) else {
            return false;
        };
        if !is_truthy(value.get("party")) || !is_truthy(value.get("enemyParty")) || !is_truthy(value.get("timestamp")) {
            return false;
        }
        self.parse_session(plain).is_ok()
    }

    /// Decode and validate an import file. Nothing is written.
    pub fn prepare_import(&self, category: SaveCategory, slot: SlotId, contents: &str) -> Result<PreparedImport, ImportOutcome> {
        let corrupted = || ImportOutcome::Corrupted { data_name: category.display_name().to_string() };
        if category == SaveCategory::Session && self.check_slot(slot).is_err() {
            return Err(corrupted());
        }

        let plain = self.codec.decrypt(contents).map_err(|e| {
            log::warn!("Import of {category} data failed to decode: {e}");
            corrupted()
        })?;

        let (plain, valid) = match category {
            SaveCategory::System => {
                let ids = AccountIds { trainer_id: self.trainer_id, secret_id: self.secret_id };
                match codec::convert_system_data_str(&plain, false, Some(ids)) {
                    Ok(converted) => {
                        let valid = self.validate_system_import(&converted);
                        (converted, valid)
                    }
                    Err(_) => (plain, false),
                }
            }
            SaveCategory::Session => {
                let valid = self.validate_session_import(&plain);
                (plain, valid)
            }
            SaveCategory::RunHistory => {
                let valid = validate_run_history_import(&plain);
                (plain, valid)
            }
            SaveCategory::Settings | SaveCategory::Tutorials | SaveCategory::SeenDialogues => {
                let valid = serde_json::from_str::<Value>(&plain).is_ok_and(|v| v.is_object());
                (plain, valid)
            }
        };

        if !valid {
            log::warn!("Rejected {category} import: validation failed");
            return Err(corrupted());
        }
        Ok(PreparedImport {
            category,
            slot,
            data_key: keys::category_key(category, slot, &self.config.username),
            plain,
        })
    }

    /// Write a prepared import locally and, for account data while online,
    /// to the server. On success a reload is queued.
    pub async fn commit_import(&mut self, prepared: PreparedImport) -> ImportOutcome {
        let data_name = prepared.category.display_name().to_string();
        let stored = if is_encoded(prepared.category) {
            self.codec.encode(&prepared.plain)
        } else {
            Ok(prepared.plain.clone())
        };
        let written = stored.and_then(|text| self.store.set_item(&prepared.data_key, &text));
        if let Err(e) = written {
            log::error!("Failed to store imported {data_name} data: {e}");
            return ImportOutcome::UpdateFailed { data_name };
        }

        if !self.config.offline && prepared.category.is_account_data() {
            let identity = self
                .identity(Some(prepared.slot))
                .with_account(self.trainer_id, self.secret_id);
            let pushed = match prepared.category {
                SaveCategory::Session => self.api.update_session(&identity, &prepared.plain).await,
                _ => self.api.update_system(&identity, &prepared.plain).await,
            };
            match pushed {
                Ok(()) => {}
                Err(RemoteError::Transport(e)) => {
                    log::error!("Import push failed: {e}");
                    return ImportOutcome::ServerUnreachable { data_name };
                }
                Err(e) => {
                    self.on_remote_failure("import", &e);
                    return ImportOutcome::UpdateFailed { data_name };
                }
            }
        }

        log::info!("Imported {data_name} data into {}", prepared.data_key);
        self.events.push(SaveEvent::ReloadScheduled { snapshot: None });
        ImportOutcome::Imported
    }

    /// `prepare_import` followed by `commit_import`.
    pub async fn import_data(&mut self, category: SaveCategory, slot: SlotId, contents: &str) -> ImportOutcome {
        match self.prepare_import(category, slot, contents) {
            Ok(prepared) => self.commit_import(prepared).await,
            Err(outcome) => outcome,
        }
    }
}
