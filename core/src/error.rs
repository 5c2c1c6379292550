use crate::{
    remote::RemoteError,
    types::{SaveCategory, SlotId, SpeciesId},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Decoded save is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Save cryptographic operation failed")]
    Crypto,

    #[error("Malformed {category} data: {reason}")]
    MalformedSave {
        category: SaveCategory,
        reason:   String,
    },

    #[error("Species {0} is not in the catalog")]
    UnknownSpecies(SpeciesId),

    #[error("Session slot {0} is out of range")]
    InvalidSlot(SlotId),

    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SaveError {
    pub fn malformed(category: SaveCategory, reason: impl Into<String>) -> Self {
        Self::MalformedSave { category, reason: reason.into() }
    }
}

pub type SaveResult<T> = Result<T, SaveError>;
