//! Save text codec.
//!
//! Two modes share one interface. The weak mode is plain base64 and is
//! used for offline local storage. The strong mode is AES-256-GCM keyed by
//! SHA-256 of the configured save key, stored as base64(nonce || ciphertext).
//! Export files are always written in strong mode.
//!
//! System data exported to a file additionally has its bulky dex/starter
//! field names swapped for short aliases; see `SYSTEM_SHORT_KEYS`.

use crate::error::{SaveError, SaveResult};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::Value;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

/// Long field name -> short alias. Applied to object keys at any depth.
pub const SYSTEM_SHORT_KEYS: [(&str, &str); 15] = [
    ("seenAttr", "$sa"),
    ("caughtAttr", "$ca"),
    ("natureAttr", "$na"),
    ("seenCount", "$s"),
    ("caughtCount", "$c"),
    ("hatchedCount", "$hc"),
    ("ivs", "$i"),
    ("moveset", "$m"),
    ("eggMoves", "$em"),
    ("candyCount", "$x"),
    ("friendship", "$f"),
    ("abilityAttr", "$a"),
    ("passiveAttr", "$pa"),
    ("valueReduction", "$vr"),
    ("classicWinCount", "$wc"),
];

/// Older exports used this alias for `passiveAttr`.
const LEGACY_PASSIVE_ALIAS: &str = "$pAttr";

#[derive(Clone)]
pub struct SaveCodec {
    key:  [u8; 32],
    weak: bool,
}

impl std::fmt::Debug for SaveCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveCodec").field("weak", &self.weak).finish_non_exhaustive()
    }
}

impl SaveCodec {
    pub fn new(save_key: &str, weak: bool) -> Self {
        let digest = Sha256::digest(save_key.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key, weak }
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    /// Encode in this codec's storage mode.
    pub fn encode(&self, plain: &str) -> SaveResult<String> {
        self.encode_as(plain, self.weak)
    }

    /// Decode in this codec's storage mode.
    pub fn decode(&self, stored: &str) -> SaveResult<String> {
        self.decode_as(stored, self.weak)
    }

    pub fn encode_as(&self, plain: &str, weak: bool) -> SaveResult<String> {
        if weak {
            Ok(BASE64.encode(plain.as_bytes()))
        } else {
            self.encrypt(plain)
        }
    }

    pub fn decode_as(&self, stored: &str, weak: bool) -> SaveResult<String> {
        if weak {
            let bytes = BASE64.decode(stored.trim())?;
            Ok(String::from_utf8(bytes)?)
        } else {
            self.decrypt(stored)
        }
    }

    /// Strong-mode encode. A fresh random nonce is drawn per call.
    pub fn encrypt(&self, plain: &str) -> SaveResult<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| SaveError::Crypto)?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plain.as_bytes())
            .map_err(|_| SaveError::Crypto)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    /// Strong-mode decode. Fails on a wrong key or any tampering.
    pub fn decrypt(&self, stored: &str) -> SaveResult<String> {
        let blob = BASE64.decode(stored.trim())?;
        if blob.len() <= NONCE_LEN {
            return Err(SaveError::Crypto);
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| SaveError::Crypto)?;
        let plain = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| SaveError::Crypto)?;
        Ok(String::from_utf8(plain)?)
    }
}

// ── Key aliasing ───────────────────────────────────

/// Account ids stamped into system data on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountIds {
    pub trainer_id: u32,
    pub secret_id:  u32,
}

fn short_alias(key: &str) -> Option<&'static str> {
    SYSTEM_SHORT_KEYS.iter().find(|(long, _)| *long == key).map(|(_, short)| *short)
}

fn long_name(key: &str) -> Option<&'static str> {
    let key = if key == LEGACY_PASSIVE_ALIAS { "$pa" } else { key };
    SYSTEM_SHORT_KEYS.iter().find(|(_, short)| *short == key).map(|(long, _)| *long)
}

fn rename_keys(value: &mut Value, lookup: fn(&str) -> Option<&'static str>) {
    match value {
        Value::Object(map) => {
            let old = std::mem::take(map);
            for (key, mut child) in old {
                rename_keys(&mut child, lookup);
                let key = lookup(&key).map(str::to_string).unwrap_or(key);
                map.insert(key, child);
            }
        }
        Value::Array(items) => {
            for item in items {
                rename_keys(item, lookup);
            }
        }
        _ => {}
    }
}

/// Replace long field names with their short aliases. Idempotent.
pub fn shorten_keys(value: &mut Value) {
    rename_keys(value, short_alias);
}

/// Replace short aliases (including the legacy passive alias) with
/// the long field names.
pub fn restore_keys(value: &mut Value) {
    rename_keys(value, long_name);
}

/// Convert a serialized system save between long and short field names.
/// When `ids` is given, existing `trainerId`/`secretId` fields are
/// overwritten with them.
pub fn convert_system_data_str(data: &str, shorten: bool, ids: Option<AccountIds>) -> SaveResult<String> {
    let mut value: Value = serde_json::from_str(data)?;
    if shorten {
        shorten_keys(&mut value);
    } else {
        restore_keys(&mut value);
    }
    if let (Some(ids), Value::Object(map)) = (ids, &mut value) {
        if map.contains_key("trainerId") {
            map.insert("trainerId".into(), ids.trainer_id.into());
        }
        if map.contains_key("secretId") {
            map.insert("secretId".into(), ids.secret_id.into());
        }
    }
    Ok(serde_json::to_string(&value)?)
}

// ── Wide attribute masks ───────────────────────────

/// Serde adapter for 64-bit attribute masks. Values up to 2^31 are written
/// as JSON numbers, larger ones as decimal strings. Reading accepts either
/// form; null or absent reads as zero.
pub mod attr_mask {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub const MAX_NUMERIC: u64 = 0x8000_0000;

    pub fn serialize<S: Serializer>(mask: &u64, s: S) -> Result<S::Ok, S::Error> {
        if *mask <= MAX_NUMERIC {
            s.serialize_u64(*mask)
        } else {
            s.serialize_str(&mask.to_string())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .ok_or_else(|| D::Error::custom(format!("invalid attribute mask {n}"))),
            Some(Value::String(s)) if s.is_empty() => Ok(0),
            Some(Value::String(s)) => s.parse::<u64>().map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!("invalid attribute mask {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shorten_is_idempotent() {
        let mut once = json!({ "dexData": { "1": { "seenAttr": 3, "ivs": [1, 2] } } });
        shorten_keys(&mut once);
        let mut twice = once.clone();
        shorten_keys(&mut twice);
        assert_eq!(once, twice);
        assert_eq!(once["dexData"]["1"]["$sa"], json!(3));
    }

    #[test]
    fn legacy_passive_alias_restores() {
        let mut v = json!({ "starterData": { "4": { "$pAttr": 1, "$x": 9 } } });
        restore_keys(&mut v);
        assert_eq!(v["starterData"]["4"]["passiveAttr"], json!(1));
        assert_eq!(v["starterData"]["4"]["candyCount"], json!(9));
    }
}
