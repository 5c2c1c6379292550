use super::{keys, SaveStore};
use crate::{error::SaveResult, types::SlotId};

impl SaveStore {
    /// Session slots in `0..slot_count` with a locally cached session.
    pub fn cached_session_slots(&self, username: &str, slot_count: SlotId) -> SaveResult<Vec<SlotId>> {
        let mut slots = Vec::new();
        for slot in 0..slot_count {
            if self.has_item(&keys::session_key(slot, username))? {
                slots.push(slot);
            }
        }
        Ok(slots)
    }

    /// Drop every cached session in `0..slot_count`. Returns how many
    /// were removed.
    pub fn clear_session_caches(&self, username: &str, slot_count: SlotId) -> SaveResult<usize> {
        let mut removed = 0;
        for slot in 0..slot_count {
            if self.remove_item(&keys::session_key(slot, username))? {
                removed += 1;
            }
        }
        if removed > 0 {
            log::debug!("Cleared {removed} cached session(s) for {username}");
        }
        Ok(removed)
    }
}
