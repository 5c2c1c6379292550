//! Class-name lookup for rebuilding live modifiers from session saves.
//!
//! The registry is filled once at startup and read-only afterwards.
//! Unknown class names are skipped with a warning so a save written by a
//! newer build still loads.

use crate::snapshot::ModifierData;
use std::collections::HashMap;

/// Builds a live modifier from its saved record. Returns `None` when the
/// record's arguments do not fit.
pub type ModifierCtor<M> = fn(&ModifierData) -> Option<M>;

pub struct ModifierRegistry<M> {
    ctors: HashMap<String, ModifierCtor<M>>,
}

impl<M> Default for ModifierRegistry<M> {
    fn default() -> Self {
        Self { ctors: HashMap::new() }
    }
}

impl<M> ModifierRegistry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, class_name: impl Into<String>, ctor: ModifierCtor<M>) -> Self {
        self.ctors.insert(class_name.into(), ctor);
        self
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.ctors.contains_key(class_name)
    }

    pub fn len(&self) -> usize {
        self.ctors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ctors.is_empty()
    }

    pub fn rebuild(&self, data: &ModifierData) -> Option<M> {
        match self.ctors.get(&data.class_name) {
            Some(ctor) => {
                let built = ctor(data);
                if built.is_none() {
                    log::warn!("Modifier {} rejected its saved arguments", data.class_name);
                }
                built
            }
            None => {
                log::warn!("Unknown modifier class {}, skipping", data.class_name);
                None
            }
        }
    }

    pub fn rebuild_all(&self, saved: &[ModifierData]) -> Vec<M> {
        saved.iter().filter_map(|d| self.rebuild(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn saved(class_name: &str, stack_count: u32) -> ModifierData {
        ModifierData {
            class_name: class_name.into(),
            player: true,
            stack_count,
            type_id: None,
            type_pregen_args: None,
            args: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    fn stacks(data: &ModifierData) -> Option<u32> {
        (data.stack_count > 0).then_some(data.stack_count)
    }

    #[test]
    fn unknown_and_rejected_records_are_skipped() {
        let registry = ModifierRegistry::new().with("ExpShareModifier", stacks);
        assert!(registry.contains("ExpShareModifier"));
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());

        let rebuilt = registry.rebuild_all(&[
            saved("ExpShareModifier", 2),
            saved("RetiredModifier", 1),
            saved("ExpShareModifier", 0),
        ]);
        assert_eq!(rebuilt, vec![2]);
    }
}
