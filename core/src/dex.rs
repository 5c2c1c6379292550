//! Per-species dex records and the attribute bitmasks they carry.

use crate::codec::attr_mask;
use crate::types::SpeciesId;
use serde::{Deserialize, Serialize};

/// Dex attribute bits. Bits 7 and up are one per form index.
pub struct DexAttr;

impl DexAttr {
    pub const NON_SHINY: u64 = 1;
    pub const SHINY: u64 = 2;
    pub const MALE: u64 = 4;
    pub const FEMALE: u64 = 8;
    pub const DEFAULT_VARIANT: u64 = 16;
    pub const VARIANT_2: u64 = 32;
    pub const VARIANT_3: u64 = 64;
    pub const DEFAULT_FORM: u64 = 128;

    /// Highest form index representable in a 64-bit mask.
    pub const MAX_FORM_INDEX: u8 = 56;

    pub fn form(index: u8) -> u64 {
        1u64 << (7 + index.min(Self::MAX_FORM_INDEX))
    }

    /// Lowest form index present in `attr`; 0 when no form bit is set.
    pub fn form_index(attr: u64) -> u8 {
        if attr < Self::DEFAULT_FORM {
            return 0;
        }
        (0..=Self::MAX_FORM_INDEX)
            .find(|f| attr & Self::form(*f) != 0)
            .unwrap_or(0)
    }

    /// Luck value contributed by a shiny attribute set: 0 for non-shiny,
    /// else 1 + variant tier.
    pub fn luck(attr: u64) -> u8 {
        if attr & Self::SHINY == 0 {
            0
        } else if attr & Self::VARIANT_3 != 0 {
            3
        } else if attr & Self::VARIANT_2 != 0 {
            2
        } else {
            1
        }
    }

    /// Display props for a single-choice mask. Shiny and female are read
    /// as the absence of NON_SHINY and MALE, and the lowest variant wins.
    pub fn props(attr: u64) -> DexAttrProps {
        DexAttrProps {
            shiny:      attr & Self::NON_SHINY == 0,
            female:     attr & Self::MALE == 0,
            variant:    if attr & Self::DEFAULT_VARIANT != 0 {
                0
            } else if attr & Self::VARIANT_2 != 0 {
                1
            } else if attr & Self::VARIANT_3 != 0 {
                2
            } else {
                0
            },
            form_index: Self::form_index(attr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DexAttrProps {
    pub shiny:      bool,
    pub female:     bool,
    pub variant:    u8,
    pub form_index: u8,
}

/// Ability unlock bits stored on starter entries.
pub struct AbilityAttr;

impl AbilityAttr {
    pub const ABILITY_1: u8 = 1;
    pub const ABILITY_2: u8 = 2;
    pub const ABILITY_HIDDEN: u8 = 4;
}

/// Number of natures. Nature `n` is recorded at bit `n + 1`.
pub const NATURE_COUNT: u8 = 25;

/// Natures with no stat effect, used for default starters.
pub const NEUTRAL_NATURES: [u8; 5] = [0, 6, 12, 18, 24];

pub fn nature_bit(nature: u8) -> u32 {
    1u32 << (nature.min(NATURE_COUNT - 1) + 1)
}

/// Natures present in a nature mask, ascending.
pub fn natures_for_attr(nature_attr: u32) -> Vec<u8> {
    (0..NATURE_COUNT).filter(|n| nature_attr & nature_bit(*n) != 0).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexEntry {
    #[serde(default, with = "attr_mask")]
    pub seen_attr:     u64,
    #[serde(default, with = "attr_mask")]
    pub caught_attr:   u64,
    /// `None` only on data loaded from saves that predate nature tracking;
    /// consolidation fills it in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nature_attr:   Option<u32>,
    #[serde(default)]
    pub seen_count:    u32,
    #[serde(default)]
    pub caught_count:  u32,
    #[serde(default)]
    pub hatched_count: u32,
    #[serde(default)]
    pub ivs:           [u8; 6],
}

impl Default for DexEntry {
    fn default() -> Self {
        Self {
            seen_attr:     0,
            caught_attr:   0,
            nature_attr:   Some(0),
            seen_count:    0,
            caught_count:  0,
            hatched_count: 0,
            ivs:           [0; 6],
        }
    }
}

impl DexEntry {
    pub fn natures(&self) -> u32 {
        self.nature_attr.unwrap_or(0)
    }

    pub fn is_caught(&self) -> bool {
        self.caught_attr != 0
    }
}

/// The parts of a battle pokemon the dex ledger records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PokemonInstance {
    pub species_id:    SpeciesId,
    pub shiny:         bool,
    /// 0 = default, 1 = second variant, 2 = third variant.
    pub variant:       u8,
    pub female:        bool,
    pub form_index:    u8,
    pub form_key:      String,
    pub ability_index: u8,
    pub nature:        u8,
    pub boss:          bool,
    pub ivs:           [u8; 6],
}

impl PokemonInstance {
    pub fn new(species_id: SpeciesId) -> Self {
        Self { species_id, ..Self::default() }
    }

    pub fn dex_attr(&self) -> u64 {
        self.dex_attr_for_form(self.form_index)
    }

    pub fn dex_attr_for_form(&self, form_index: u8) -> u64 {
        let mut attr = if self.shiny { DexAttr::SHINY } else { DexAttr::NON_SHINY };
        attr |= if self.female { DexAttr::FEMALE } else { DexAttr::MALE };
        attr |= match (self.shiny, self.variant) {
            (false, _) | (true, 0) => DexAttr::DEFAULT_VARIANT,
            (true, 1) => DexAttr::VARIANT_2,
            _ => DexAttr::VARIANT_3,
        };
        attr | DexAttr::form(form_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_index_reads_lowest_form_bit() {
        assert_eq!(DexAttr::form_index(DexAttr::NON_SHINY | DexAttr::MALE), 0);
        assert_eq!(DexAttr::form_index(DexAttr::form(3) | DexAttr::form(5)), 3);
        assert_eq!(DexAttr::form_index(DexAttr::DEFAULT_FORM), 0);
    }

    #[test]
    fn shiny_variant_attr() {
        let mut p = PokemonInstance::new(1);
        p.shiny = true;
        p.variant = 2;
        p.female = true;
        let attr = p.dex_attr();
        assert_eq!(attr, DexAttr::SHINY | DexAttr::FEMALE | DexAttr::VARIANT_3 | DexAttr::DEFAULT_FORM);
        assert_eq!(DexAttr::luck(attr), 3);
    }

    #[test]
    fn props_decode_variant_and_form() {
        let attr = DexAttr::SHINY | DexAttr::MALE | DexAttr::VARIANT_2 | DexAttr::form(2);
        assert_eq!(
            DexAttr::props(attr),
            DexAttrProps { shiny: true, female: false, variant: 1, form_index: 2 }
        );
    }

    #[test]
    fn props_read_missing_non_shiny_and_male_bits() {
        let both = DexAttr::NON_SHINY | DexAttr::SHINY | DexAttr::MALE | DexAttr::FEMALE
            | DexAttr::DEFAULT_VARIANT | DexAttr::VARIANT_3 | DexAttr::DEFAULT_FORM;
        assert_eq!(
            DexAttr::props(both),
            DexAttrProps { shiny: false, female: false, variant: 0, form_index: 0 }
        );

        let neither = DexAttr::VARIANT_3 | DexAttr::DEFAULT_FORM;
        assert_eq!(
            DexAttr::props(neither),
            DexAttrProps { shiny: true, female: true, variant: 2, form_index: 0 }
        );
    }

    #[test]
    fn natures_round_trip_through_mask() {
        let mask = nature_bit(0) | nature_bit(24);
        assert_eq!(natures_for_attr(mask), vec![0, 24]);
    }
}
