//! Dex and starter ledger.
//!
//! Owns the per-species dex entries, the per-starter progression records
//! and the lifetime game stats they feed. Every mutation is monotonic:
//! attribute masks only gain bits, counters only grow.

use crate::config::SpeciesCatalog;
use crate::dex::{natures_for_attr, nature_bit, AbilityAttr, DexAttr, DexEntry, PokemonInstance, NATURE_COUNT, NEUTRAL_NATURES};
use crate::error::{SaveError, SaveResult};
use crate::event::SaveEvent;
use crate::game_stats::GameStats;
use crate::rng::{RngBank, RngSlot, SeededRng};
use crate::starter::{StarterDataEntry, StarterMoveset};
use crate::types::SpeciesId;
use std::collections::BTreeMap;

pub const PERFECT_IVS_ACHIEVEMENT: &str = "PERFECT_IVS";

/// Ribbon totals that unlock an achievement, highest first.
pub const RIBBON_ACHIEVEMENTS: [(u32, &str); 5] = [
    (100, "_100_RIBBONS"),
    (75, "_75_RIBBONS"),
    (50, "_50_RIBBONS"),
    (25, "_25_RIBBONS"),
    (10, "_10_RIBBONS"),
];

/// Egg move slot reserved for the rare egg move.
pub const RARE_EGG_MOVE_INDEX: u8 = 3;

const MAX_IV: u8 = 31;

/// Attributes every default starter begins with.
pub const DEFAULT_STARTER_ATTR: u64 =
    DexAttr::NON_SHINY | DexAttr::MALE | DexAttr::FEMALE | DexAttr::DEFAULT_VARIANT | DexAttr::DEFAULT_FORM;

/// State of the run the encounter happens in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncounterContext {
    pub daily_mode:     bool,
    /// Set while replaying or simulating encounters that must not count.
    pub suppress_stats: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchOptions {
    /// False when re-recording a pokemon already owned (form change,
    /// nature change); counts and candy are skipped.
    pub increment_count: bool,
    pub from_egg:        bool,
    /// Queue `StarterUnlocked` events for newly unlocked starters.
    pub announce:        bool,
}

impl Default for CatchOptions {
    fn default() -> Self {
        Self { increment_count: true, from_egg: false, announce: true }
    }
}

impl CatchOptions {
    pub fn hatched() -> Self {
        Self { from_egg: true, ..Self::default() }
    }

    pub fn silent() -> Self {
        Self { announce: false, ..Self::default() }
    }
}

#[derive(Debug, Clone)]
pub struct DexLedger {
    pub dex_data:     BTreeMap<SpeciesId, DexEntry>,
    pub starter_data: BTreeMap<SpeciesId, StarterDataEntry>,
    pub game_stats:   GameStats,
    /// Nature masks of a fresh account, consulted once by consolidation.
    baseline_natures: Option<BTreeMap<SpeciesId, u32>>,
    events:           Vec<SaveEvent>,
}

impl DexLedger {
    /// Fresh-account ledger. Every catalog species gets an empty entry;
    /// default starters begin seen and caught with a neutral nature drawn
    /// from the `DefaultStarters` stream.
    pub fn new(catalog: &SpeciesCatalog, rng_bank: &RngBank) -> Self {
        let mut dex_data: BTreeMap<SpeciesId, DexEntry> =
            catalog.species_ids().map(|id| (id, DexEntry::default())).collect();
        let mut rng = rng_bank.for_slot(RngSlot::DefaultStarters);
        let mut baseline = BTreeMap::new();

        for &id in catalog.default_starters() {
            let natures = nature_bit(*rng.pick(&NEUTRAL_NATURES));
            let entry = dex_data.entry(id).or_default();
            entry.seen_attr = DEFAULT_STARTER_ATTR;
            entry.caught_attr = DEFAULT_STARTER_ATTR;
            entry.nature_attr = Some(natures);
            entry.ivs = [15; 6];
            baseline.insert(id, natures);
        }

        Self {
            dex_data,
            starter_data: Self::fresh_starter_data(catalog),
            game_stats: GameStats::default(),
            baseline_natures: Some(baseline),
            events: Vec::new(),
        }
    }

    /// One empty record per starter species. Default starters know their
    /// first ability.
    pub fn fresh_starter_data(catalog: &SpeciesCatalog) -> BTreeMap<SpeciesId, StarterDataEntry> {
        catalog
            .starter_ids()
            .map(|id| {
                let mut entry = StarterDataEntry::default();
                if catalog.is_default_starter(id) {
                    entry.ability_attr = AbilityAttr::ABILITY_1;
                }
                (id, entry)
            })
            .collect()
    }

    pub fn drain_events(&mut self) -> Vec<SaveEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn entry(&self, species_id: SpeciesId) -> Option<&DexEntry> {
        self.dex_data.get(&species_id)
    }

    pub fn starter(&self, species_id: SpeciesId) -> Option<&StarterDataEntry> {
        self.starter_data.get(&species_id)
    }

    fn caught_attr(&self, species_id: SpeciesId) -> u64 {
        self.dex_data.get(&species_id).map_or(0, |e| e.caught_attr)
    }

    fn starter_mut(&mut self, species_id: SpeciesId) -> SaveResult<&mut StarterDataEntry> {
        self.starter_data
            .get_mut(&species_id)
            .ok_or(SaveError::UnknownSpecies(species_id))
    }

    // ── Loading ────────────────────────────────────

    /// Overlay loaded entries onto the current ones. Species absent from
    /// the loaded map keep their current entry.
    pub fn merge_dex_data(&mut self, loaded: BTreeMap<SpeciesId, DexEntry>) {
        self.dex_data.extend(loaded);
    }

    /// Replace the starter records, then add an empty record for any
    /// catalog starter the loaded data lacks.
    pub fn replace_starter_data(&mut self, catalog: &SpeciesCatalog, loaded: BTreeMap<SpeciesId, StarterDataEntry>) {
        self.starter_data = loaded;
        for id in catalog.starter_ids() {
            self.starter_data.entry(id).or_default();
        }
    }

    /// Backfill fields older saves lack. An entry without a nature mask, or
    /// a caught entry with an empty one, gets the fresh-account mask for
    /// that species or else one random nature.
    pub fn consolidate(&mut self, rng: &mut SeededRng) {
        for (id, entry) in self.dex_data.iter_mut() {
            let needs_nature = match entry.nature_attr {
                None => true,
                Some(0) => entry.caught_attr != 0,
                Some(_) => false,
            };
            if !needs_nature {
                continue;
            }
            let baseline = self
                .baseline_natures
                .as_ref()
                .and_then(|b| b.get(id).copied())
                .filter(|n| *n != 0);
            let natures = baseline.unwrap_or_else(|| 1u32 << rng.rand_int(NATURE_COUNT as u32, 1));
            log::debug!("Backfilled nature mask for species {id}");
            entry.nature_attr = Some(natures);
        }
    }

    /// Forget the fresh-account baseline once a save has been applied.
    pub fn drop_baseline(&mut self) {
        self.baseline_natures = None;
    }

    /// Build starter records for saves that predate them, from the legacy
    /// per-species moveset and egg move maps. Ability unlocks are derived
    /// from the variant bits of `dex_data`, which are then normalised, and
    /// candy is credited for past catches and hatches.
    pub fn rebuild_legacy_starter_data(
        catalog: &SpeciesCatalog,
        dex_data: &mut BTreeMap<SpeciesId, DexEntry>,
        movesets: Option<BTreeMap<SpeciesId, StarterMoveset>>,
        egg_moves: Option<BTreeMap<SpeciesId, u8>>,
    ) -> BTreeMap<SpeciesId, StarterDataEntry> {
        let mut starters = Self::fresh_starter_data(catalog);
        for (id, moveset) in movesets.unwrap_or_default() {
            if let Some(entry) = starters.get_mut(&id) {
                entry.moveset = Some(moveset);
            }
        }
        for (id, bits) in egg_moves.unwrap_or_default() {
            if let Some(entry) = starters.get_mut(&id) {
                entry.egg_moves = bits;
            }
        }

        migrate_starter_abilities(dex_data, &mut starters);

        for (id, starter) in starters.iter_mut() {
            let Some(dex) = dex_data.get(id) else { continue };
            starter.candy_count += dex.caught_count + dex.hatched_count * 2;
            if dex.caught_attr & DexAttr::SHINY != 0 {
                starter.candy_count += 4;
            }
        }
        starters
    }

    // ── Recording ──────────────────────────────────

    /// Record a sighting. No-op while stats are suppressed. Rarity and
    /// shiny counters are skipped for trainer-owned pokemon.
    pub fn mark_seen(
        &mut self,
        catalog: &SpeciesCatalog,
        pokemon: &PokemonInstance,
        ctx: EncounterContext,
        increment_count: bool,
        trainer_owned: bool,
    ) -> SaveResult<()> {
        if ctx.suppress_stats {
            return Ok(());
        }
        let species = catalog
            .get(pokemon.species_id)
            .ok_or(SaveError::UnknownSpecies(pokemon.species_id))?;
        let entry = self.dex_data.entry(pokemon.species_id).or_default();
        entry.seen_attr |= pokemon.dex_attr();
        if increment_count {
            entry.seen_count += 1;
            self.game_stats.record_seen(species, pokemon.shiny, trainer_owned);
        }
        Ok(())
    }

    /// Record a catch or hatch for the species and every prevolution.
    ///
    /// Returns true when the catch unlocked a new starter anywhere in the
    /// lineage. When `increment_count` is false and the lineage root has
    /// never been caught, nothing is recorded.
    pub fn mark_caught(
        &mut self,
        catalog: &SpeciesCatalog,
        pokemon: &PokemonInstance,
        ctx: EncounterContext,
        opts: CatchOptions,
    ) -> SaveResult<bool> {
        let caught_species = catalog
            .get(pokemon.species_id)
            .ok_or(SaveError::UnknownSpecies(pokemon.species_id))?;
        let root = catalog.root_species(pokemon.species_id);
        if !opts.increment_count && self.caught_attr(root) == 0 {
            return Ok(false);
        }

        let form_index = if catalog.is_no_starter_form(&pokemon.form_key) { 0 } else { pokemon.form_index };
        let dex_attr = pokemon.dex_attr_for_form(form_index);
        let ability_bit = if pokemon.ability_index != 1 || caught_species.has_ability2 {
            1u8 << pokemon.ability_index.min(2)
        } else {
            AbilityAttr::ABILITY_HIDDEN
        };
        let mut unlocked_starter = false;

        for species_id in catalog.lineage(pokemon.species_id) {
            let is_starter = catalog.is_starter(species_id);
            let entry = self.dex_data.entry(species_id).or_default();
            let prior_attr = entry.caught_attr;
            entry.caught_attr |= dex_attr;
            entry.nature_attr = Some(entry.natures() | nature_bit(pokemon.nature));
            if opts.increment_count {
                if opts.from_egg {
                    entry.hatched_count += 1;
                    self.game_stats.record_hatched(caught_species, pokemon.shiny);
                } else {
                    entry.caught_count += 1;
                    self.game_stats.record_caught(caught_species, pokemon.shiny);
                }
            }

            if is_starter {
                self.starter_data.entry(species_id).or_default().ability_attr |= ability_bit;
            }

            let has_prevolution = catalog.prevolution(species_id).is_some();
            let has_new_attr = prior_attr & dex_attr != dex_attr;
            if opts.increment_count
                && !has_prevolution
                && (!ctx.daily_mode || has_new_attr || opts.from_egg)
            {
                self.add_starter_candy(catalog, species_id, candy_award(pokemon, opts.from_egg));
            }

            if prior_attr == 0 && is_starter {
                unlocked_starter = true;
                if opts.announce {
                    self.events.push(SaveEvent::StarterUnlocked { species_id });
                }
            }
        }

        Ok(unlocked_starter)
    }

    /// Credit candy to a starter. Ignored unless the species' lineage root
    /// has been caught.
    pub fn add_starter_candy(&mut self, catalog: &SpeciesCatalog, species_id: SpeciesId, amount: u32) {
        let root = catalog.root_species(species_id);
        if self.caught_attr(root) == 0 {
            return;
        }
        match self.starter_data.get_mut(&species_id) {
            Some(starter) => {
                starter.candy_count += amount;
                self.events.push(SaveEvent::CandyAwarded { species_id, amount });
            }
            None => log::debug!("Species {species_id} has no starter record; {amount} candy dropped"),
        }
    }

    /// Unlock a nature for the species and all prevolutions. Requires the
    /// lineage root to be caught.
    pub fn unlock_nature(&mut self, catalog: &SpeciesCatalog, species_id: SpeciesId, nature: u8) -> bool {
        if !self.is_root_species_unlocked(catalog, species_id) {
            return false;
        }
        for id in catalog.lineage(species_id) {
            let entry = self.dex_data.entry(id).or_default();
            entry.nature_attr = Some(entry.natures() | nature_bit(nature));
        }
        true
    }

    /// Raise each recorded IV to at least the given value across the
    /// lineage. Returns true when a species now holds perfect IVs.
    pub fn update_best_ivs(&mut self, catalog: &SpeciesCatalog, species_id: SpeciesId, ivs: &[u8; 6]) -> bool {
        let mut perfect = false;
        for id in catalog.lineage(species_id) {
            let entry = self.dex_data.entry(id).or_default();
            for (best, iv) in entry.ivs.iter_mut().zip(ivs) {
                *best = (*best).max(*iv);
            }
            perfect |= entry.ivs.iter().all(|iv| *iv == MAX_IV);
        }
        if perfect {
            self.events.push(SaveEvent::AchievementUnlocked {
                achievement: PERFECT_IVS_ACHIEVEMENT.to_string(),
            });
        }
        perfect
    }

    /// Record a classic win for the starter at the root of `species_id`'s
    /// lineage. The first win earns a ribbon. Returns the new win count.
    pub fn increment_ribbon_count(&mut self, catalog: &SpeciesCatalog, species_id: SpeciesId, for_starter: bool) -> SaveResult<u32> {
        let target = if for_starter {
            catalog.root_species_for_starter(species_id)
        } else {
            catalog.root_species(species_id)
        };
        let first_win = self.starter_mut(target)?.classic_win_count == 0;
        if first_win {
            self.game_stats.ribbons_owned += 1;
        }
        let ribbons = self.game_stats.ribbons_owned;
        for (threshold, achievement) in RIBBON_ACHIEVEMENTS {
            if ribbons >= threshold {
                self.events.push(SaveEvent::AchievementUnlocked { achievement: achievement.to_string() });
            }
        }
        let starter = self.starter_mut(target)?;
        starter.classic_win_count += 1;
        Ok(starter.classic_win_count)
    }

    /// Set egg move bit `index`. Returns false when the species has no
    /// such egg move or it was already unlocked.
    pub fn unlock_egg_move(&mut self, catalog: &SpeciesCatalog, species_id: SpeciesId, index: u8, announce: bool) -> bool {
        let defined = catalog.get(species_id).map_or(0, |s| s.egg_moves);
        if index >= defined || index > RARE_EGG_MOVE_INDEX {
            return false;
        }
        let Some(starter) = self.starter_data.get_mut(&species_id) else {
            return false;
        };
        let bit = 1u8 << index;
        if starter.egg_moves & bit != 0 {
            return false;
        }
        starter.egg_moves |= bit;
        if announce {
            self.events.push(SaveEvent::EggMoveUnlocked {
                species_id,
                index,
                rare: index == RARE_EGG_MOVE_INDEX,
            });
        }
        true
    }

    // ── Queries ────────────────────────────────────

    pub fn is_root_species_unlocked(&self, catalog: &SpeciesCatalog, species_id: SpeciesId) -> bool {
        self.caught_attr(catalog.root_species(species_id)) != 0
    }

    /// Preferred display attributes for a species from its caught mask.
    /// `optimistic` prefers the best shiny variant owned.
    pub fn default_dex_attr(&self, species_id: SpeciesId, optimistic: bool) -> u64 {
        let attr = self.caught_attr(species_id);
        let mut ret = 0;
        if optimistic {
            if attr & DexAttr::SHINY != 0 {
                ret |= DexAttr::SHINY;
                ret |= if attr & DexAttr::VARIANT_3 != 0 {
                    DexAttr::VARIANT_3
                } else if attr & DexAttr::VARIANT_2 != 0 {
                    DexAttr::VARIANT_2
                } else {
                    DexAttr::DEFAULT_VARIANT
                };
            } else {
                ret |= DexAttr::NON_SHINY | DexAttr::DEFAULT_VARIANT;
            }
        } else {
            ret |= if attr & DexAttr::NON_SHINY != 0 || attr & DexAttr::SHINY == 0 {
                DexAttr::NON_SHINY
            } else {
                DexAttr::SHINY
            };
            ret |= if attr & DexAttr::DEFAULT_VARIANT != 0 {
                DexAttr::DEFAULT_VARIANT
            } else if attr & DexAttr::VARIANT_2 != 0 {
                DexAttr::VARIANT_2
            } else if attr & DexAttr::VARIANT_3 != 0 {
                DexAttr::VARIANT_3
            } else {
                DexAttr::DEFAULT_VARIANT
            };
        }
        ret |= if attr & DexAttr::MALE != 0 || attr & DexAttr::FEMALE == 0 {
            DexAttr::MALE
        } else {
            DexAttr::FEMALE
        };
        ret | DexAttr::form(DexAttr::form_index(attr))
    }

    pub fn default_ability_index(&self, catalog: &SpeciesCatalog, species_id: SpeciesId) -> u8 {
        let ability_attr = self.starter_data.get(&species_id).map_or(0, |s| s.ability_attr);
        let has_ability2 = catalog.get(species_id).map_or(true, |s| s.has_ability2);
        if ability_attr & AbilityAttr::ABILITY_1 != 0 {
            0
        } else if !has_ability2 || ability_attr & AbilityAttr::ABILITY_2 != 0 {
            1
        } else {
            2
        }
    }

    /// Lowest unlocked nature, or 0 when none is recorded.
    pub fn default_nature(&self, species_id: SpeciesId) -> u8 {
        let natures = self.dex_data.get(&species_id).map_or(0, DexEntry::natures);
        natures_for_attr(natures).first().copied().unwrap_or(0)
    }

    /// Starter cost after value reductions: each reduction subtracts one
    /// while the value exceeds one, then halves.
    pub fn starter_value(&self, catalog: &SpeciesCatalog, species_id: SpeciesId) -> f64 {
        let mut value = catalog.starter_cost(species_id).unwrap_or(0) as f64;
        let reductions = self.starter_data.get(&species_id).map_or(0, |s| s.value_reduction);
        for _ in 0..reductions {
            if value > 1.0 {
                value -= 1.0;
            } else {
                value /= 2.0;
            }
        }
        value
    }

    pub fn species_count(&self, pred: impl Fn(&DexEntry) -> bool) -> usize {
        self.dex_data.values().filter(|&e| pred(e)).count()
    }

    pub fn starter_count(&self, pred: impl Fn(&StarterDataEntry) -> bool) -> usize {
        self.starter_data.values().filter(|&s| pred(s)).count()
    }
}

/// Candy for a catch: 1, times 5 * 2^variant for shinies, doubled for
/// hatches and bosses.
pub fn candy_award(pokemon: &PokemonInstance, from_egg: bool) -> u32 {
    let shiny_multiplier = if pokemon.shiny { 5 * (1u32 << pokemon.variant.min(2)) } else { 1 };
    let source_multiplier = if from_egg || pokemon.boss { 2 } else { 1 };
    shiny_multiplier * source_multiplier
}

/// Derive ability unlocks from the variant bits that older saves used to
/// track them, then normalise those bits: caught entries end up with the
/// default variant set and the second and third variants cleared.
pub fn migrate_starter_abilities(
    dex_data: &mut BTreeMap<SpeciesId, DexEntry>,
    starters: &mut BTreeMap<SpeciesId, StarterDataEntry>,
) {
    for (id, starter) in starters.iter_mut() {
        let Some(dex) = dex_data.get_mut(id) else { continue };
        let attr = dex.caught_attr;
        starter.ability_attr = (if attr & DexAttr::DEFAULT_VARIANT != 0 { AbilityAttr::ABILITY_1 } else { 0 })
            | (if attr & DexAttr::VARIANT_2 != 0 { AbilityAttr::ABILITY_2 } else { 0 })
            | (if attr & DexAttr::VARIANT_3 != 0 { AbilityAttr::ABILITY_HIDDEN } else { 0 });
        if attr != 0 {
            dex.caught_attr |= DexAttr::DEFAULT_VARIANT;
            dex.caught_attr &= !(DexAttr::VARIANT_2 | DexAttr::VARIANT_3);
        }
    }
}
