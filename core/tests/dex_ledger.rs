//! Dex and starter ledger: catches, candy, natures, ribbons, egg moves.
//!
//! The ledger is monotonic. Every test here checks a gain and then that
//! repeating the action never takes anything away.

use gamedata_core::{
    config::SpeciesCatalog,
    dex::{nature_bit, AbilityAttr, DexAttr, DexEntry, PokemonInstance, NEUTRAL_NATURES},
    dex_ledger::{candy_award, CatchOptions, DexLedger, EncounterContext, DEFAULT_STARTER_ATTR},
    event::SaveEvent,
    rng::{RngBank, RngSlot},
    starter::StarterMoveset,
};
use std::collections::BTreeMap;

fn build_ledger() -> (SpeciesCatalog, DexLedger) {
    let catalog = SpeciesCatalog::default_test();
    let ledger = DexLedger::new(&catalog, &RngBank::new(42));
    (catalog, ledger)
}

fn wild() -> EncounterContext {
    EncounterContext::default()
}

fn candy(ledger: &DexLedger, id: u32) -> u32 {
    ledger.starter(id).map_or(0, |s| s.candy_count)
}

#[test]
fn fresh_ledger_owns_only_default_starters() {
    let (catalog, ledger) = build_ledger();
    for &id in catalog.default_starters() {
        let entry = ledger.entry(id).expect("default starter entry");
        assert_eq!(entry.caught_attr, DEFAULT_STARTER_ATTR);
        assert_eq!(entry.ivs, [15; 6]);
        let nature = entry.natures();
        assert_eq!(nature.count_ones(), 1, "exactly one starting nature for {id}");
        assert!(NEUTRAL_NATURES.iter().any(|n| nature_bit(*n) == nature), "starting nature must be neutral");
        assert_eq!(ledger.starter(id).unwrap().ability_attr, AbilityAttr::ABILITY_1);
    }
    assert!(!ledger.entry(10).unwrap().is_caught());
    assert_eq!(ledger.starter(10).unwrap().ability_attr, 0);
    assert!(ledger.starter(2).is_none(), "evolutions have no starter record");
}

#[test]
fn same_seed_same_starting_natures() {
    let catalog = SpeciesCatalog::default_test();
    let a = DexLedger::new(&catalog, &RngBank::new(7));
    let b = DexLedger::new(&catalog, &RngBank::new(7));
    assert_eq!(a.dex_data, b.dex_data);
}

#[test]
fn first_catch_unlocks_starter_and_awards_candy() {
    let (catalog, mut ledger) = build_ledger();
    let caterpie = PokemonInstance::new(10);

    let unlocked = ledger.mark_caught(&catalog, &caterpie, wild(), CatchOptions::default()).expect("catch");
    assert!(unlocked, "first catch of a starter species must unlock it");

    let entry = ledger.entry(10).unwrap();
    assert_eq!(entry.caught_attr, caterpie.dex_attr());
    assert_eq!(entry.caught_count, 1);
    assert_eq!(ledger.game_stats.pokemon_caught, 1);
    assert_eq!(candy(&ledger, 10), 1);
    assert_eq!(ledger.starter(10).unwrap().ability_attr, AbilityAttr::ABILITY_1);

    let events = ledger.drain_events();
    assert!(events.contains(&SaveEvent::StarterUnlocked { species_id: 10 }));
    assert!(events.contains(&SaveEvent::CandyAwarded { species_id: 10, amount: 1 }));

    let again = ledger.mark_caught(&catalog, &caterpie, wild(), CatchOptions::default()).expect("catch");
    assert!(!again, "second catch unlocks nothing new");
    assert_eq!(candy(&ledger, 10), 2);
    assert_eq!(ledger.entry(10).unwrap().caught_count, 2);
}

#[test]
fn silent_catch_records_without_announcing() {
    let (catalog, mut ledger) = build_ledger();
    let unlocked = ledger
        .mark_caught(&catalog, &PokemonInstance::new(10), wild(), CatchOptions::silent())
        .expect("catch");
    assert!(unlocked);
    let events = ledger.drain_events();
    assert!(!events.iter().any(|e| matches!(e, SaveEvent::StarterUnlocked { .. })));
}

#[test]
fn catching_an_evolution_records_the_whole_lineage() {
    let (catalog, mut ledger) = build_ledger();
    let mut pikachu = PokemonInstance::new(25);
    pikachu.nature = 3;

    let unlocked = ledger.mark_caught(&catalog, &pikachu, wild(), CatchOptions::default()).expect("catch");
    assert!(unlocked, "pichu becomes a starter through the evolved catch");
    for id in [25, 172] {
        let entry = ledger.entry(id).unwrap();
        assert_eq!(entry.caught_attr, pikachu.dex_attr(), "species {id} caught");
        assert_ne!(entry.natures() & nature_bit(3), 0, "species {id} nature");
    }
    assert_eq!(candy(&ledger, 172), 1, "candy goes to the lineage root");
}

#[test]
fn catching_a_final_form_unlocks_a_three_stage_line_once() {
    let (catalog, mut ledger) = build_ledger();
    let butterfree = PokemonInstance::new(12);

    let first = ledger.mark_caught(&catalog, &butterfree, wild(), CatchOptions::default()).expect("catch");
    let second = ledger.mark_caught(&catalog, &butterfree, wild(), CatchOptions::default()).expect("catch");
    assert!(first, "the first catch unlocks caterpie");
    assert!(!second, "the line is already unlocked");

    for id in [12, 11, 10] {
        let entry = ledger.entry(id).unwrap();
        assert_eq!(entry.caught_attr, butterfree.dex_attr(), "species {id} caught");
    }
    assert_eq!(candy(&ledger, 10), 2 * candy_award(&butterfree, false));
    assert!(ledger.starter(11).is_none() && ledger.starter(12).is_none());

    let unlocks = ledger
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, SaveEvent::StarterUnlocked { .. }))
        .count();
    assert_eq!(unlocks, 1);

    let mut shiny_boss = PokemonInstance::new(12);
    shiny_boss.shiny = true;
    shiny_boss.variant = 1;
    shiny_boss.boss = true;
    let before = candy(&ledger, 10);
    let again = ledger.mark_caught(&catalog, &shiny_boss, wild(), CatchOptions::default()).expect("catch");
    assert!(!again);
    assert_eq!(candy_award(&shiny_boss, false), 20);
    assert_eq!(candy(&ledger, 10), before + 20);
    assert_ne!(ledger.entry(10).unwrap().caught_attr & DexAttr::SHINY, 0, "shiny bit reaches the root");
}

#[test]
fn re_recording_an_unowned_lineage_does_nothing() {
    let (catalog, mut ledger) = build_ledger();
    let opts = CatchOptions { increment_count: false, ..CatchOptions::default() };
    let unlocked = ledger.mark_caught(&catalog, &PokemonInstance::new(130), wild(), opts).expect("catch");
    assert!(!unlocked);
    assert!(!ledger.entry(130).unwrap().is_caught());
    assert!(!ledger.entry(129).unwrap().is_caught());
    assert_eq!(ledger.game_stats.pokemon_caught, 0);
}

#[test]
fn re_recording_an_owned_lineage_adds_attrs_without_counts() {
    let (catalog, mut ledger) = build_ledger();
    let mut charizard = PokemonInstance::new(6);
    charizard.female = true;
    let opts = CatchOptions { increment_count: false, ..CatchOptions::default() };

    ledger.mark_caught(&catalog, &charizard, wild(), opts).expect("catch");
    assert_ne!(ledger.entry(6).unwrap().caught_attr & DexAttr::FEMALE, 0);
    assert_eq!(ledger.entry(6).unwrap().caught_count, 0);
    assert_eq!(candy(&ledger, 4), 0);
}

#[test]
fn candy_multipliers() {
    let mut p = PokemonInstance::new(10);
    assert_eq!(candy_award(&p, false), 1);
    assert_eq!(candy_award(&p, true), 2);
    p.boss = true;
    assert_eq!(candy_award(&p, false), 2);
    p.boss = false;
    p.shiny = true;
    assert_eq!(candy_award(&p, false), 5);
    p.variant = 1;
    assert_eq!(candy_award(&p, false), 10);
    p.variant = 2;
    p.boss = true;
    assert_eq!(candy_award(&p, false), 40);
}

#[test]
fn daily_runs_only_award_candy_for_new_attributes() {
    let (catalog, mut ledger) = build_ledger();
    let daily = EncounterContext { daily_mode: true, ..EncounterContext::default() };
    let caterpie = PokemonInstance::new(10);

    ledger.mark_caught(&catalog, &caterpie, daily, CatchOptions::default()).expect("catch");
    assert_eq!(candy(&ledger, 10), 1);
    ledger.mark_caught(&catalog, &caterpie, daily, CatchOptions::default()).expect("catch");
    assert_eq!(candy(&ledger, 10), 1, "same attributes in a daily run earn nothing");

    let mut female = caterpie.clone();
    female.female = true;
    ledger.mark_caught(&catalog, &female, daily, CatchOptions::default()).expect("catch");
    assert_eq!(candy(&ledger, 10), 2, "new attributes earn candy even in a daily run");

    ledger.mark_caught(&catalog, &caterpie, daily, CatchOptions::hatched()).expect("hatch");
    assert_eq!(candy(&ledger, 10), 4, "hatches always earn candy");
}

#[test]
fn hatching_counts_separately() {
    let (catalog, mut ledger) = build_ledger();
    let mut mew = PokemonInstance::new(151);
    mew.shiny = true;
    ledger.mark_caught(&catalog, &mew, wild(), CatchOptions::hatched()).expect("hatch");

    let entry = ledger.entry(151).unwrap();
    assert_eq!(entry.hatched_count, 1);
    assert_eq!(entry.caught_count, 0);
    assert_eq!(ledger.game_stats.pokemon_hatched, 1);
    assert_eq!(ledger.game_stats.mythical_pokemon_hatched, 1);
    assert_eq!(ledger.game_stats.shiny_pokemon_hatched, 1);
    assert_eq!(ledger.game_stats.pokemon_caught, 0);
    assert_eq!(candy(&ledger, 151), 10);
}

#[test]
fn battle_only_forms_record_the_base_form() {
    let (catalog, mut ledger) = build_ledger();
    let mut mega = PokemonInstance::new(150);
    mega.form_index = 1;
    mega.form_key = "mega".into();
    ledger.mark_caught(&catalog, &mega, wild(), CatchOptions::default()).expect("catch");

    let attr = ledger.entry(150).unwrap().caught_attr;
    assert_ne!(attr & DexAttr::DEFAULT_FORM, 0);
    assert_eq!(attr & DexAttr::form(1), 0);
}

#[test]
fn second_ability_on_single_ability_species_is_hidden() {
    let (catalog, mut ledger) = build_ledger();
    let mut karp = PokemonInstance::new(129);
    karp.ability_index = 1;
    ledger.mark_caught(&catalog, &karp, wild(), CatchOptions::default()).expect("catch");
    assert_eq!(ledger.starter(129).unwrap().ability_attr, AbilityAttr::ABILITY_HIDDEN);

    let mut caterpie = PokemonInstance::new(10);
    caterpie.ability_index = 1;
    ledger.mark_caught(&catalog, &caterpie, wild(), CatchOptions::default()).expect("catch");
    assert_eq!(ledger.starter(10).unwrap().ability_attr, AbilityAttr::ABILITY_2);
}

#[test]
fn unknown_species_is_an_error() {
    let (catalog, mut ledger) = build_ledger();
    assert!(ledger.mark_caught(&catalog, &PokemonInstance::new(9999), wild(), CatchOptions::default()).is_err());
    assert!(ledger.mark_seen(&catalog, &PokemonInstance::new(9999), wild(), true, false).is_err());
}

#[test]
fn sightings_respect_suppression_and_trainer_ownership() {
    let (catalog, mut ledger) = build_ledger();
    let mut articuno = PokemonInstance::new(144);
    articuno.shiny = true;

    let suppressed = EncounterContext { suppress_stats: true, ..EncounterContext::default() };
    ledger.mark_seen(&catalog, &articuno, suppressed, true, false).expect("seen");
    assert_eq!(ledger.entry(144).unwrap().seen_attr, 0);
    assert_eq!(ledger.game_stats.pokemon_seen, 0);

    ledger.mark_seen(&catalog, &articuno, wild(), true, true).expect("seen");
    assert_eq!(ledger.entry(144).unwrap().seen_count, 1);
    assert_eq!(ledger.game_stats.pokemon_seen, 1);
    assert_eq!(ledger.game_stats.shiny_pokemon_seen, 0, "trainer-owned pokemon skip the shiny counter");
    assert_eq!(ledger.game_stats.sub_legendary_pokemon_seen, 0);

    ledger.mark_seen(&catalog, &articuno, wild(), true, false).expect("seen");
    assert_eq!(ledger.game_stats.shiny_pokemon_seen, 1);
    assert_eq!(ledger.game_stats.sub_legendary_pokemon_seen, 1);
    assert_eq!(ledger.entry(144).unwrap().seen_attr, articuno.dex_attr());
}

#[test]
fn natures_unlock_only_for_owned_lineages() {
    let (catalog, mut ledger) = build_ledger();
    assert!(ledger.unlock_nature(&catalog, 5, 10));
    assert_ne!(ledger.entry(5).unwrap().natures() & nature_bit(10), 0);
    assert_ne!(ledger.entry(4).unwrap().natures() & nature_bit(10), 0);

    assert!(!ledger.unlock_nature(&catalog, 10, 10), "caterpie has not been caught");
    assert_eq!(ledger.entry(10).unwrap().natures(), 0);
}

#[test]
fn best_ivs_only_rise() {
    let (catalog, mut ledger) = build_ledger();
    assert!(!ledger.update_best_ivs(&catalog, 2, &[20, 5, 31, 0, 16, 10]));
    assert_eq!(ledger.entry(2).unwrap().ivs, [20, 5, 31, 0, 16, 10]);
    assert_eq!(ledger.entry(1).unwrap().ivs, [20, 15, 31, 15, 16, 15]);

    assert!(ledger.update_best_ivs(&catalog, 1, &[31; 6]));
    let events = ledger.drain_events();
    assert!(events.iter().any(|e| matches!(e, SaveEvent::AchievementUnlocked { achievement } if achievement == "PERFECT_IVS")));
}

#[test]
fn first_classic_win_earns_a_ribbon() {
    let (catalog, mut ledger) = build_ledger();
    assert_eq!(ledger.increment_ribbon_count(&catalog, 6, false).expect("ribbon"), 1);
    assert_eq!(ledger.game_stats.ribbons_owned, 1);
    assert_eq!(ledger.starter(4).unwrap().classic_win_count, 1, "wins are credited to the lineage root");

    assert_eq!(ledger.increment_ribbon_count(&catalog, 4, true).expect("ribbon"), 2);
    assert_eq!(ledger.game_stats.ribbons_owned, 1, "only the first win earns a ribbon");
    assert!(ledger.increment_ribbon_count(&catalog, 9999, true).is_err());
}

#[test]
fn ribbon_milestones_raise_achievements() {
    let (catalog, mut ledger) = build_ledger();
    ledger.game_stats.ribbons_owned = 9;
    ledger.increment_ribbon_count(&catalog, 1, true).expect("ribbon");
    let events = ledger.drain_events();
    assert_eq!(
        events,
        vec![SaveEvent::AchievementUnlocked { achievement: "_10_RIBBONS".into() }]
    );
}

#[test]
fn egg_moves_respect_the_species_limit() {
    let (catalog, mut ledger) = build_ledger();
    assert!(ledger.unlock_egg_move(&catalog, 1, 0, true));
    assert!(!ledger.unlock_egg_move(&catalog, 1, 0, true), "already unlocked");
    assert!(ledger.unlock_egg_move(&catalog, 1, 3, true));
    assert_eq!(ledger.starter(1).unwrap().egg_moves, 0b1001);

    assert!(ledger.unlock_egg_move(&catalog, 129, 1, false));
    assert!(!ledger.unlock_egg_move(&catalog, 129, 2, false), "magikarp only has two egg moves");
    assert!(!ledger.unlock_egg_move(&catalog, 1, 4, false));

    let events = ledger.drain_events();
    assert_eq!(
        events,
        vec![
            SaveEvent::EggMoveUnlocked { species_id: 1, index: 0, rare: false },
            SaveEvent::EggMoveUnlocked { species_id: 1, index: 3, rare: true },
        ]
    );
}

#[test]
fn default_attrs_and_values() {
    let (catalog, mut ledger) = build_ledger();
    let mut shiny = PokemonInstance::new(10);
    shiny.shiny = true;
    shiny.variant = 2;
    shiny.female = true;
    ledger.mark_caught(&catalog, &PokemonInstance::new(10), wild(), CatchOptions::default()).expect("catch");
    ledger.mark_caught(&catalog, &shiny, wild(), CatchOptions::default()).expect("catch");

    let optimistic = ledger.default_dex_attr(10, true);
    assert_ne!(optimistic & DexAttr::SHINY, 0);
    assert_ne!(optimistic & DexAttr::VARIANT_3, 0);
    let plain = ledger.default_dex_attr(10, false);
    assert_ne!(plain & DexAttr::NON_SHINY, 0);
    assert_ne!(plain & DexAttr::MALE, 0);
    assert_ne!(plain & DexAttr::DEFAULT_FORM, 0);

    assert_eq!(ledger.default_nature(10), 0, "the neutral nature 0 was recorded by the catch");
    ledger.unlock_nature(&catalog, 129, 5);
    assert_eq!(ledger.default_nature(129), 0, "uncaught lineages have no natures");
    assert_eq!(ledger.default_ability_index(&catalog, 1), 0);
    assert_eq!(ledger.default_ability_index(&catalog, 150), 1, "single-ability species default to slot 1");

    ledger.starter_data.get_mut(&1).unwrap().value_reduction = 4;
    assert_eq!(ledger.starter_value(&catalog, 1), 0.25);
    assert_eq!(ledger.starter_value(&catalog, 4), 3.0);

    assert_eq!(ledger.species_count(DexEntry::is_caught), 4);
    assert_eq!(ledger.starter_count(|s| s.candy_count > 0), 1);
}

#[test]
fn consolidation_fills_missing_natures() {
    let (_, mut ledger) = build_ledger();
    let baseline = ledger.entry(1).unwrap().nature_attr;
    ledger.dex_data.get_mut(&1).unwrap().nature_attr = Some(0);
    {
        let caterpie = ledger.dex_data.get_mut(&10).unwrap();
        caterpie.caught_attr = DexAttr::NON_SHINY | DexAttr::MALE | DexAttr::DEFAULT_VARIANT | DexAttr::DEFAULT_FORM;
        caterpie.nature_attr = None;
    }

    let mut rng = RngBank::new(42).for_slot(RngSlot::Consolidation);
    ledger.consolidate(&mut rng);

    assert_eq!(ledger.entry(1).unwrap().nature_attr, baseline, "default starters regain their fresh nature");
    assert_eq!(ledger.entry(10).unwrap().natures().count_ones(), 1);
    assert_eq!(ledger.entry(2).unwrap().nature_attr, Some(0), "uncaught entries stay empty");
}

#[test]
fn legacy_starter_data_is_rebuilt_from_dex() {
    let catalog = SpeciesCatalog::default_test();
    let mut dex: BTreeMap<u32, DexEntry> = BTreeMap::new();
    dex.insert(
        10,
        DexEntry {
            caught_attr: DexAttr::NON_SHINY | DexAttr::SHINY | DexAttr::MALE | DexAttr::VARIANT_2 | DexAttr::DEFAULT_FORM,
            caught_count: 3,
            hatched_count: 1,
            ..DexEntry::default()
        },
    );
    let movesets = BTreeMap::from([(10, StarterMoveset::Moves(vec![33, 81]))]);
    let egg_moves = BTreeMap::from([(10, 0b0101)]);

    let starters = DexLedger::rebuild_legacy_starter_data(&catalog, &mut dex, Some(movesets), Some(egg_moves));
    let caterpie = &starters[&10];
    assert_eq!(caterpie.ability_attr, AbilityAttr::ABILITY_2);
    assert_eq!(caterpie.candy_count, 3 + 2 + 4);
    assert_eq!(caterpie.egg_moves, 0b0101);
    assert_eq!(caterpie.moveset, Some(StarterMoveset::Moves(vec![33, 81])));

    let attr = dex[&10].caught_attr;
    assert_ne!(attr & DexAttr::DEFAULT_VARIANT, 0);
    assert_eq!(attr & DexAttr::VARIANT_2, 0);
    assert!(starters.contains_key(&1), "every catalog starter gets a record");
}
