//! Run history: bounded, timestamp-keyed, favorites toggle in place.

use gamedata_core::{
    config::{GameDataConfig, SpeciesCatalog},
    game_data::GameData,
    remote::OfflineSaveApi,
    run_history::{insert_bounded, RunHistoryData},
    snapshot::{GameMode, SessionSaveData},
    store::SaveStore,
};
use std::sync::Arc;

fn run(timestamp: i64) -> SessionSaveData {
    SessionSaveData::new(format!("seed-{timestamp}"), GameMode::Classic, timestamp)
}

fn build_with_limit(limit: usize) -> GameData {
    let config = GameDataConfig { run_history_limit: limit, ..GameDataConfig::default_test() };
    GameData::new(config, SpeciesCatalog::default_test(), SaveStore::in_memory().expect("in-memory store"), Arc::new(OfflineSaveApi))
        .expect("build game data")
}

#[test]
fn full_history_evicts_the_oldest_run() {
    let mut history = RunHistoryData::new();
    for ts in 1..=25 {
        insert_bounded(&mut history, run(ts), ts % 2 == 0, 25);
    }
    assert_eq!(history.len(), 25);

    insert_bounded(&mut history, run(26), true, 25);
    assert_eq!(history.len(), 25);
    assert_eq!(history.keys().next(), Some(&2), "timestamp 1 must have been evicted");
    assert!(history[&26].is_victory);
    assert!(!history[&26].is_favorite);
}

#[test]
fn eviction_is_by_timestamp_not_insertion_order() {
    let mut history = RunHistoryData::new();
    for ts in [30, 10, 20] {
        insert_bounded(&mut history, run(ts), false, 3);
    }
    insert_bounded(&mut history, run(5), false, 3);
    let keys: Vec<i64> = history.keys().copied().collect();
    assert_eq!(keys, vec![5, 20, 30]);
}

#[test]
fn zero_limit_keeps_one_run() {
    let mut history = RunHistoryData::new();
    insert_bounded(&mut history, run(1), false, 0);
    insert_bounded(&mut history, run(2), false, 0);
    assert_eq!(history.keys().copied().collect::<Vec<_>>(), vec![2]);
}

#[test]
fn empty_storage_reads_as_empty_history() {
    let game = build_with_limit(5);
    assert!(!game.store().has_item("runHistoryData_tester").unwrap());
    let history = game.run_history().load().expect("load");
    assert!(history.is_empty());
    assert_eq!(game.store().get_item("runHistoryData_tester").unwrap().as_deref(), Some(""));
}

#[test]
fn stored_history_is_bounded_and_encoded() {
    let game = build_with_limit(3);
    let runs = game.run_history();
    for ts in 100..105 {
        runs.append(run(ts), ts == 104).expect("append");
    }
    let history = runs.load().expect("load");
    assert_eq!(history.keys().copied().collect::<Vec<_>>(), vec![102, 103, 104]);
    assert!(history[&104].is_victory);

    let raw = game.store().get_item("runHistoryData_tester").unwrap().unwrap();
    assert!(!raw.contains("seed-104"), "run history is stored through the codec");
}

#[test]
fn favorites_toggle_in_place() {
    let game = build_with_limit(5);
    let runs = game.run_history();
    runs.append(run(7), false).expect("append");

    assert!(runs.set_favorite(7, true).expect("favorite"));
    assert!(runs.load().unwrap()[&7].is_favorite);
    assert!(runs.set_favorite(7, false).expect("unfavorite"));
    assert!(!runs.load().unwrap()[&7].is_favorite);
    assert!(!runs.set_favorite(8, true).expect("missing run"));
}
