//! Save-data persistence core: codec, schema migration, the dex and
//! starter ledger, run history, and the coordinator that moves account
//! state between memory, local storage and the account server.

pub mod clock;
pub mod codec;
pub mod config;
pub mod dex;
pub mod dex_ledger;
pub mod error;
pub mod event;
pub mod game_data;
pub mod game_stats;
pub mod migration;
pub mod modifier_registry;
pub mod prefs;
pub mod remote;
pub mod rng;
pub mod run_history;
pub mod snapshot;
pub mod starter;
pub mod store;
pub mod transfer;
pub mod types;
