//! Persistence coordinator.
//!
//! `GameData` owns the account's in-memory save state (dex ledger,
//! unlocks, eggs, counters) and moves it between three places: memory,
//! local storage, and the remote account server. Local storage is always
//! written before the server.
//!
//! Outcome rules at this boundary:
//! - absent data (new account, empty slot) is not an error;
//! - remote failures are logged and reported as `false`;
//! - a stale or conflicting session queues a reload event.

use crate::clock::SaveClock;
use crate::codec::SaveCodec;
use crate::config::{GameDataConfig, SpeciesCatalog};
use crate::dex::PokemonInstance;
use crate::dex_ledger::{CatchOptions, DexLedger, EncounterContext};
use crate::error::{SaveError, SaveResult};
use crate::event::SaveEvent;
use crate::migration;
use crate::modifier_registry::ModifierRegistry;
use crate::prefs::Prefs;
use crate::remote::{ApiIdentity, OfflineSaveApi, RemoteError, SaveApi};
use crate::rng::{RngBank, RngSlot};
use crate::run_history::RunHistory;
use crate::snapshot::{GameMode, PlayerGender, SessionSaveData, SystemSaveData};
use crate::store::{keys, SaveStore};
use crate::types::{SaveCategory, SlotId, SpeciesId, Timestamp};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const PLAYER_GENDER_SETTING: &str = "PLAYER_GENDER";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    Loaded,
    Saving,
    Verifying,
    /// Another client holds newer data; a reload has been queued.
    ConflictDetected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveAllOptions {
    /// Push both saves to the server in one request. Without it the
    /// server copy is only verified.
    pub sync:               bool,
    /// Re-write the locally cached session instead of `session`.
    pub use_cached_session: bool,
    /// Re-write the locally cached system save instead of current state.
    pub use_cached_system:  bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOutcome {
    pub success:   bool,
    /// First clear of this run's seed.
    pub new_clear: bool,
}

/// A session save with its modifiers rebuilt, handed to the game to
/// reconstruct battle state.
pub struct LoadedSession<M> {
    pub data:            SessionSaveData,
    pub modifiers:       Vec<M>,
    pub enemy_modifiers: Vec<M>,
}

pub struct GameData {
    pub(crate) config:            GameDataConfig,
    pub(crate) catalog:           SpeciesCatalog,
    pub(crate) store:             SaveStore,
    pub(crate) api:               Arc<dyn SaveApi>,
    pub(crate) codec:             SaveCodec,
    pub(crate) clock:             SaveClock,
    rng_bank:                     RngBank,
    client_session_id:            String,
    state:                        LoadState,
    pub trainer_id:               u32,
    pub secret_id:                u32,
    pub gender:                   PlayerGender,
    pub(crate) ledger:            DexLedger,
    pub unlocks:                  BTreeMap<u32, bool>,
    pub achv_unlocks:             BTreeMap<String, Timestamp>,
    pub voucher_unlocks:          BTreeMap<String, Timestamp>,
    pub voucher_counts:           BTreeMap<u32, u32>,
    pub eggs:                     Vec<Value>,
    pub egg_pity:                 Vec<u32>,
    pub unlock_pity:              Vec<u32>,
    pub(crate) events:            Vec<SaveEvent>,
}

fn timestamp_of(data: &Value) -> Timestamp {
    data.get("timestamp").and_then(Value::as_i64).unwrap_or(0)
}

impl GameData {
    /// Build a coordinator for a fresh account. Applies store migrations.
    pub fn new(
        config: GameDataConfig,
        catalog: SpeciesCatalog,
        store: SaveStore,
        api: Arc<dyn SaveApi>,
    ) -> SaveResult<Self> {
        store.migrate()?;
        let rng_bank = RngBank::new(config.seed);
        let mut id_rng = rng_bank.for_slot(RngSlot::AccountIds);
        let trainer_id = id_rng.next_u64_below(65_536) as u32;
        let secret_id = id_rng.next_u64_below(65_536) as u32;
        let ledger = DexLedger::new(&catalog, &rng_bank);
        let client_session_id = uuid::Uuid::new_v4().to_string();
        log::info!("Client session {client_session_id} for {}", config.username);

        Ok(Self {
            codec: SaveCodec::new(&config.save_key, config.offline),
            unlocks: config.unlockables.iter().map(|u| (*u, false)).collect(),
            voucher_counts: config.voucher_types.iter().map(|t| (*t, 0)).collect(),
            config,
            catalog,
            store,
            api,
            clock: SaveClock::wall(),
            rng_bank,
            client_session_id,
            state: LoadState::Uninitialized,
            trainer_id,
            secret_id,
            gender: PlayerGender::Unset,
            ledger,
            achv_unlocks: BTreeMap::new(),
            voucher_unlocks: BTreeMap::new(),
            eggs: Vec::new(),
            egg_pity: vec![0; 4],
            unlock_pity: vec![0; 4],
            events: Vec::new(),
        })
    }

    /// Offline coordinator over an in-memory store with the test catalog
    /// and a fixed clock.
    pub fn build_test(username: &str, seed: u64) -> SaveResult<Self> {
        let config = GameDataConfig {
            username: username.to_string(),
            seed,
            ..GameDataConfig::default_test()
        };
        let game = Self::new(config, SpeciesCatalog::default_test(), SaveStore::in_memory()?, Arc::new(OfflineSaveApi))?;
        Ok(game.with_clock(SaveClock::fixed(1_700_000_000_000)))
    }

    pub fn with_clock(mut self, clock: SaveClock) -> Self {
        self.clock = clock;
        self
    }

    /// Give up the coordinator, keeping its storage.
    pub fn into_store(self) -> SaveStore {
        self.store
    }

    // ── Accessors ──────────────────────────────────

    pub fn config(&self) -> &GameDataConfig { &self.config }
    pub fn catalog(&self) -> &SpeciesCatalog { &self.catalog }
    pub fn store(&self) -> &SaveStore { &self.store }
    pub fn codec(&self) -> &SaveCodec { &self.codec }
    pub fn ledger(&self) -> &DexLedger { &self.ledger }
    pub fn state(&self) -> LoadState { self.state }
    pub fn client_session_id(&self) -> &str { &self.client_session_id }

    pub fn ledger_mut(&mut self) -> &mut DexLedger {
        &mut self.ledger
    }

    pub fn prefs(&self) -> Prefs<'_> {
        Prefs::new(&self.store, &self.config.username, &self.config.game_version)
    }

    pub fn run_history(&self) -> RunHistory<'_> {
        RunHistory::new(&self.store, &self.codec, &self.config.username, self.config.run_history_limit)
    }

    /// Drain queued notifications, oldest first.
    pub fn take_events(&mut self) -> Vec<SaveEvent> {
        self.absorb_ledger_events();
        std::mem::take(&mut self.events)
    }

    pub(crate) fn identity(&self, slot: Option<SlotId>) -> ApiIdentity {
        let identity = ApiIdentity::new(self.client_session_id.clone());
        match slot {
            Some(slot) => identity.with_slot(slot),
            None => identity,
        }
    }

    pub(crate) fn check_slot(&self, slot: SlotId) -> SaveResult<()> {
        if slot >= self.config.session_slots {
            return Err(SaveError::InvalidSlot(slot));
        }
        Ok(())
    }

    pub(crate) fn on_remote_failure(&mut self, action: &str, err: &RemoteError) {
        log::error!("Remote {action} failed: {err}");
        if *err == RemoteError::SessionOutOfDate {
            if let Err(e) = self.store.clear_session_caches(&self.config.username, self.config.session_slots) {
                log::error!("Failed to purge stale session caches: {e}");
            }
            self.events.push(SaveEvent::PhaseQueueCleared);
            self.events.push(SaveEvent::ReloadScheduled { snapshot: None });
        }
    }

    fn notice(&mut self, message: impl Into<String>) {
        self.events.push(SaveEvent::Notice { message: message.into() });
    }

    // ── System data ────────────────────────────────

    /// Snapshot the current account state with a fresh timestamp.
    pub fn system_save_data(&mut self) -> SystemSaveData {
        SystemSaveData {
            trainer_id:            self.trainer_id,
            secret_id:             self.secret_id,
            gender:                self.gender,
            dex_data:              self.ledger.dex_data.clone(),
            starter_data:          Some(self.ledger.starter_data.clone()),
            game_stats:            self.ledger.game_stats.clone(),
            unlocks:               self.unlocks.clone(),
            achv_unlocks:          self.achv_unlocks.clone(),
            voucher_unlocks:       self.voucher_unlocks.clone(),
            voucher_counts:        self.voucher_counts.clone(),
            eggs:                  self.eggs.clone(),
            game_version:          self.config.game_version.clone(),
            timestamp:             self.clock.next_timestamp(),
            egg_pity:              self.egg_pity.clone(),
            unlock_pity:           self.unlock_pity.clone(),
            starter_move_data:     None,
            starter_egg_move_data: None,
        }
    }

    /// Load the system save. Offline, the local copy is used. Online, the
    /// server copy is fetched and reconciled with the local cache.
    /// A missing save is a fresh account and counts as success.
    pub async fn load_system(&mut self) -> bool {
        let key = keys::system_key(&self.config.username);
        let cached = match self.store.get_item(&key) {
            Ok(cached) => cached,
            Err(e) => {
                log::error!("Could not read cached system save: {e}");
                return false;
            }
        };
        let cached = cached.and_then(|stored| match self.codec.decode(&stored) {
            Ok(plain) => Some(plain),
            Err(e) => {
                log::warn!("Ignoring undecodable cached system save: {e}");
                None
            }
        });

        if self.config.offline {
            return match cached {
                Some(plain) => self.init_system(&plain, None),
                None => {
                    log::info!("No local system save for {}, starting fresh", self.config.username);
                    self.state = LoadState::Loaded;
                    true
                }
            };
        }

        let identity = self.identity(None);
        let remote = match self.api.get_system(&identity).await {
            Ok(Some(raw)) if raw.starts_with('{') => Ok(raw),
            Ok(Some(raw)) => Err(RemoteError::from_response(&raw)),
            Ok(None) => Err(RemoteError::NotFound),
            Err(e) => Err(e),
        };
        match remote {
            Ok(raw) => self.init_system(&raw, cached.as_deref()),
            Err(RemoteError::NotFound) => {
                log::info!("No server save for {}, new account", self.config.username);
                self.notice("Save data could not be found. If this is a new account, you can safely ignore this message.");
                self.state = LoadState::Loaded;
                true
            }
            Err(RemoteError::ServerCapacity) => {
                log::error!("System load refused: server over capacity");
                self.notice("Too many people are trying to connect and the server is overloaded. Please try again later.");
                false
            }
            Err(e) => {
                log::error!("System load failed: {e}");
                false
            }
        }
    }

    /// Apply serialized system data. When a local cache with a newer
    /// timestamp is given, it wins and every cached session is purged.
    pub fn init_system(&mut self, system: &str, cached: Option<&str>) -> bool {
        match self.try_init_system(system, cached) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to initialise system data: {e}");
                false
            }
        }
    }

    fn try_init_system(&mut self, system: &str, cached: Option<&str>) -> SaveResult<()> {
        let mut chosen: Value = serde_json::from_str(system)?;
        let mut chosen_text = system.to_string();
        if let Some(cached) = cached {
            match serde_json::from_str::<Value>(cached) {
                Ok(local) if timestamp_of(&local) > timestamp_of(&chosen) => {
                    log::info!("Local system save is newer than the server copy, using it");
                    chosen = local;
                    chosen_text = cached.to_string();
                    self.store.clear_session_caches(&self.config.username, self.config.session_slots)?;
                }
                Ok(_) => {}
                Err(e) => log::warn!("Ignoring unreadable cached system save: {e}"),
            }
        }

        self.store
            .set_item(&keys::system_key(&self.config.username), &self.codec.encode(&chosen_text)?)?;
        self.run_history().ensure_key()?;

        migration::migrate(&mut chosen, SaveCategory::System, &self.config.game_version);
        let data: SystemSaveData = serde_json::from_value(chosen)?;
        self.apply_system_data(data)
    }

    fn apply_system_data(&mut self, mut data: SystemSaveData) -> SaveResult<()> {
        self.clock.observe(data.timestamp);
        self.trainer_id = data.trainer_id;
        self.secret_id = data.secret_id;
        self.gender = data.gender;
        self.prefs()
            .save_setting(PLAYER_GENDER_SETTING, i64::from(data.gender == PlayerGender::Female))?;

        let starters = match data.starter_data.take() {
            Some(starters) => starters,
            None => {
                log::info!("Rebuilding starter data from legacy fields");
                DexLedger::rebuild_legacy_starter_data(
                    &self.catalog,
                    &mut data.dex_data,
                    data.starter_move_data.take(),
                    data.starter_egg_move_data.take(),
                )
            }
        };
        self.ledger.replace_starter_data(&self.catalog, starters);
        self.ledger.game_stats = data.game_stats;

        for (id, unlocked) in data.unlocks {
            if let Some(current) = self.unlocks.get_mut(&id) {
                *current |= unlocked;
            }
        }
        for (id, ts) in data.achv_unlocks {
            if self.config.achievements.contains(&id) {
                self.achv_unlocks.entry(id).or_insert(ts);
            }
        }
        for (id, ts) in data.voucher_unlocks {
            if self.config.vouchers.contains(&id) {
                self.voucher_unlocks.entry(id).or_insert(ts);
            }
        }
        for voucher_type in &self.config.voucher_types {
            let count = data.voucher_counts.get(voucher_type).copied().unwrap_or(0);
            self.voucher_counts.insert(*voucher_type, count);
        }
        self.eggs = data.eggs;
        self.egg_pity = if data.egg_pity.is_empty() { vec![0; 4] } else { data.egg_pity };
        self.unlock_pity = if data.unlock_pity.is_empty() { vec![0; 4] } else { data.unlock_pity };

        self.ledger.merge_dex_data(data.dex_data);
        let mut rng = self.rng_bank.for_slot(RngSlot::Consolidation);
        self.ledger.consolidate(&mut rng);
        self.ledger.drop_baseline();

        self.state = LoadState::Loaded;
        log::debug!("System data applied ({} dex entries)", self.ledger.dex_data.len());
        Ok(())
    }

    fn write_system_locally(&mut self) -> SaveResult<String> {
        let data = self.system_save_data();
        let text = serde_json::to_string(&data)?;
        self.store
            .set_item(&keys::system_key(&self.config.username), &self.codec.encode(&text)?)?;
        Ok(text)
    }

    /// Write the system save locally, then to the server when online.
    pub async fn save_system(&mut self) -> bool {
        self.state = LoadState::Saving;
        let text = match self.write_system_locally() {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to write system save: {e}");
                self.state = LoadState::Loaded;
                return false;
            }
        };
        if self.config.offline {
            self.state = LoadState::Loaded;
            return true;
        }
        let identity = self.identity(None);
        let outcome = self.api.update_system(&identity, &text).await;
        self.state = LoadState::Loaded;
        match outcome {
            Ok(()) => true,
            Err(e) => {
                self.on_remote_failure("system save", &e);
                false
            }
        }
    }

    /// Ask the server whether this client still holds the newest save.
    /// On conflict, local data is purged, a reload carrying the server
    /// snapshot is queued, and false is returned.
    pub async fn verify(&mut self) -> bool {
        if self.config.offline {
            return true;
        }
        self.state = LoadState::Verifying;
        let identity = self.identity(None);
        match self.api.verify_system(&identity).await {
            Ok(Some(snapshot)) => {
                log::warn!("Another client holds newer save data, reloading");
                self.events.push(SaveEvent::PhaseQueueCleared);
                self.events.push(SaveEvent::ReloadScheduled { snapshot: Some(snapshot) });
                if let Err(e) = self.clear_local_data() {
                    log::error!("Failed to clear local data: {e}");
                }
                self.state = LoadState::ConflictDetected;
                false
            }
            Ok(None) => {
                self.state = LoadState::Loaded;
                true
            }
            Err(e) => {
                log::warn!("Save verification unavailable: {e}");
                self.state = LoadState::Loaded;
                true
            }
        }
    }

    /// Drop the cached system save and every cached session. Offline
    /// storage is the only copy and is never cleared.
    pub fn clear_local_data(&self) -> SaveResult<()> {
        if self.config.offline {
            return Ok(());
        }
        self.store.remove_item(&keys::system_key(&self.config.username))?;
        self.store.clear_session_caches(&self.config.username, self.config.session_slots)?;
        Ok(())
    }

    // ── Sessions ───────────────────────────────────

    /// Decode, migrate and sanitize serialized session data.
    pub fn parse_session(&self, text: &str) -> SaveResult<SessionSaveData> {
        let mut value: Value = serde_json::from_str(text)?;
        migration::migrate(&mut value, SaveCategory::Session, &self.config.game_version);
        let mut session: SessionSaveData = serde_json::from_value(value)?;
        session.sanitize();
        session.validate()?;
        Ok(session)
    }

    /// Session in `slot`. Online, a slot with no local copy is fetched from
    /// the server and cached.
    pub async fn get_session(&self, slot: SlotId) -> SaveResult<Option<SessionSaveData>> {
        self.check_slot(slot)?;
        let key = keys::session_key(slot, &self.config.username);
        let text = match self.store.get_item(&key)? {
            Some(stored) => self.codec.decode(&stored)?,
            None if self.config.offline => return Ok(None),
            None => {
                let identity = self.identity(Some(slot));
                match self.api.get_session(&identity).await {
                    Ok(Some(raw)) if raw.starts_with('{') => {
                        self.store.set_item(&key, &self.codec.encode(&raw)?)?;
                        raw
                    }
                    Ok(Some(raw)) => match RemoteError::from_response(&raw) {
                        RemoteError::NotFound => return Ok(None),
                        e => return Err(e.into()),
                    },
                    Ok(None) | Err(RemoteError::NotFound) => return Ok(None),
                    Err(e) => return Err(e.into()),
                }
            }
        };
        self.parse_session(&text).map(Some)
    }

    /// Load the session in `slot` and hand it to `restore`. Returns false
    /// when the slot is empty or anything fails.
    pub async fn load_session<M, F>(&mut self, slot: SlotId, registry: &ModifierRegistry<M>, restore: F) -> bool
    where
        F: FnOnce(LoadedSession<M>) -> anyhow::Result<()>,
    {
        let session = match self.get_session(slot).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                log::info!("No session in slot {slot}");
                return false;
            }
            Err(e) => {
                log::error!("Failed to load session {slot}: {e}");
                return false;
            }
        };
        self.restore_session(session, registry, restore)
    }

    /// Rebuild modifiers for an already-decoded session and hand it to
    /// `restore`. Raises the highest-money stat if the run exceeds it.
    pub fn restore_session<M, F>(&mut self, session: SessionSaveData, registry: &ModifierRegistry<M>, restore: F) -> bool
    where
        F: FnOnce(LoadedSession<M>) -> anyhow::Result<()>,
    {
        let stats = &mut self.ledger.game_stats;
        stats.highest_money = stats.highest_money.max(session.money);
        self.clock.observe(session.timestamp);

        let modifiers = registry.rebuild_all(&session.modifiers);
        let enemy_modifiers = registry.rebuild_all(&session.enemy_modifiers);
        match restore(LoadedSession { data: session, modifiers, enemy_modifiers }) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to restore session: {e:#}");
                false
            }
        }
    }

    fn cached_text(&self, key: &str, use_cached: bool) -> SaveResult<Option<String>> {
        if !use_cached {
            return Ok(None);
        }
        match self.store.get_item(key)? {
            Some(stored) => Ok(Some(self.codec.decode(&stored)?)),
            None => Ok(None),
        }
    }

    /// Write the system save and `session` into `slot` locally, then push
    /// both to the server (`sync`) or verify the server copy.
    pub async fn save_all(&mut self, session: &SessionSaveData, slot: SlotId, opts: SaveAllOptions) -> bool {
        match self.try_save_all(session, slot, opts).await {
            Ok(saved) => saved,
            Err(e) => {
                log::error!("Failed to save session {slot}: {e}");
                self.state = LoadState::Loaded;
                false
            }
        }
    }

    async fn try_save_all(&mut self, session: &SessionSaveData, slot: SlotId, opts: SaveAllOptions) -> SaveResult<bool> {
        self.check_slot(slot)?;
        self.state = LoadState::Saving;
        let system_key = keys::system_key(&self.config.username);
        let session_key = keys::session_key(slot, &self.config.username);

        let system_text = match self.cached_text(&system_key, opts.use_cached_system)? {
            Some(text) => text,
            None => serde_json::to_string(&self.system_save_data())?,
        };
        let session_text = match self.cached_text(&session_key, opts.use_cached_session)? {
            Some(text) => text,
            None => {
                let mut stamped = session.clone();
                stamped.game_version = self.config.game_version.clone();
                stamped.timestamp = self.clock.next_timestamp();
                serde_json::to_string(&stamped)?
            }
        };

        self.store.set_item(&system_key, &self.codec.encode(&system_text)?)?;
        self.store.set_item(&session_key, &self.codec.encode(&session_text)?)?;
        self.state = LoadState::Loaded;

        if self.config.offline {
            return Ok(true);
        }
        if !opts.sync {
            return Ok(self.verify().await);
        }
        let identity = self.identity(Some(slot)).with_account(self.trainer_id, self.secret_id);
        match self.api.update_all(&identity, &system_text, &session_text).await {
            Ok(()) => Ok(true),
            Err(e) => {
                self.on_remote_failure("save", &e);
                Ok(false)
            }
        }
    }

    /// Remove the session in `slot` from the server (online) and locally.
    pub async fn delete_session(&mut self, slot: SlotId) -> bool {
        if let Err(e) = self.check_slot(slot) {
            log::error!("{e}");
            return false;
        }
        if !self.config.offline {
            let identity = self.identity(Some(slot));
            if let Err(e) = self.api.delete_session(&identity).await {
                self.on_remote_failure("session delete", &e);
                return false;
            }
        }
        match self.store.remove_item(&keys::session_key(slot, &self.config.username)) {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to remove local session {slot}: {e}");
                false
            }
        }
    }

    /// Clear a finished run's session. Offline every clear counts as new;
    /// see `offline_new_clear` for the daily-run rule.
    pub async fn try_clear_session(&mut self, session: &SessionSaveData, slot: SlotId) -> ClearOutcome {
        let failed = ClearOutcome { success: false, new_clear: false };
        if let Err(e) = self.check_slot(slot) {
            log::error!("{e}");
            return failed;
        }
        let key = keys::session_key(slot, &self.config.username);
        let new_clear = if self.config.offline {
            true
        } else {
            let raw = match serde_json::to_string(session) {
                Ok(raw) => raw,
                Err(e) => {
                    log::error!("Failed to serialize session {slot}: {e}");
                    return failed;
                }
            };
            let identity = self.identity(Some(slot)).with_account(self.trainer_id, self.secret_id);
            match self.api.clear_session(&identity, &raw).await {
                Ok(new_clear) => new_clear,
                Err(e) => {
                    self.on_remote_failure("session clear", &e);
                    return failed;
                }
            }
        };
        if let Err(e) = self.store.remove_item(&key) {
            log::error!("Failed to remove local session {slot}: {e}");
        }
        ClearOutcome { success: true, new_clear }
    }

    /// Offline first-clear rule: a daily run's seed counts once; every
    /// other mode always counts.
    pub fn offline_new_clear(&self, session: &SessionSaveData) -> SaveResult<bool> {
        if session.game_mode != GameMode::Daily {
            return Ok(true);
        }
        self.prefs().record_daily_clear(&session.seed)
    }

    // ── Ledger operations ──────────────────────────

    fn absorb_ledger_events(&mut self) {
        for event in self.ledger.drain_events() {
            if let SaveEvent::AchievementUnlocked { achievement } = &event {
                if !self.unlock_achievement(achievement) {
                    continue;
                }
            }
            self.events.push(event);
        }
    }

    pub fn mark_seen(&mut self, pokemon: &PokemonInstance, ctx: EncounterContext, increment_count: bool, trainer_owned: bool) -> SaveResult<()> {
        self.ledger.mark_seen(&self.catalog, pokemon, ctx, increment_count, trainer_owned)
    }

    pub fn mark_caught(&mut self, pokemon: &PokemonInstance, ctx: EncounterContext, opts: CatchOptions) -> SaveResult<bool> {
        let unlocked = self.ledger.mark_caught(&self.catalog, pokemon, ctx, opts);
        self.absorb_ledger_events();
        unlocked
    }

    pub fn add_starter_candy(&mut self, species_id: SpeciesId, amount: u32) {
        self.ledger.add_starter_candy(&self.catalog, species_id, amount);
        self.absorb_ledger_events();
    }

    pub fn unlock_nature(&mut self, species_id: SpeciesId, nature: u8) -> bool {
        self.ledger.unlock_nature(&self.catalog, species_id, nature)
    }

    pub fn update_best_ivs(&mut self, species_id: SpeciesId, ivs: &[u8; 6]) -> bool {
        let perfect = self.ledger.update_best_ivs(&self.catalog, species_id, ivs);
        self.absorb_ledger_events();
        perfect
    }

    pub fn increment_ribbon_count(&mut self, species_id: SpeciesId, for_starter: bool) -> SaveResult<u32> {
        let wins = self.ledger.increment_ribbon_count(&self.catalog, species_id, for_starter);
        self.absorb_ledger_events();
        wins
    }

    pub fn unlock_egg_move(&mut self, species_id: SpeciesId, index: u8, announce: bool) -> bool {
        let unlocked = self.ledger.unlock_egg_move(&self.catalog, species_id, index, announce);
        self.absorb_ledger_events();
        unlocked
    }

    // ── Unlocks ────────────────────────────────────

    /// Record an achievement. Returns false for unknown or already
    /// unlocked achievements.
    pub fn unlock_achievement(&mut self, id: &str) -> bool {
        if !self.config.achievements.iter().any(|a| a == id) {
            log::debug!("Ignoring unknown achievement {id}");
            return false;
        }
        if self.achv_unlocks.contains_key(id) {
            return false;
        }
        let ts = self.clock.now();
        self.achv_unlocks.insert(id.to_string(), ts);
        true
    }

    pub fn unlock_voucher(&mut self, id: &str) -> bool {
        if !self.config.vouchers.iter().any(|v| v == id) || self.voucher_unlocks.contains_key(id) {
            return false;
        }
        let ts = self.clock.now();
        self.voucher_unlocks.insert(id.to_string(), ts);
        true
    }

    /// Unlock a known unlockable. Unlocks are never revoked.
    pub fn set_unlocked(&mut self, unlockable: u32) -> bool {
        match self.unlocks.get_mut(&unlockable) {
            Some(unlocked) => {
                *unlocked = true;
                true
            }
            None => false,
        }
    }
}
