use crate::types::SpeciesId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Default key material for strong-mode save encryption.
pub const DEFAULT_SAVE_KEY: &str = "gd-save-core:v1:7c2e19f0";

// ── Game data config ───────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameDataConfig {
    /// Current application version. Loaded data is migrated up to this.
    pub game_version:      String,
    pub username:          String,
    /// Offline mode skips every remote call and stores with the weak codec.
    pub offline:           bool,
    pub session_slots:     u8,
    pub run_history_limit: usize,
    pub save_key:          String,
    pub seed:              u64,
    /// Unlockable ids that may be carried over from a loaded save.
    pub unlockables:       Vec<u32>,
    pub achievements:      Vec<String>,
    pub vouchers:          Vec<String>,
    /// Voucher type ids counted in `voucherCounts`.
    pub voucher_types:     Vec<u32>,
    pub tutorials:         Vec<String>,
}

impl Default for GameDataConfig {
    fn default() -> Self {
        Self {
            game_version:      "1.1.0".into(),
            username:          "guest".into(),
            offline:           true,
            session_slots:     5,
            run_history_limit: 25,
            save_key:          DEFAULT_SAVE_KEY.into(),
            seed:              0x5eed_0001,
            unlockables:       vec![0, 1, 2, 3],
            achievements:      [
                "_10_RIBBONS",
                "_25_RIBBONS",
                "_50_RIBBONS",
                "_75_RIBBONS",
                "_100_RIBBONS",
                "PERFECT_IVS",
                "CLASSIC_VICTORY",
                "HATCH_SHINY",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            vouchers:          ["CLASSIC_VICTORY", "UNLOCK_ENDLESS", "HATCH_SHINY"]
                .into_iter()
                .map(String::from)
                .collect(),
            voucher_types:     vec![0, 1, 2, 3],
            tutorials:         ["INTRO", "ACCESS_MENU", "MENU", "STARTER_SELECT", "POKERUS", "STAT_CHANGE", "SELECT_ITEM", "EGG_GACHA"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl GameDataConfig {
    /// Load `{data_dir}/config.json`. Missing fields fall back to defaults;
    /// a missing file yields the defaults.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/config.json");
        if !std::path::Path::new(&path).exists() {
            log::info!("No {path}, using default config");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: Self = serde_json::from_str(&content)?;
        if config.session_slots == 0 {
            anyhow::bail!("{path}: session_slots must be at least 1");
        }
        Ok(config)
    }

    /// Config for tests: offline, fixed seed, `tester` account.
    pub fn default_test() -> Self {
        Self {
            username: "tester".into(),
            seed:     42,
            ..Self::default()
        }
    }
}

// ── Species catalog ────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub species_id:    SpeciesId,
    pub name:          String,
    #[serde(default)]
    pub prevolution:   Option<SpeciesId>,
    /// Present only for species selectable as a starter.
    #[serde(default)]
    pub starter_cost:  Option<u32>,
    #[serde(default)]
    pub sub_legendary: bool,
    #[serde(default)]
    pub legendary:     bool,
    #[serde(default)]
    pub mythical:      bool,
    #[serde(default = "default_true")]
    pub has_ability2:  bool,
    /// Number of egg moves defined for this species (at most 4).
    #[serde(default)]
    pub egg_moves:     u8,
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
struct SpeciesFile {
    species:              Vec<SpeciesConfig>,
    default_starters:     Vec<SpeciesId>,
    #[serde(default)]
    no_starter_form_keys: Vec<String>,
}

/// Static species data the dex ledger consults: evolution lineage,
/// starter eligibility, rarity flags.
#[derive(Debug, Clone)]
pub struct SpeciesCatalog {
    species:              BTreeMap<SpeciesId, SpeciesConfig>,
    default_starters:     Vec<SpeciesId>,
    no_starter_form_keys: Vec<String>,
}

impl SpeciesCatalog {
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/species.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&content).map_err(|e| anyhow::anyhow!("Invalid {path}: {e}"))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let file: SpeciesFile = serde_json::from_str(content)?;
        Self::new(file.species, file.default_starters, file.no_starter_form_keys)
    }

    pub fn new(
        species: Vec<SpeciesConfig>,
        default_starters: Vec<SpeciesId>,
        no_starter_form_keys: Vec<String>,
    ) -> anyhow::Result<Self> {
        let species: BTreeMap<SpeciesId, SpeciesConfig> =
            species.into_iter().map(|s| (s.species_id, s)).collect();
        for (id, s) in &species {
            if let Some(prev) = s.prevolution {
                if !species.contains_key(&prev) {
                    anyhow::bail!("species {id} evolves from unknown species {prev}");
                }
            }
        }
        for id in &default_starters {
            match species.get(id) {
                Some(s) if s.starter_cost.is_some() => {}
                _ => anyhow::bail!("default starter {id} is not a starter species"),
            }
        }
        Ok(Self { species, default_starters, no_starter_form_keys })
    }

    pub fn get(&self, id: SpeciesId) -> Option<&SpeciesConfig> {
        self.species.get(&id)
    }

    pub fn contains(&self, id: SpeciesId) -> bool {
        self.species.contains_key(&id)
    }

    pub fn species_ids(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        self.species.keys().copied()
    }

    /// Species that carry a starter cost, in id order.
    pub fn starter_ids(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        self.species
            .values()
            .filter(|s| s.starter_cost.is_some())
            .map(|s| s.species_id)
    }

    pub fn default_starters(&self) -> &[SpeciesId] {
        &self.default_starters
    }

    pub fn is_default_starter(&self, id: SpeciesId) -> bool {
        self.default_starters.contains(&id)
    }

    pub fn prevolution(&self, id: SpeciesId) -> Option<SpeciesId> {
        self.species.get(&id).and_then(|s| s.prevolution)
    }

    pub fn starter_cost(&self, id: SpeciesId) -> Option<u32> {
        self.species.get(&id).and_then(|s| s.starter_cost)
    }

    pub fn is_starter(&self, id: SpeciesId) -> bool {
        self.starter_cost(id).is_some()
    }

    pub fn is_no_starter_form(&self, form_key: &str) -> bool {
        !form_key.is_empty() && self.no_starter_form_keys.iter().any(|k| k == form_key)
    }

    /// `id` followed by each prevolution, nearest first.
    pub fn lineage(&self, id: SpeciesId) -> Vec<SpeciesId> {
        let mut chain = vec![id];
        let mut seen: HashSet<SpeciesId> = HashSet::from([id]);
        let mut current = id;
        while let Some(prev) = self.prevolution(current) {
            if !seen.insert(prev) {
                log::warn!("Evolution cycle detected at species {prev}");
                break;
            }
            chain.push(prev);
            current = prev;
        }
        chain
    }

    /// Earliest species of the lineage.
    pub fn root_species(&self, id: SpeciesId) -> SpeciesId {
        self.lineage(id).last().copied().unwrap_or(id)
    }

    /// Walk back only until a starter-eligible species is reached.
    pub fn root_species_for_starter(&self, id: SpeciesId) -> SpeciesId {
        self.lineage(id)
            .into_iter()
            .find(|s| self.is_starter(*s))
            .unwrap_or_else(|| self.root_species(id))
    }

    /// Small built-in catalog for tests: three starter lines, a baby line,
    /// a single-stage starter and one species of each rarity tier.
    pub fn default_test() -> Self {
        fn sp(id: SpeciesId, name: &str, prev: Option<SpeciesId>, cost: Option<u32>) -> SpeciesConfig {
            SpeciesConfig {
                species_id:    id,
                name:          name.into(),
                prevolution:   prev,
                starter_cost:  cost,
                sub_legendary: false,
                legendary:     false,
                mythical:      false,
                has_ability2:  true,
                egg_moves:     if cost.is_some() { 4 } else { 0 },
            }
        }

        let mut species = vec![
            sp(1, "bulbasaur", None, Some(3)),
            sp(2, "ivysaur", Some(1), None),
            sp(3, "venusaur", Some(2), None),
            sp(4, "charmander", None, Some(3)),
            sp(5, "charmeleon", Some(4), None),
            sp(6, "charizard", Some(5), None),
            sp(7, "squirtle", None, Some(3)),
            sp(8, "wartortle", Some(7), None),
            sp(9, "blastoise", Some(8), None),
            sp(10, "caterpie", None, Some(1)),
            sp(11, "metapod", Some(10), None),
            sp(12, "butterfree", Some(11), None),
            sp(25, "pikachu", Some(172), None),
            sp(129, "magikarp", None, Some(2)),
            sp(130, "gyarados", Some(129), None),
            sp(172, "pichu", None, Some(3)),
        ];
        let mut articuno = sp(144, "articuno", None, Some(6));
        articuno.sub_legendary = true;
        let mut mewtwo = sp(150, "mewtwo", None, Some(8));
        mewtwo.legendary = true;
        mewtwo.has_ability2 = false;
        let mut mew = sp(151, "mew", None, Some(6));
        mew.mythical = true;
        mew.has_ability2 = false;
        species.extend([articuno, mewtwo, mew]);
        if let Some(karp) = species.iter_mut().find(|s| s.species_id == 129) {
            karp.has_ability2 = false;
            karp.egg_moves = 2;
        }

        Self {
            species:              species.into_iter().map(|s| (s.species_id, s)).collect(),
            default_starters:     vec![1, 4, 7],
            no_starter_form_keys: vec!["mega".into(), "gigantamax".into()],
        }
    }
}
