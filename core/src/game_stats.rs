use crate::config::SpeciesConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Lifetime account counters. Counters this crate does not update are
/// kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStats {
    pub pokemon_seen:               u32,
    pub pokemon_caught:             u32,
    pub pokemon_hatched:            u32,
    pub sub_legendary_pokemon_seen: u32,
    pub sub_legendary_pokemon_caught: u32,
    pub sub_legendary_pokemon_hatched: u32,
    pub legendary_pokemon_seen:     u32,
    pub legendary_pokemon_caught:   u32,
    pub legendary_pokemon_hatched:  u32,
    pub mythical_pokemon_seen:      u32,
    pub mythical_pokemon_caught:    u32,
    pub mythical_pokemon_hatched:   u32,
    pub shiny_pokemon_seen:         u32,
    pub shiny_pokemon_caught:       u32,
    pub shiny_pokemon_hatched:      u32,
    pub ribbons_owned:              u32,
    pub highest_money:              u64,
    #[serde(flatten)]
    pub extra:                      BTreeMap<String, Value>,
}

impl GameStats {
    pub fn record_seen(&mut self, species: &SpeciesConfig, shiny: bool, trainer_owned: bool) {
        self.pokemon_seen += 1;
        if trainer_owned {
            return;
        }
        if species.sub_legendary {
            self.sub_legendary_pokemon_seen += 1;
        } else if species.legendary {
            self.legendary_pokemon_seen += 1;
        } else if species.mythical {
            self.mythical_pokemon_seen += 1;
        }
        if shiny {
            self.shiny_pokemon_seen += 1;
        }
    }

    pub fn record_caught(&mut self, species: &SpeciesConfig, shiny: bool) {
        self.pokemon_caught += 1;
        if species.sub_legendary {
            self.sub_legendary_pokemon_caught += 1;
        } else if species.legendary {
            self.legendary_pokemon_caught += 1;
        } else if species.mythical {
            self.mythical_pokemon_caught += 1;
        }
        if shiny {
            self.shiny_pokemon_caught += 1;
        }
    }

    pub fn record_hatched(&mut self, species: &SpeciesConfig, shiny: bool) {
        self.pokemon_hatched += 1;
        if species.sub_legendary {
            self.sub_legendary_pokemon_hatched += 1;
        } else if species.legendary {
            self.legendary_pokemon_hatched += 1;
        } else if species.mythical {
            self.mythical_pokemon_hatched += 1;
        }
        if shiny {
            self.shiny_pokemon_hatched += 1;
        }
    }
}
