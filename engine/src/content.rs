//! Builtin move lists, combatants and encounters, embedded at compile time.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ailments::ActiveAilment;
use crate::battle::Combatant;
use crate::catalog::{ItemStack, Loadout, MoveList, UsableAction};
use crate::stats::{BaseStats, CombatantStats, Side};

pub fn builtin_move_lists() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("hero_attacks", include_str!("../content/moves/hero_attacks.json")),
        ("hero_skills", include_str!("../content/moves/hero_skills.json")),
        ("enemy_attacks", include_str!("../content/moves/enemy_attacks.json")),
        ("imp_spells", include_str!("../content/moves/imp_spells.json")),
        ("consumables", include_str!("../content/items/consumables.json")),
    ])
}

pub fn builtin_combatants() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("hero_knight", include_str!("../content/combatants/hero_knight.json")),
        ("hero_ranger", include_str!("../content/combatants/hero_ranger.json")),
        ("sample_enemy", include_str!("../content/combatants/sample_enemy.json")),
        ("fire_imp", include_str!("../content/combatants/fire_imp.json")),
    ])
}

pub fn builtin_encounters() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("forest_skirmish", include_str!("../content/encounters/forest_skirmish.json")),
        ("imp_ambush", include_str!("../content/encounters/imp_ambush.json")),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// YAML for `.yaml`/`.yml`, JSON for everything else.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }

    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T> {
        match self {
            Format::Json => Ok(serde_json::from_str(text)?),
            Format::Yaml => Ok(serde_yaml::from_str(text)?),
        }
    }
}

/// Read and parse a content or config file, choosing the format by extension.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Format::from_path(path)
        .parse(&text)
        .with_context(|| format!("failed to parse {}", path.display()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ItemRef {
    pub item: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

fn default_level() -> u32 {
    1
}

/// A combatant as written in content files: stats plus the move lists it draws from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CombatantDef {
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u32,
    pub max_health: i32,
    /// Current health; defaults to full.
    #[serde(default)]
    pub health: Option<i32>,
    #[serde(default)]
    pub max_mana: i32,
    #[serde(default)]
    pub mana: Option<i32>,
    pub stats: BaseStats,
    /// Move list id for the Attacks menu.
    #[serde(default)]
    pub attacks: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemRef>,
    #[serde(default)]
    pub experience_reward: u32,
    #[serde(default)]
    pub ailments: Vec<ActiveAilment>,
    /// Hero health roller speed, 1 to 6.
    #[serde(default)]
    pub roller_speed: Option<u8>,
}

impl CombatantDef {
    pub fn stats(&self, side: Side) -> CombatantStats {
        let mut stats = CombatantStats::new(
            self.name.clone(),
            side,
            self.level,
            self.max_health.max(1),
            self.max_mana.max(0),
            self.stats,
        );
        if let Some(health) = self.health {
            stats.health = health.clamp(0, stats.max_health);
        }
        if let Some(mana) = self.mana {
            stats.mana = mana.clamp(0, stats.max_mana);
        }
        stats.ailments = self.ailments.clone();
        stats.experience_reward = self.experience_reward;
        stats
    }

    /// Resolve move list and item names against `library`.
    pub fn build(&self, side: Side, library: &Library) -> Result<Combatant> {
        let list = |id: &Option<String>| -> Result<Vec<UsableAction>> {
            match id {
                None => Ok(Vec::new()),
                Some(id) => library
                    .list(id)
                    .map(|l| l.actions.clone())
                    .ok_or_else(|| anyhow!("{}: unknown move list '{}'", self.name, id)),
            }
        };
        let mut items = Vec::with_capacity(self.items.len());
        for r in &self.items {
            let item = library
                .find_item(&r.item)
                .cloned()
                .ok_or_else(|| anyhow!("{}: unknown item '{}'", self.name, r.item))?;
            if r.quantity > 0 {
                items.push(ItemStack { item, quantity: r.quantity });
            }
        }
        let loadout = Loadout { attacks: list(&self.attacks)?, skills: list(&self.skills)?, items };
        let combatant = Combatant::new(self.stats(side), loadout);
        Ok(match self.roller_speed {
            Some(speed) => combatant.with_roller_speed(speed),
            None => combatant,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterDef {
    pub heroes: Vec<String>,
    pub enemies: Vec<String>,
}

pub fn builtin_combatant(id: &str) -> Result<CombatantDef> {
    let Some(text) = builtin_combatants().get(id).copied() else {
        bail!("unknown builtin combatant '{}'", id);
    };
    serde_json::from_str(text).with_context(|| format!("failed to parse builtin combatant '{}'", id))
}

pub fn builtin_encounter(id: &str) -> Result<EncounterDef> {
    let Some(text) = builtin_encounters().get(id).copied() else {
        bail!("unknown builtin encounter '{}'", id);
    };
    serde_json::from_str(text).with_context(|| format!("failed to parse builtin encounter '{}'", id))
}

/// Move lists by id. Ids of builtin lists are their file stems.
#[derive(Debug, Clone, Default)]
pub struct Library {
    lists: IndexMap<String, MoveList>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every embedded move list, sorted by id.
    pub fn builtin() -> Result<Self> {
        let mut sources: Vec<(&str, &str)> = builtin_move_lists().into_iter().collect();
        sources.sort_by_key(|(id, _)| *id);
        let mut library = Self::new();
        for (id, text) in sources {
            let list: MoveList = serde_json::from_str(text)
                .with_context(|| format!("failed to parse builtin move list '{}'", id))?;
            library.insert(id, list);
        }
        Ok(library)
    }

    /// Load a move list from disk; its id is the file stem. Replaces a list with the same id.
    pub fn load_file(&mut self, path: &Path) -> Result<String> {
        let list: MoveList = load_file(path)?;
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("cannot derive a move list id from {}", path.display()))?
            .to_string();
        self.insert(id.clone(), list);
        Ok(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, list: MoveList) {
        self.lists.insert(id.into(), list);
    }

    pub fn list(&self, id: &str) -> Option<&MoveList> {
        self.lists.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MoveList)> {
        self.lists.iter().map(|(id, l)| (id.as_str(), l))
    }

    /// First item-kind action with this name across every list.
    pub fn find_item(&self, name: &str) -> Option<&UsableAction> {
        self.lists
            .values()
            .flat_map(|l| l.actions.iter())
            .filter(|a| a.classification() == crate::catalog::Classification::Item)
            .find(|a| a.name().eq_ignore_ascii_case(name))
    }
}
