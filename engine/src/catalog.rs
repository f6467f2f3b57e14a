//! Immutable definitions of what a combatant can use in battle.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Button;
use crate::ailments::StatusAilment;
use crate::stats::StatType;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("'{name}' has a zero animation id")]
    ZeroAnimationId { name: String },
    #[error("'{name}' has no strikes")]
    NoStrikes { name: String },
    #[error("strike {index} of '{name}' needs an action command but lists no buttons")]
    EmptyButtons { name: String, index: usize },
    #[error("strike {index} of '{name}' has ailment chance {chance} (must be 0..=100)")]
    ChanceOutOfRange { name: String, index: usize, chance: u32 },
    #[error("attack '{name}' cannot cost mana ({cost})")]
    AttackWithManaCost { name: String, cost: i32 },
    #[error("'{name}' has negative mana cost {cost}")]
    NegativeManaCost { name: String, cost: i32 },
    #[error("'{name}' has accuracy {accuracy} (must be 0..=100)")]
    AccuracyOutOfRange { name: String, accuracy: u32 },
    #[error("unknown {command:?} subtype '{subtype}'")]
    UnknownSubtype { command: CommandKind, subtype: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Normal,
    Ice,
    Fire,
    Electric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Consume,
    Throwable,
    Equippable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    Attack { element: Element },
    Skill { element: Element },
    Item { item_type: ItemType },
}

/// Which menu an action lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Attack,
    Skill,
    Item,
}

impl ActionKind {
    pub fn classification(&self) -> Classification {
        match self {
            ActionKind::Attack { .. } => Classification::Attack,
            ActionKind::Skill { .. } => Classification::Skill,
            ActionKind::Item { .. } => Classification::Item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetScope {
    #[serde(rename = "self")]
    SelfOnly,
    TeamOne,
    TeamAll,
    EnemyOne,
    EnemyAll,
    Everyone,
}

impl TargetScope {
    pub fn label(self) -> &'static str {
        match self {
            TargetScope::SelfOnly => "Self",
            TargetScope::TeamOne => "Ally",
            TargetScope::TeamAll => "All Allies",
            TargetScope::EnemyOne => "Enemy",
            TargetScope::EnemyAll => "All Enemies",
            TargetScope::Everyone => "Everyone",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    #[default]
    StayInPlace,
    MoveToTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    #[default]
    None,
    RapidPress,
    SequencePress,
    TimelyPress,
    StickControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusType {
    #[default]
    None,
    DamageOutput,
    ManaGain,
    CritIncrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatEffect {
    Power,
    HealthCurrent,
    ManaCurrent,
    HealthMax,
    ManaMax,
    AttackPhysical,
    AttackSpecial,
    DefensePhysical,
    DefenseSpecial,
    Luck,
}

impl StatEffect {
    /// The staged stat this effect moves, if it is a stage delta.
    pub fn stage_stat(self) -> Option<StatType> {
        match self {
            StatEffect::AttackPhysical => Some(StatType::AttackPhysical),
            StatEffect::AttackSpecial => Some(StatType::AttackSpecial),
            StatEffect::DefensePhysical => Some(StatType::DefensePhysical),
            StatEffect::DefenseSpecial => Some(StatType::DefenseSpecial),
            StatEffect::Luck => Some(StatType::Luck),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RapidPreset {
    Short,
    Medium,
    Long,
    ControlRage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelyPreset {
    Slow,
    Medium,
    Quick,
    HighNoonSlow,
    HighNoonQuick,
}

impl TimelyPreset {
    pub fn is_high_noon(self) -> bool {
        matches!(self, TimelyPreset::HighNoonSlow | TimelyPreset::HighNoonQuick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePreset {
    RevealAll,
    RevealOne,
    RevealOnePartialOk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickPreset {
    HoldStickQuick,
    HoldStickMedium,
    HoldStickLong,
    FlickShort,
    FlickLong,
}

/// Action command type plus its parsed difficulty subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSpec {
    None,
    Rapid(RapidPreset),
    Timely(TimelyPreset),
    Sequence(SequencePreset),
    Stick(StickPreset),
}

impl CommandSpec {
    pub fn parse(kind: CommandKind, subtype: &str) -> Result<Self, CatalogError> {
        let key = subtype.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        let unknown = || CatalogError::UnknownSubtype { command: kind, subtype: subtype.to_string() };
        let spec = match kind {
            CommandKind::None => CommandSpec::None,
            CommandKind::RapidPress => CommandSpec::Rapid(match key.as_str() {
                "SHORT" => RapidPreset::Short,
                "" | "MEDIUM" => RapidPreset::Medium,
                "LONG" => RapidPreset::Long,
                "CONTROL_RAGE" | "RAGE_CONTROL" => RapidPreset::ControlRage,
                _ => return Err(unknown()),
            }),
            CommandKind::TimelyPress => CommandSpec::Timely(match key.as_str() {
                "SLOW" => TimelyPreset::Slow,
                "" | "MEDIUM" => TimelyPreset::Medium,
                "QUICK" => TimelyPreset::Quick,
                "HIGH_NOON_SLOW" => TimelyPreset::HighNoonSlow,
                "HIGH_NOON_QUICK" => TimelyPreset::HighNoonQuick,
                _ => return Err(unknown()),
            }),
            CommandKind::SequencePress => CommandSpec::Sequence(match key.as_str() {
                "" | "REVEAL_ALL" => SequencePreset::RevealAll,
                "REVEAL_ONE" => SequencePreset::RevealOne,
                "REVEAL_ONE_PARTIAL_OK" => SequencePreset::RevealOnePartialOk,
                _ => return Err(unknown()),
            }),
            CommandKind::StickControl => CommandSpec::Stick(match key.as_str() {
                "" | "HOLD_STICK_QUICK" => StickPreset::HoldStickQuick,
                "HOLD_STICK_MEDIUM" => StickPreset::HoldStickMedium,
                "HOLD_STICK_LONG" => StickPreset::HoldStickLong,
                "FLICK_SHORT" => StickPreset::FlickShort,
                "FLICK_LONG" => StickPreset::FlickLong,
                _ => return Err(unknown()),
            }),
        };
        Ok(spec)
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            CommandSpec::None => CommandKind::None,
            CommandSpec::Rapid(_) => CommandKind::RapidPress,
            CommandSpec::Timely(_) => CommandKind::TimelyPress,
            CommandSpec::Sequence(_) => CommandKind::SequencePress,
            CommandSpec::Stick(_) => CommandKind::StickControl,
        }
    }

    /// Menu text such as "TIMELY QUICK" or "HIGH NOON SLOW".
    pub fn summary(&self) -> &'static str {
        match self {
            CommandSpec::None => "NONE",
            CommandSpec::Rapid(RapidPreset::Short) => "RAPID SHORT",
            CommandSpec::Rapid(RapidPreset::Medium) => "RAPID MEDIUM",
            CommandSpec::Rapid(RapidPreset::Long) => "RAPID LONG",
            CommandSpec::Rapid(RapidPreset::ControlRage) => "RAGE CONTROL",
            CommandSpec::Timely(TimelyPreset::Slow) => "TIMELY SLOW",
            CommandSpec::Timely(TimelyPreset::Medium) => "TIMELY MEDIUM",
            CommandSpec::Timely(TimelyPreset::Quick) => "TIMELY QUICK",
            CommandSpec::Timely(TimelyPreset::HighNoonSlow) => "HIGH NOON SLOW",
            CommandSpec::Timely(TimelyPreset::HighNoonQuick) => "HIGH NOON QUICK",
            CommandSpec::Sequence(_) => "SEQUENCE",
            CommandSpec::Stick(_) => "STICK",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct StrikeDef {
    #[serde(default)]
    command: CommandKind,
    #[serde(default)]
    subtype: String,
    #[serde(default)]
    buttons: Vec<Button>,
    #[serde(default)]
    effects: IndexMap<StatEffect, i32>,
    #[serde(default)]
    ailments: IndexMap<StatusAilment, u32>,
    #[serde(default)]
    ailment_chance: u32,
    #[serde(default)]
    bonus: BonusType,
}

/// One hit or sub-effect of a [`UsableAction`], gated by its own action command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "StrikeDef")]
pub struct Strike {
    command: CommandSpec,
    buttons: Vec<Button>,
    effects: IndexMap<StatEffect, i32>,
    ailments: IndexMap<StatusAilment, u32>,
    ailment_chance: u32,
    bonus: BonusType,
}

impl TryFrom<StrikeDef> for Strike {
    type Error = CatalogError;

    fn try_from(def: StrikeDef) -> Result<Self, Self::Error> {
        Ok(Strike {
            command: CommandSpec::parse(def.command, &def.subtype)?,
            buttons: def.buttons,
            effects: def.effects,
            ailments: def.ailments,
            ailment_chance: def.ailment_chance,
            bonus: def.bonus,
        })
    }
}

impl Strike {
    pub fn new(command: CommandSpec, buttons: &[Button]) -> Self {
        Strike {
            command,
            buttons: buttons.to_vec(),
            effects: IndexMap::new(),
            ailments: IndexMap::new(),
            ailment_chance: 0,
            bonus: BonusType::None,
        }
    }

    /// A strike with no action command.
    pub fn plain() -> Self {
        Self::new(CommandSpec::None, &[])
    }

    pub fn with_effect(mut self, effect: StatEffect, magnitude: i32) -> Self {
        self.effects.insert(effect, magnitude);
        self
    }

    pub fn with_ailment(mut self, ailment: StatusAilment, turns: u32, chance: u32) -> Self {
        self.ailments.insert(ailment, turns);
        self.ailment_chance = chance;
        self
    }

    pub fn with_bonus(mut self, bonus: BonusType) -> Self {
        self.bonus = bonus;
        self
    }

    pub fn command(&self) -> CommandSpec {
        self.command
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn effects(&self) -> &IndexMap<StatEffect, i32> {
        &self.effects
    }

    pub fn ailments(&self) -> &IndexMap<StatusAilment, u32> {
        &self.ailments
    }

    pub fn ailment_chance(&self) -> u32 {
        self.ailment_chance
    }

    pub fn bonus(&self) -> BonusType {
        self.bonus
    }

    pub fn power(&self) -> i32 {
        self.effects.get(&StatEffect::Power).copied().unwrap_or(0)
    }

    pub fn effect(&self, effect: StatEffect) -> i32 {
        self.effects.get(&effect).copied().unwrap_or(0)
    }

    /// True when the strike restores health and deals none, so it may target a defeated ally.
    pub fn revives(&self) -> bool {
        self.effect(StatEffect::HealthCurrent) > 0 && self.power() == 0
    }

    fn validate(&self, name: &str, index: usize) -> Result<(), CatalogError> {
        if self.command != CommandSpec::None && self.buttons.is_empty() {
            return Err(CatalogError::EmptyButtons { name: name.to_string(), index });
        }
        if self.ailment_chance > 100 {
            return Err(CatalogError::ChanceOutOfRange {
                name: name.to_string(),
                index,
                chance: self.ailment_chance,
            });
        }
        Ok(())
    }
}

fn default_damage_stat() -> StatType {
    StatType::AttackPhysical
}

pub const FULL_ACCURACY: u32 = 100;

fn default_accuracy() -> u32 {
    FULL_ACCURACY
}

/// Unvalidated action definition; [`ActionDef::build`] turns it into a [`UsableAction`].
#[derive(Debug, Clone, Deserialize)]
pub struct ActionDef {
    pub animation_id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(default)]
    pub required_level: u32,
    #[serde(default)]
    pub mana_cost: i32,
    pub target: TargetScope,
    #[serde(default)]
    pub movement: Movement,
    #[serde(default = "default_damage_stat")]
    pub damage_stat: StatType,
    /// Percent chance each damaging hit lands.
    #[serde(default = "default_accuracy")]
    pub accuracy: u32,
    #[serde(default)]
    pub strikes: Vec<Strike>,
}

impl ActionDef {
    pub fn new(animation_id: u32, name: impl Into<String>, kind: ActionKind, target: TargetScope) -> Self {
        ActionDef {
            animation_id,
            name: name.into(),
            description: String::new(),
            kind,
            required_level: 0,
            mana_cost: 0,
            target,
            movement: Movement::StayInPlace,
            damage_stat: StatType::AttackPhysical,
            accuracy: FULL_ACCURACY,
            strikes: Vec::new(),
        }
    }

    pub fn strike(mut self, strike: Strike) -> Self {
        self.strikes.push(strike);
        self
    }

    pub fn mana_cost(mut self, cost: i32) -> Self {
        self.mana_cost = cost;
        self
    }

    pub fn required_level(mut self, level: u32) -> Self {
        self.required_level = level;
        self
    }

    pub fn movement(mut self, movement: Movement) -> Self {
        self.movement = movement;
        self
    }

    pub fn damage_stat(mut self, stat: StatType) -> Self {
        self.damage_stat = stat;
        self
    }

    pub fn accuracy(mut self, accuracy: u32) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn build(self) -> Result<UsableAction, CatalogError> {
        let name = &self.name;
        if self.animation_id == 0 {
            return Err(CatalogError::ZeroAnimationId { name: name.clone() });
        }
        if self.strikes.is_empty() {
            return Err(CatalogError::NoStrikes { name: name.clone() });
        }
        if self.mana_cost < 0 {
            return Err(CatalogError::NegativeManaCost { name: name.clone(), cost: self.mana_cost });
        }
        if matches!(self.kind, ActionKind::Attack { .. }) && self.mana_cost != 0 {
            return Err(CatalogError::AttackWithManaCost { name: name.clone(), cost: self.mana_cost });
        }
        if self.accuracy > FULL_ACCURACY {
            return Err(CatalogError::AccuracyOutOfRange { name: name.clone(), accuracy: self.accuracy });
        }
        for (index, strike) in self.strikes.iter().enumerate() {
            strike.validate(name, index)?;
        }
        Ok(UsableAction {
            animation_id: self.animation_id,
            name: self.name,
            description: self.description,
            kind: self.kind,
            required_level: self.required_level,
            mana_cost: self.mana_cost,
            target: self.target,
            movement: self.movement,
            damage_stat: self.damage_stat,
            accuracy: self.accuracy,
            strikes: self.strikes,
        })
    }
}

/// An Attack, Skill or Item as selected from a battle menu. Only built through
/// [`ActionDef::build`], so every instance has passed validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ActionDef")]
pub struct UsableAction {
    animation_id: u32,
    name: String,
    description: String,
    kind: ActionKind,
    required_level: u32,
    mana_cost: i32,
    target: TargetScope,
    movement: Movement,
    damage_stat: StatType,
    accuracy: u32,
    strikes: Vec<Strike>,
}

impl TryFrom<ActionDef> for UsableAction {
    type Error = CatalogError;

    fn try_from(def: ActionDef) -> Result<Self, Self::Error> {
        def.build()
    }
}

impl UsableAction {
    pub fn animation_id(&self) -> u32 {
        self.animation_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn required_level(&self) -> u32 {
        self.required_level
    }

    pub fn mana_cost(&self) -> i32 {
        self.mana_cost
    }

    pub fn target(&self) -> TargetScope {
        self.target
    }

    pub fn movement(&self) -> Movement {
        self.movement
    }

    pub fn damage_stat(&self) -> StatType {
        self.damage_stat
    }

    pub fn accuracy(&self) -> u32 {
        self.accuracy
    }

    pub fn strikes(&self) -> &[Strike] {
        &self.strikes
    }

    pub fn classification(&self) -> Classification {
        self.kind.classification()
    }

    pub fn unlocked(&self, level: u32) -> bool {
        level >= self.required_level
    }

    pub fn can_afford(&self, mana: i32) -> bool {
        mana >= self.mana_cost
    }

    pub fn target_label(&self) -> &'static str {
        self.target.label()
    }

    /// Comma-separated command summary of every strike, e.g. "TIMELY MEDIUM, TIMELY QUICK".
    pub fn command_summary(&self) -> String {
        self.strikes
            .iter()
            .map(|s| s.command.summary())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A named, ordered list of actions such as a hero's attacks or an item pouch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MoveList {
    pub name: String,
    pub actions: Vec<UsableAction>,
}

impl MoveList {
    pub fn unlocked_for(&self, level: u32) -> impl Iterator<Item = &UsableAction> {
        self.actions.iter().filter(move |a| a.unlocked(level))
    }

    pub fn find(&self, name: &str) -> Option<&UsableAction> {
        self.actions.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub item: UsableAction,
    pub quantity: u32,
}

/// Everything one combatant can choose from during its turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Loadout {
    pub attacks: Vec<UsableAction>,
    pub skills: Vec<UsableAction>,
    pub items: Vec<ItemStack>,
}

impl Loadout {
    pub fn entries(&self, class: Classification) -> Vec<&UsableAction> {
        match class {
            Classification::Attack => self.attacks.iter().collect(),
            Classification::Skill => self.skills.iter().collect(),
            Classification::Item => self.items.iter().map(|s| &s.item).collect(),
        }
    }

    pub fn entry(&self, class: Classification, index: usize) -> Option<&UsableAction> {
        match class {
            Classification::Attack => self.attacks.get(index),
            Classification::Skill => self.skills.get(index),
            Classification::Item => self.items.get(index).map(|s| &s.item),
        }
    }

    /// Use up one of the item at `index`, dropping the stack when empty.
    pub fn consume_item(&mut self, index: usize) -> bool {
        let Some(stack) = self.items.get_mut(index) else {
            return false;
        };
        stack.quantity = stack.quantity.saturating_sub(1);
        if stack.quantity == 0 {
            self.items.remove(index);
        }
        true
    }
}
