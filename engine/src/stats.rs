use serde::{Deserialize, Serialize};

use crate::ailments::{ActiveAilment, StatusAilment};

/// Index of a combatant inside the battle roster.
pub type CombatantId = usize;

pub const MIN_STAGE: i8 = -6;
pub const MAX_STAGE: i8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Hero,
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Hero => Side::Enemy,
            Side::Enemy => Side::Hero,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    AttackPhysical,
    AttackSpecial,
    DefensePhysical,
    DefenseSpecial,
    Speed,
    Luck,
}

impl StatType {
    /// The defensive stat an offensive stat is resolved against.
    pub fn opposing_defense(self) -> StatType {
        match self {
            StatType::AttackSpecial => StatType::DefenseSpecial,
            _ => StatType::DefensePhysical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BaseStats {
    pub attack_physical: i32,
    pub attack_special: i32,
    pub defense_physical: i32,
    pub defense_special: i32,
    pub speed: i32,
    pub luck: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatStages {
    pub attack_physical: i8,
    pub attack_special: i8,
    pub defense_physical: i8,
    pub defense_special: i8,
    pub luck: i8,
}

impl StatStages {
    fn slot(&mut self, stat: StatType) -> Option<&mut i8> {
        match stat {
            StatType::AttackPhysical => Some(&mut self.attack_physical),
            StatType::AttackSpecial => Some(&mut self.attack_special),
            StatType::DefensePhysical => Some(&mut self.defense_physical),
            StatType::DefenseSpecial => Some(&mut self.defense_special),
            StatType::Luck => Some(&mut self.luck),
            StatType::Speed => None,
        }
    }

    pub fn get(&self, stat: StatType) -> i8 {
        match stat {
            StatType::AttackPhysical => self.attack_physical,
            StatType::AttackSpecial => self.attack_special,
            StatType::DefensePhysical => self.defense_physical,
            StatType::DefenseSpecial => self.defense_special,
            StatType::Luck => self.luck,
            StatType::Speed => 0,
        }
    }
}

/// Stage multiplier: +1 is x1.5, +6 is x4, -1 is x0.67, -6 is x0.25.
/// Saturates at the i32 range.
pub fn staged_value(base: i32, stage: i8) -> i32 {
    let s = i64::from(stage.clamp(MIN_STAGE, MAX_STAGE));
    let base = i64::from(base);
    let value = if s >= 0 { base * (2 + s) / 2 } else { base * 2 / (2 - s) };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Good,
    Warning,
    Danger,
}

pub const WARNING_RATIO: f32 = 0.3;
pub const DANGER_RATIO: f32 = 0.15;

pub fn health_status(health: i32, max_health: i32) -> HealthStatus {
    if max_health <= 0 {
        return HealthStatus::Danger;
    }
    let ratio = health as f32 / max_health as f32;
    if ratio <= DANGER_RATIO {
        HealthStatus::Danger
    } else if ratio <= WARNING_RATIO {
        HealthStatus::Warning
    } else {
        HealthStatus::Good
    }
}

/// Per-unit battle state. Also the persistence snapshot read at battle start and written at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CombatantStats {
    pub name: String,
    pub side: Side,
    pub level: u32,
    pub health: i32,
    pub max_health: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub stats: BaseStats,
    #[serde(default)]
    pub stages: StatStages,
    #[serde(default)]
    pub ailments: Vec<ActiveAilment>,
    #[serde(default)]
    pub experience_reward: u32,
}

impl CombatantStats {
    pub fn new(
        name: impl Into<String>,
        side: Side,
        level: u32,
        max_health: i32,
        max_mana: i32,
        stats: BaseStats,
    ) -> Self {
        Self {
            name: name.into(),
            side,
            level,
            health: max_health,
            max_health,
            mana: max_mana,
            max_mana,
            stats,
            stages: StatStages::default(),
            ailments: Vec::new(),
            experience_reward: 0,
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.health <= 0
    }

    pub fn base(&self, stat: StatType) -> i32 {
        match stat {
            StatType::AttackPhysical => self.stats.attack_physical,
            StatType::AttackSpecial => self.stats.attack_special,
            StatType::DefensePhysical => self.stats.defense_physical,
            StatType::DefenseSpecial => self.stats.defense_special,
            StatType::Speed => self.stats.speed,
            StatType::Luck => self.stats.luck,
        }
    }

    /// Stat value after stages are applied.
    pub fn effective(&self, stat: StatType) -> i32 {
        staged_value(self.base(stat), self.stages.get(stat))
    }

    /// Returns the stage after clamping, or None for stats without stages.
    pub fn adjust_stage(&mut self, stat: StatType, delta: i8) -> Option<i8> {
        let slot = self.stages.slot(stat)?;
        *slot = slot.saturating_add(delta).clamp(MIN_STAGE, MAX_STAGE);
        Some(*slot)
    }

    pub fn has_ailment(&self, kind: StatusAilment) -> bool {
        self.ailments.iter().any(|a| a.kind == kind)
    }

    /// Lower health by `amount`, clamping at 0. Returns the health actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = self.health.saturating_sub(amount.max(0)).max(0);
        before - self.health
    }

    /// Raise health up to max. Returns the health actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let before = self.health;
        self.health = self.health.saturating_add(amount).min(self.max_health);
        self.health - before
    }

    pub fn can_spend_mana(&self, cost: i32) -> bool {
        self.mana >= cost
    }

    pub fn spend_mana(&mut self, cost: i32) -> bool {
        if cost <= 0 {
            return true;
        }
        if !self.can_spend_mana(cost) {
            return false;
        }
        self.mana -= cost;
        true
    }

    pub fn restore_mana(&mut self, amount: i32) -> i32 {
        let before = self.mana;
        self.mana = self.mana.saturating_add(amount).clamp(0, self.max_mana);
        self.mana - before
    }

    pub fn adjust_max_health(&mut self, delta: i32) {
        self.max_health = self.max_health.saturating_add(delta).max(1);
        self.health = self.health.min(self.max_health);
    }

    pub fn adjust_max_mana(&mut self, delta: i32) {
        self.max_mana = self.max_mana.saturating_add(delta).max(0);
        self.mana = self.mana.min(self.max_mana);
    }

    pub fn health_status(&self) -> HealthStatus {
        health_status(self.health, self.max_health)
    }
}
