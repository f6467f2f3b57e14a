//! Damage formulas and their application to combatant stats.

use crate::Dice;
use crate::stats::{CombatantStats, StatType};

pub const GUARANTEED_LUCK_MIN: f32 = 0.75;
pub const GUARANTEED_LUCK_MAX: f32 = 0.95;

/// Pluggable curve turning strike power into health lost.
pub trait DamageFormula {
    fn compute(&self, power: i32, attacker_level: u32, attack: i32, defense: i32) -> i32;
}

/// Level-scaled attack-over-defense curve.
///
/// # Formula
///
/// ```text
/// if power <= 0: 0
/// level_factor = 2 * level / 5 + 2
/// damage = level_factor * power * attack / max(defense, 1) / 50 + 2
/// ```
///
/// Any positive power deals at least 2. Results saturate at `i32::MAX`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFormula;

impl DamageFormula for StandardFormula {
    fn compute(&self, power: i32, attacker_level: u32, attack: i32, defense: i32) -> i32 {
        if power <= 0 {
            return 0;
        }
        let level_factor = 2 * i128::from(attacker_level) / 5 + 2;
        let attack = i128::from(attack.max(1));
        let defense = i128::from(defense.max(1));
        let raw = level_factor * i128::from(power) * attack / defense / 50 + 2;
        raw.min(i128::from(i32::MAX)) as i32
    }
}

/// Damage `attacker` would deal to `target` with `base_damage` power, before clamping to health.
pub fn compute_damage(
    target: &CombatantStats,
    base_damage: i32,
    attacker: &CombatantStats,
    stat: StatType,
    formula: &dyn DamageFormula,
) -> i32 {
    let attack = attacker.effective(stat);
    let defense = target.effective(stat.opposing_defense());
    formula.compute(base_damage, attacker.level, attack, defense)
}

/// Returns the damage actually dealt after clamping.
pub fn apply_damage(
    target: &mut CombatantStats,
    base_damage: i32,
    attacker: &CombatantStats,
    stat: StatType,
    formula: &dyn DamageFormula,
    mut log: impl FnMut(String),
) -> i32 {
    let damage = compute_damage(target, base_damage, attacker, stat, formula);

    let before = target.health;
    let dealt = target.take_damage(damage);
    log(format!(
        "[DMG][{}] {} → {} (−{}) from {}",
        target.name, before, target.health, dealt, attacker.name
    ));
    dealt
}

/// Base damage scaled by a multiplier drawn from [0.75, 0.95].
pub fn guaranteed_luck_base(base_damage: i32, dice: &mut Dice) -> i32 {
    let multiplier = dice.uniform(GUARANTEED_LUCK_MIN, GUARANTEED_LUCK_MAX);
    ((base_damage as f64) * f64::from(multiplier)).round() as i32
}

/// A hit on a rolling health bar: what the display shows and what actually lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LuckyHit {
    pub shown: i32,
    pub taken: i32,
}

/// Damage for a hero's health roller. The display drops by the full damage while the
/// health actually lost comes from a base of 75 to 95 percent.
pub fn estimate_damage_guarantee_luck(
    target: &CombatantStats,
    base_damage: i32,
    attacker: &CombatantStats,
    stat: StatType,
    formula: &dyn DamageFormula,
    dice: &mut Dice,
) -> LuckyHit {
    let shown = compute_damage(target, base_damage, attacker, stat, formula);
    let reduced = guaranteed_luck_base(base_damage, dice);
    let taken = compute_damage(target, reduced, attacker, stat, formula).min(shown);
    LuckyHit { shown, taken }
}

pub fn did_attack_land(dice: &mut Dice, accuracy: u32) -> bool {
    dice.chance(accuracy)
}

/// Crit chance in percent: a quarter of effective luck plus any bonus.
pub fn crit_chance(attacker: &CombatantStats, bonus: u32) -> u32 {
    let luck = attacker.effective(StatType::Luck).max(0) as u32;
    (luck / 4 + bonus).min(100)
}
