use serde::{Deserialize, Serialize};

use crate::Dice;
use crate::stats::{CombatantStats, StatType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAilment {
    None,
    /// Small heal at turn start, softens poison and burn, blocks exhaustion.
    Hearty,
    /// Skips the turn.
    Stunned,
    /// Chance to skip the turn.
    Paralyzed,
    /// Small damage at end of turn.
    Poisoned,
    /// Small damage at start of turn, attack down one stage.
    Burned,
    /// Skips the turn with a small heal; damage wakes the sleeper.
    Asleep,
    Confused,
    Enraged,
    /// Skills menu is disabled.
    Frightened,
    /// Health roller falls faster and climbs slower.
    Exhausted,
}

/// An ailment currently on a combatant, counted in that combatant's turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAilment {
    pub kind: StatusAilment,
    pub turns_remaining: u32,
    /// Set when applying this ailment moved a stat stage, so removal moves it back.
    #[serde(default)]
    pub stage_applied: bool,
}

impl ActiveAilment {
    pub fn new(kind: StatusAilment, turns_remaining: u32) -> Self {
        Self { kind, turns_remaining, stage_applied: false }
    }
}

pub const PARALYSIS_SKIP_CHANCE: u32 = 25;
const HEARTY_HEAL_DIVISOR: i32 = 20;
const SLEEP_HEAL_DIVISOR: i32 = 20;
const TICK_DAMAGE_DIVISOR: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnBoundary {
    StartOfTurn,
    EndOfTurn,
}

/// Whether the combatant gets to act after start-of-turn resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnGate {
    Act,
    Skip,
}

/// Applies `kind` for `turns` turns, honouring cancellation rules. Returns true if it took hold.
pub fn apply_ailment(
    target: &mut CombatantStats,
    kind: StatusAilment,
    turns: u32,
    mut log: impl FnMut(String),
) -> bool {
    use StatusAilment::*;

    if kind == None || turns == 0 {
        return false;
    }

    if kind == Exhausted {
        if let Some(hearty) = target.ailments.iter_mut().find(|a| a.kind == Hearty) {
            hearty.turns_remaining = hearty.turns_remaining.saturating_sub(1);
            log(format!(
                "[AIL][{}] Hearty shrugs off Exhausted ({} turns left)",
                target.name, hearty.turns_remaining
            ));
            target.ailments.retain(|a| a.turns_remaining > 0);
            return false;
        }
    }

    let cancelled: &[StatusAilment] = match kind {
        Hearty => &[Exhausted],
        Asleep => &[Stunned, Confused, Enraged],
        _ => &[],
    };
    for c in cancelled {
        if target.has_ailment(*c) {
            target.ailments.retain(|a| a.kind != *c);
            log(format!("[AIL][{}] {:?} is cancelled by {:?}", target.name, c, kind));
        }
    }

    if let Some(existing) = target.ailments.iter_mut().find(|a| a.kind == kind) {
        existing.turns_remaining = existing.turns_remaining.max(turns);
        log(format!(
            "[AIL][{}] {:?} refreshed ({} turns)",
            target.name, kind, existing.turns_remaining
        ));
        return true;
    }

    let mut active = ActiveAilment::new(kind, turns);
    if kind == Burned {
        let before = target.stages.get(StatType::AttackPhysical);
        active.stage_applied = target.adjust_stage(StatType::AttackPhysical, -1) != Some(before);
    }
    target.ailments.push(active);
    log(format!("[AIL][{}] gains {:?} ({} turns)", target.name, kind, turns));
    true
}

/// Moves back any stat stage an ailment moved when it took hold.
fn undo_stage(target: &mut CombatantStats, ailment: &ActiveAilment) {
    if ailment.stage_applied && ailment.kind == StatusAilment::Burned {
        target.adjust_stage(StatType::AttackPhysical, 1);
    }
}

/// Removes every ailment, undoing their stage changes.
pub fn clear_ailments(target: &mut CombatantStats) {
    for ailment in std::mem::take(&mut target.ailments) {
        undo_stage(target, &ailment);
    }
}

/// Removes one ailment if present. Returns true if it was there.
pub fn remove_ailment(target: &mut CombatantStats, kind: StatusAilment) -> bool {
    let Some(index) = target.ailments.iter().position(|a| a.kind == kind) else {
        return false;
    };
    let ailment = target.ailments.remove(index);
    undo_stage(target, &ailment);
    true
}

/// Damage breaks sleep. Returns true if the target woke up.
pub fn wake_on_damage(target: &mut CombatantStats, damage: i32, mut log: impl FnMut(String)) -> bool {
    if damage <= 0 || target.is_defeated() || !remove_ailment(target, StatusAilment::Asleep) {
        return false;
    }
    log(format!("[AIL][{}] wakes up", target.name));
    true
}

fn tick_damage(target: &CombatantStats, scale_num: i32, scale_den: i32) -> i32 {
    let base = (target.max_health / TICK_DAMAGE_DIVISOR).max(1);
    let mut dmg = base * scale_num / scale_den;
    if target.has_ailment(StatusAilment::Hearty) {
        dmg /= 2;
    }
    dmg.max(1)
}

/// Resolve ailment effects at one of the combatant's turn boundaries.
///
/// Start of turn: Hearty heals, Burned hurts, then skip checks. Sleeping restores a little health.
/// End of turn: Poisoned hurts, then every ailment ticks down one turn.
pub fn process_turn_boundary(
    boundary: TurnBoundary,
    target: &mut CombatantStats,
    dice: &mut Dice,
    mut log: impl FnMut(String),
) -> TurnGate {
    use StatusAilment::*;

    if target.is_defeated() {
        return TurnGate::Skip;
    }
    let asleep = target.has_ailment(Asleep);

    match boundary {
        TurnBoundary::StartOfTurn => {
            if target.has_ailment(Hearty) {
                let healed = target.heal((target.max_health / HEARTY_HEAL_DIVISOR).max(1));
                if healed > 0 {
                    log(format!("[AIL][{}] Hearty restores {} HP", target.name, healed));
                }
            }
            if target.has_ailment(Burned) {
                let dmg = if asleep { tick_damage(target, 1, 2) } else { tick_damage(target, 1, 1) };
                let dealt = target.take_damage(dmg);
                log(format!("[AIL][{}] Burned for {} HP", target.name, dealt));
                if target.is_defeated() {
                    return TurnGate::Skip;
                }
            }

            if asleep {
                let healed = target.heal((target.max_health / SLEEP_HEAL_DIVISOR).max(1));
                log(format!(
                    "[AIL][{}] is asleep and skips the turn, restoring {} HP",
                    target.name, healed
                ));
                return TurnGate::Skip;
            }
            if target.has_ailment(Stunned) {
                log(format!("[AIL][{}] is stunned and skips the turn", target.name));
                return TurnGate::Skip;
            }
            if target.has_ailment(Paralyzed) && dice.chance(PARALYSIS_SKIP_CHANCE) {
                log(format!("[AIL][{}] is paralyzed and cannot move", target.name));
                return TurnGate::Skip;
            }
            TurnGate::Act
        }
        TurnBoundary::EndOfTurn => {
            if target.has_ailment(Poisoned) {
                let dmg = if asleep { tick_damage(target, 2, 1) } else { tick_damage(target, 1, 1) };
                let dealt = target.take_damage(dmg);
                log(format!("[AIL][{}] Poison deals {} HP", target.name, dealt));
            }

            for a in target.ailments.iter_mut() {
                a.turns_remaining = a.turns_remaining.saturating_sub(1);
            }
            let (expired, kept): (Vec<_>, Vec<_>) =
                std::mem::take(&mut target.ailments).into_iter().partition(|a| a.turns_remaining == 0);
            target.ailments = kept;
            for ailment in &expired {
                log(format!("[AIL][{}] is no longer {:?}", target.name, ailment.kind));
                undo_stage(target, ailment);
            }
            TurnGate::Act
        }
    }
}
