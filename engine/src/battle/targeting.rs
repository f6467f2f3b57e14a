use crate::catalog::TargetScope;
use crate::stats::{CombatantId, Side};

use super::Combatant;

fn side_of(roster: &[Combatant], side: Side, include_defeated: bool) -> impl Iterator<Item = CombatantId> + '_ {
    roster
        .iter()
        .enumerate()
        .filter(move |(_, c)| c.stats.side == side && (include_defeated || !c.stats.is_defeated()))
        .map(|(id, _)| id)
}

/// Who the player may pick for `scope`. Allies stay pickable while defeated so they can be revived.
pub fn candidates(roster: &[Combatant], actor: CombatantId, scope: TargetScope) -> Vec<CombatantId> {
    let Some(me) = roster.get(actor) else {
        return Vec::new();
    };
    let own = me.stats.side;
    match scope {
        TargetScope::SelfOnly => vec![actor],
        TargetScope::TeamOne | TargetScope::TeamAll => side_of(roster, own, true).collect(),
        TargetScope::EnemyOne | TargetScope::EnemyAll => side_of(roster, own.opponent(), false).collect(),
        TargetScope::Everyone => (0..roster.len()).filter(|&id| !roster[id].stats.is_defeated()).collect(),
    }
}

/// The full target set for a confirmed choice. Single-target scopes need `chosen` to be a valid candidate.
pub fn resolve(
    roster: &[Combatant],
    actor: CombatantId,
    scope: TargetScope,
    chosen: Option<CombatantId>,
) -> Vec<CombatantId> {
    let pool = candidates(roster, actor, scope);
    match scope {
        TargetScope::TeamOne | TargetScope::EnemyOne => chosen
            .filter(|id| pool.contains(id))
            .into_iter()
            .collect(),
        _ => pool,
    }
}
