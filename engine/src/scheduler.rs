//! Turn rotation across every living combatant.

use std::cmp::Ordering;
use std::collections::VecDeque;

use tracing::debug;

use crate::stats::{CombatantId, CombatantStats};

/// Position a revived combatant lands at when it is not faster than the head.
pub const REVIVE_OFFSET: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    id: CombatantId,
    speed: i32,
}

/// Speed descending, then luck, special defense, physical defense, special attack and
/// physical attack ascending.
pub fn turn_order_cmp(a: &CombatantStats, b: &CombatantStats) -> Ordering {
    b.stats
        .speed
        .cmp(&a.stats.speed)
        .then(a.stats.luck.cmp(&b.stats.luck))
        .then(a.stats.defense_special.cmp(&b.stats.defense_special))
        .then(a.stats.defense_physical.cmp(&b.stats.defense_physical))
        .then(a.stats.attack_special.cmp(&b.stats.attack_special))
        .then(a.stats.attack_physical.cmp(&b.stats.attack_physical))
}

#[derive(Debug, Clone, Default)]
pub struct TurnScheduler {
    queue: VecDeque<Entry>,
    acting: Option<Entry>,
}

impl TurnScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the rotation once from the roster. Defeated combatants are left out; ties keep roster order.
    pub fn initialize<'a>(&mut self, roster: impl IntoIterator<Item = (CombatantId, &'a CombatantStats)>) {
        let mut living: Vec<(CombatantId, &CombatantStats)> =
            roster.into_iter().filter(|(_, s)| !s.is_defeated()).collect();
        living.sort_by(|a, b| turn_order_cmp(a.1, b.1));
        self.queue = living
            .into_iter()
            .map(|(id, s)| Entry { id, speed: s.stats.speed })
            .collect();
        self.acting = None;
        debug!(order = ?self.order(), "turn order initialized");
    }

    /// Re-enqueue the combatant that just acted (if still alive), then dequeue the next.
    pub fn next(&mut self, is_alive: impl Fn(CombatantId) -> bool) -> Option<CombatantId> {
        if let Some(prev) = self.acting.take() {
            if is_alive(prev.id) {
                self.queue.push_back(prev);
            }
        }
        let entry = self.queue.pop_front()?;
        self.acting = Some(entry);
        Some(entry.id)
    }

    /// Take a combatant out of the rotation. Returns false if it was not there.
    pub fn remove(&mut self, id: CombatantId) -> bool {
        let mut removed = false;
        if self.acting.is_some_and(|e| e.id == id) {
            self.acting = None;
            removed = true;
        }
        if let Some(pos) = self.queue.iter().position(|e| e.id == id) {
            self.queue.remove(pos);
            removed = true;
        }
        if removed {
            debug!(id, "removed from turn order");
        }
        removed
    }

    /// Put a revived combatant back: at the front if faster than the head, otherwise third.
    /// Does nothing if it is already in the rotation.
    pub fn insert(&mut self, id: CombatantId, speed: i32) -> bool {
        if self.contains(id) {
            return false;
        }
        let entry = Entry { id, speed };
        let pos = match self.queue.front() {
            Some(head) if speed > head.speed => 0,
            _ => REVIVE_OFFSET.min(self.queue.len()),
        };
        self.queue.insert(pos, entry);
        debug!(id, pos, "inserted into turn order");
        true
    }

    pub fn contains(&self, id: CombatantId) -> bool {
        self.acting.is_some_and(|e| e.id == id) || self.queue.iter().any(|e| e.id == id)
    }

    /// The combatant whose turn it currently is.
    pub fn acting(&self) -> Option<CombatantId> {
        self.acting.map(|e| e.id)
    }

    /// Waiting combatants, front first. The acting one is not included.
    pub fn order(&self) -> Vec<CombatantId> {
        self.queue.iter().map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len() + usize::from(self.acting.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
