//! Battle flow: whose turn, which menu, movement, strikes, and turn completion.

use crate::catalog::Loadout;
use crate::roller::HealthRoller;
use crate::stats::{CombatantStats, Side};

mod controller;
pub mod hooks;
pub mod state;
pub mod targeting;

pub use controller::{BattleController, BattleError, NARRATOR_SECONDS};
pub use hooks::{Destination, HudColor, Movement, NullHooks, Presentation};
pub use state::{BattleState, MenuState, PLAYER_STATE_BOUNDARY};

/// One roster slot: stats plus what the unit can use. Heroes also get a health roller.
#[derive(Debug, Clone)]
pub struct Combatant {
    pub stats: CombatantStats,
    pub loadout: Loadout,
    pub roller: Option<HealthRoller>,
}

impl Combatant {
    pub fn new(stats: CombatantStats, loadout: Loadout) -> Self {
        let roller = (stats.side == Side::Hero).then(|| HealthRoller::new(stats.health));
        Self { stats, loadout, roller }
    }

    /// Replace the hero's roller with one at `speed`. No effect on enemies.
    pub fn with_roller_speed(mut self, speed: u8) -> Self {
        if self.roller.is_some() {
            self.roller = Some(HealthRoller::with_speed(self.stats.health, speed));
        }
        self
    }

    /// Fold health changes made directly on `stats` into the roller's estimates.
    pub fn sync_roller(&mut self) {
        if let Some(roller) = self.roller.as_mut() {
            roller.sync(self.stats.health, self.stats.max_health);
        }
    }
}
