use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub mod ailments;
pub mod api;
pub mod battle;
pub mod catalog;
pub mod command;
pub mod content;
pub mod damage;
pub mod logging;
pub mod roller;
pub mod scheduler;
pub mod stats;

pub use ailments::{ActiveAilment, StatusAilment};
pub use battle::{BattleController, BattleState, MenuState};
pub use catalog::{Strike, UsableAction};
pub use command::{CommandEngine, CommandOutcome};
pub use scheduler::TurnScheduler;
pub use stats::{CombatantId, CombatantStats, Side};

/// Logical face buttons delivered by the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    North,
    South,
    East,
    West,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::North, Button::South, Button::East, Button::West];
}

pub struct Dice {
    rng: ChaCha8Rng,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Uniform roll in `0..100`.
    pub fn percent(&mut self) -> u32 {
        self.rng.gen_range(0..100)
    }

    /// True with `pct` percent probability; 0 never passes, 100 always does.
    pub fn chance(&mut self, pct: u32) -> bool {
        self.percent() < pct
    }

    pub fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    pub fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        match items.len() {
            0 => None,
            1 => Some(items[0]),
            n => Some(items[self.rng.gen_range(0..n)]),
        }
    }
}
