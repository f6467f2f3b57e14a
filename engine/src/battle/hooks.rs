//! Callbacks into the host: HUD, narrator, movement.

use crate::command::{CommandOutcome, CommandView, Ticket};
use crate::stats::{CombatantId, HealthStatus, Side};

use super::state::MenuState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudColor {
    Normal,
    Damage,
    Heal,
    Mana,
    Warning,
    Danger,
}

impl From<HealthStatus> for HudColor {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Good => HudColor::Normal,
            HealthStatus::Warning => HudColor::Warning,
            HealthStatus::Danger => HudColor::Danger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Target(CombatantId),
    Base,
}

/// Fire-and-forget presentation signals. Every method defaults to doing nothing.
pub trait Presentation {
    fn turn_started(&mut self, _id: CombatantId, _name: &str, _side: Side) {}
    fn turn_finished(&mut self, _id: CombatantId) {}
    fn hud_notice(&mut self, _id: CombatantId, _text: &str, _color: HudColor) {}
    fn narrate(&mut self, _text: &str) {}
    fn narrator_cleared(&mut self) {}
    fn menu_opened(&mut self, _menu: MenuState, _entries: &[String]) {}
    fn targets_offered(&mut self, _candidates: &[CombatantId]) {}
    fn command_armed(&mut self, _view: &CommandView) {}
    fn command_resolved(&mut self, _ticket: Ticket, _outcome: CommandOutcome) {}
    /// A hit or heal moved the value a hero's health is rolling toward.
    fn health_estimate(&mut self, _id: CombatantId, _estimate: i32, _status: HealthStatus) {}
    /// A hero's health rolled one or more points.
    fn health_rolled(&mut self, _id: CombatantId, _health: i32, _status: HealthStatus) {}
    fn defeated(&mut self, _id: CombatantId) {}
    fn revived(&mut self, _id: CombatantId) {}
}

/// Moves combatants around the field. Arrival comes back through
/// [`BattleController::movement_arrived`](super::BattleController::movement_arrived).
pub trait Movement {
    fn request_move(&mut self, actor: CombatantId, destination: Destination);
}

/// Hooks that ignore everything. Movement requests are never answered.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHooks;

impl Presentation for NullHooks {}

impl Movement for NullHooks {
    fn request_move(&mut self, _actor: CombatantId, _destination: Destination) {}
}
