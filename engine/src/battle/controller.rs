use std::collections::VecDeque;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ailments::{
    TurnBoundary, TurnGate, apply_ailment, clear_ailments, process_turn_boundary, wake_on_damage,
};
use crate::catalog::{
    BonusType, Classification, CommandKind, CommandSpec, FULL_ACCURACY, Movement as MoveMode,
    StatEffect, Strike, UsableAction,
};
use crate::command::{CommandEngine, CommandError, CommandLimits, CommandOutcome, CommandReport, Ticket};
use crate::damage::{self, DamageFormula, StandardFormula};
use crate::scheduler::TurnScheduler;
use crate::stats::{CombatantId, CombatantStats, Side, StatType};
use crate::{Button, Dice, StatusAilment};

use super::hooks::{Destination, HudColor, Movement, Presentation};
use super::state::{BattleState, MenuState};
use super::{Combatant, targeting};

pub const NARRATOR_SECONDS: f32 = 3.0;
pub const DAMAGE_BONUS_PERCENT: i32 = 125;
pub const CRIT_BONUS_CHANCE: u32 = 25;
pub const CRIT_DAMAGE_PERCENT: i32 = 150;
pub const MANA_GAIN_PERCENT: i32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BattleError {
    #[error("a battle needs at least one {0:?}")]
    EmptySide(Side),
    #[error("no combatant with id {0}")]
    UnknownCombatant(CombatantId),
    #[error("{name} has no usable action at index {index}")]
    UnknownAction { name: String, index: usize },
    #[error("no enemy is waiting to act")]
    NotDeciding,
    #[error("no valid target for {0}")]
    NoTarget(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrikeResult {
    /// No action command gated the strike.
    Unchallenged,
    Passed(BonusType),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Selection {
    class: Classification,
    index: usize,
}

fn menu_for(class: Classification) -> MenuState {
    match class {
        Classification::Attack => MenuState::ItemsMenuAttacks,
        Classification::Skill => MenuState::ItemsMenuSkills,
        Classification::Item => MenuState::ItemsMenuInventory,
    }
}

fn class_for(menu: MenuState) -> Option<Classification> {
    match menu {
        MenuState::ItemsMenuAttacks => Some(Classification::Attack),
        MenuState::ItemsMenuSkills => Some(Classification::Skill),
        MenuState::ItemsMenuInventory => Some(Classification::Item),
        _ => None,
    }
}

/// Drives a whole battle from the host's frame loop and input events.
pub struct BattleController<H> {
    roster: Vec<Combatant>,
    scheduler: TurnScheduler,
    commands: CommandEngine,
    formula: Box<dyn DamageFormula>,
    dice: Dice,
    hooks: H,
    state: BattleState,
    menu: MenuState,
    current: Option<CombatantId>,
    selection: Option<Selection>,
    entry_cursor: usize,
    target_cursor: usize,
    candidates: Vec<CombatantId>,
    targets: Vec<CombatantId>,
    action: Option<UsableAction>,
    strikes: VecDeque<Strike>,
    /// Strikes waiting on an action command: the current one, then at most one lookahead.
    pending: VecDeque<(Ticket, Strike)>,
    moving: Option<Destination>,
    narrator: Option<f32>,
    next_turn_due: bool,
    turns_taken: u32,
    log: Vec<String>,
}

impl<H: Presentation + Movement> BattleController<H> {
    pub fn new(
        mut roster: Vec<Combatant>,
        limits: CommandLimits,
        dice: Dice,
        hooks: H,
    ) -> Result<Self, BattleError> {
        for side in [Side::Hero, Side::Enemy] {
            if !roster.iter().any(|c| c.stats.side == side) {
                return Err(BattleError::EmptySide(side));
            }
        }
        for c in roster.iter_mut() {
            c.sync_roller();
        }
        Ok(Self {
            roster,
            scheduler: TurnScheduler::new(),
            commands: CommandEngine::new(limits),
            formula: Box::new(StandardFormula),
            dice,
            hooks,
            state: BattleState::None,
            menu: MenuState::None,
            current: None,
            selection: None,
            entry_cursor: 0,
            target_cursor: 0,
            candidates: Vec::new(),
            targets: Vec::new(),
            action: None,
            strikes: VecDeque::new(),
            pending: VecDeque::new(),
            moving: None,
            narrator: None,
            next_turn_due: false,
            turns_taken: 0,
            log: Vec::new(),
        })
    }

    pub fn with_formula(mut self, formula: impl DamageFormula + 'static) -> Self {
        self.formula = Box::new(formula);
        self
    }

    /* ---------------- queries ---------------- */

    pub fn state(&self) -> BattleState {
        self.state
    }

    pub fn menu(&self) -> MenuState {
        self.menu
    }

    pub fn players_turn(&self) -> bool {
        self.state.players_turn()
    }

    pub fn current(&self) -> Option<CombatantId> {
        self.current
    }

    pub fn roster(&self) -> &[Combatant] {
        &self.roster
    }

    pub fn stats(&self, id: CombatantId) -> Option<&CombatantStats> {
        self.roster.get(id).map(|c| &c.stats)
    }

    pub fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    pub fn commands(&self) -> &CommandEngine {
        &self.commands
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn targets(&self) -> &[CombatantId] {
        &self.targets
    }

    pub fn target_candidates(&self) -> &[CombatantId] {
        &self.candidates
    }

    pub fn queued_strikes(&self) -> usize {
        self.strikes.len() + self.pending.len()
    }

    pub fn turns_taken(&self) -> u32 {
        self.turns_taken
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn take_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log)
    }

    fn name(&self, id: CombatantId) -> &str {
        self.roster.get(id).map(|c| c.stats.name.as_str()).unwrap_or("?")
    }

    fn side_defeated(&self, side: Side) -> bool {
        self.roster
            .iter()
            .filter(|c| c.stats.side == side)
            .all(|c| c.stats.is_defeated())
    }

    pub fn heroes_defeated(&self) -> bool {
        self.side_defeated(Side::Hero)
    }

    pub fn enemies_defeated(&self) -> bool {
        self.side_defeated(Side::Enemy)
    }

    /// The winning side once the other is wiped out.
    pub fn outcome(&self) -> Option<Side> {
        if self.enemies_defeated() {
            Some(Side::Hero)
        } else if self.heroes_defeated() {
            Some(Side::Enemy)
        } else {
            None
        }
    }

    pub fn experience_earned(&self) -> u32 {
        self.roster
            .iter()
            .filter(|c| c.stats.side == Side::Enemy && c.stats.is_defeated())
            .map(|c| c.stats.experience_reward)
            .sum()
    }

    pub fn snapshots(&self, side: Side) -> Vec<CombatantStats> {
        self.roster
            .iter()
            .filter(|c| c.stats.side == side)
            .map(|c| c.stats.clone())
            .collect()
    }

    /// The enemy whose action is still to be chosen by the host.
    pub fn awaiting_enemy_decision(&self) -> Option<CombatantId> {
        if self.state == BattleState::EnemyMovingToTarget && self.action.is_none() {
            self.current
        } else {
            None
        }
    }

    /// Attacks and skills `id` can use right now, in the order `enemy_act` indexes them.
    pub fn usable_actions(&self, id: CombatantId) -> Vec<&UsableAction> {
        let Some(c) = self.roster.get(id) else {
            return Vec::new();
        };
        c.loadout
            .attacks
            .iter()
            .chain(c.loadout.skills.iter())
            .filter(|a| a.unlocked(c.stats.level) && a.can_afford(c.stats.mana))
            .collect()
    }

    /* ---------------- lifecycle ---------------- */

    /// Build the turn order and start the intro narration.
    pub fn begin(&mut self) {
        self.state = BattleState::IntroduceBattle;
        self.scheduler
            .initialize(self.roster.iter().enumerate().map(|(id, c)| (id, &c.stats)));

        let enemies: Vec<&str> = self
            .roster
            .iter()
            .filter(|c| c.stats.side == Side::Enemy)
            .map(|c| c.stats.name.as_str())
            .collect();
        let text = format!("{} appeared!", enemies.join(", "));
        self.log.push(format!("[START] {}", text));
        info!(combatants = self.roster.len(), "battle begins");
        self.narrate(&text);
    }

    fn narrate(&mut self, text: &str) {
        self.narrator = Some(NARRATOR_SECONDS);
        self.hooks.narrate(text);
    }

    /// One frame. Starts a due turn, then ticks narrator, health rollers and action commands.
    pub fn update(&mut self, dt: f32) {
        if self.next_turn_due && self.state == BattleState::FinishTurn {
            self.get_next_turn();
        }

        if let Some(timer) = self.narrator.as_mut() {
            *timer -= dt;
            if *timer <= 0.0 {
                self.narrator = None;
                self.hooks.narrator_cleared();
                if self.state == BattleState::IntroduceBattle {
                    self.current_battle_state_finished();
                }
            }
        }

        for id in 0..self.roster.len() {
            self.roll_health(id, dt);
        }

        for report in self.commands.advance(dt) {
            self.on_command_report(report);
        }
    }

    /// Roll one hero's health a frame further. A hero rolled to 0 in the middle of
    /// their own turn loses the rest of it.
    fn roll_health(&mut self, id: CombatantId, dt: f32) {
        let c = &mut self.roster[id];
        let exhausted = c.stats.has_ailment(StatusAilment::Exhausted);
        let was_defeated = c.stats.is_defeated();
        let Some(health) = c.roller.as_mut().and_then(|r| r.advance(dt, exhausted)) else {
            return;
        };
        c.stats.health = health;
        let status = c.stats.health_status();
        self.hooks.health_rolled(id, health, status);
        self.sync_after_change(id, was_defeated);

        let fell = !was_defeated && self.roster[id].stats.is_defeated();
        if fell && self.current == Some(id) && self.state.players_turn() && !self.next_turn_due {
            self.force_stop_player_input();
        }
    }

    /// Pull the next combatant from the rotation and enter its decision phase.
    pub fn get_next_turn(&mut self) -> Option<CombatantId> {
        self.next_turn_due = false;
        self.commands.reset_activations();
        let roster = &self.roster;
        let Some(id) = self
            .scheduler
            .next(|id| roster.get(id).is_some_and(|c| !c.stats.is_defeated()))
        else {
            warn!("turn order is empty");
            self.state = BattleState::FinishTurn;
            return None;
        };

        self.current = Some(id);
        let name = self.roster[id].stats.name.clone();
        let side = self.roster[id].stats.side;
        self.log.push(format!("[TURN] {}", name));
        debug!(id, %name, "turn starts");
        self.hooks.turn_started(id, &name, side);

        let log = &mut self.log;
        let gate = process_turn_boundary(
            TurnBoundary::StartOfTurn,
            &mut self.roster[id].stats,
            &mut self.dice,
            |m| log.push(m),
        );
        self.sync_after_change(id, false);
        if gate == TurnGate::Skip {
            if !self.roster[id].stats.is_defeated() {
                self.narrate(&format!("{} can't move!", name));
            }
            self.current_battle_state_finished();
            return Some(id);
        }

        match side {
            Side::Hero => {
                self.state = BattleState::PlayerNavigatingMenus;
                self.open_menu(MenuState::MainMenu);
                self.narrate(&format!("What will {} do?", name));
            }
            Side::Enemy => {
                self.state = BattleState::EnemyMovingToTarget;
                self.menu = MenuState::None;
            }
        }
        Some(id)
    }

    /// Wrap up the acting combatant's turn and clear every per-turn leftover.
    pub fn current_battle_state_finished(&mut self) {
        if self.next_turn_due {
            return;
        }
        let was_intro = self.state == BattleState::IntroduceBattle;

        if let Some(actor) = self.current.filter(|_| !was_intro) {
            if !self.roster[actor].stats.is_defeated() {
                let log = &mut self.log;
                process_turn_boundary(
                    TurnBoundary::EndOfTurn,
                    &mut self.roster[actor].stats,
                    &mut self.dice,
                    |m| log.push(m),
                );
                self.sync_after_change(actor, false);
            }
            self.hooks.turn_finished(actor);
            self.turns_taken += 1;
        }

        if !self.strikes.is_empty() || !self.pending.is_empty() {
            debug!(left = self.queued_strikes(), "dropping leftover strikes");
        }
        self.state = BattleState::FinishTurn;
        self.menu = MenuState::None;
        self.selection = None;
        self.candidates.clear();
        self.targets.clear();
        self.action = None;
        self.strikes.clear();
        self.pending.clear();
        self.moving = None;
        self.next_turn_due = true;
    }

    /// Abandon the turn: cancel every outstanding action command and finish at once.
    pub fn force_stop_player_input(&mut self) {
        for report in self.commands.cancel_all() {
            self.hooks.command_resolved(report.ticket, report.outcome);
        }
        self.strikes.clear();
        self.pending.clear();
        self.log.push("[STOP] turn forced to end".to_string());
        warn!("player input force-stopped");
        self.current_battle_state_finished();
    }

    /// Stop every health roller in place.
    pub fn finish_battle(&mut self) {
        for c in self.roster.iter_mut() {
            if let Some(roller) = c.roller.as_mut() {
                roller.stop(c.stats.health);
            }
        }
        let verdict = match self.outcome() {
            Some(Side::Hero) => "heroes win",
            Some(Side::Enemy) => "enemies win",
            None => "no winner",
        };
        self.log.push(format!("[END] {} after {} turns", verdict, self.turns_taken));
        info!(verdict, turns = self.turns_taken, "battle finished");
    }

    /* ---------------- input ---------------- */

    /// Single entry point for player input. Ignored outside player states.
    pub fn check_button_pressed(&mut self, button: Button) {
        if !self.state.players_turn() {
            debug!(?button, state = ?self.state, "not the player's turn");
            return;
        }
        match self.state {
            BattleState::PlayerNavigatingMenus => self.determine_menu(button),
            BattleState::PlayerAttack => {
                self.survive_fatal_hit();
                if let Some(report) = self.commands.press(button) {
                    self.on_command_report(report);
                }
            }
            _ => {}
        }
    }

    /// Any press during the acting hero's attack stops a lethal roll at 1 HP.
    fn survive_fatal_hit(&mut self) {
        let Some(actor) = self.current else {
            return;
        };
        let c = &mut self.roster[actor];
        if c.roller.as_mut().is_some_and(|r| r.survive_fatal_hit()) {
            self.log.push(format!("[HP][{}] hangs on at 1 HP", c.stats.name));
        }
    }

    fn menu_entries(&self, menu: MenuState) -> Vec<String> {
        let Some(actor) = self.current else {
            return Vec::new();
        };
        match menu {
            MenuState::MainMenu => ["Attacks", "Skills", "Items", "Defend"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            MenuState::SelectTarget => self
                .candidates
                .iter()
                .map(|&id| self.name(id).to_string())
                .collect(),
            MenuState::None => Vec::new(),
            items => {
                let Some(class) = class_for(items) else {
                    return Vec::new();
                };
                let loadout = &self.roster[actor].loadout;
                let mut entries: Vec<String> = loadout
                    .entries(class)
                    .iter()
                    .map(|a| match a.mana_cost() {
                        0 => format!("{} [{}]", a.name(), a.command_summary()),
                        cost => format!("{} ({} MP) [{}]", a.name(), cost, a.command_summary()),
                    })
                    .collect();
                if class == Classification::Item {
                    for (entry, stack) in entries.iter_mut().zip(loadout.items.iter()) {
                        entry.push_str(&format!(" x{}", stack.quantity));
                    }
                }
                entries
            }
        }
    }

    fn open_menu(&mut self, menu: MenuState) {
        self.menu = menu;
        self.entry_cursor = 0;
        let entries = self.menu_entries(menu);
        self.hooks.menu_opened(menu, &entries);
    }

    fn notice(&mut self, text: &str, color: HudColor) {
        if let Some(actor) = self.current {
            self.hooks.hud_notice(actor, text, color);
        }
        self.log.push(format!("[HUD] {}", text));
    }

    fn determine_menu(&mut self, button: Button) {
        let Some(actor) = self.current else {
            return;
        };
        match self.menu {
            MenuState::MainMenu => match button {
                Button::South => self.open_menu(MenuState::ItemsMenuAttacks),
                Button::West => {
                    if self.roster[actor].stats.has_ailment(StatusAilment::Frightened) {
                        self.notice("Too frightened to use skills!", HudColor::Warning);
                    } else {
                        self.open_menu(MenuState::ItemsMenuSkills);
                    }
                }
                Button::North => self.open_menu(MenuState::ItemsMenuInventory),
                Button::East => {
                    debug!(actor, "defend chosen");
                    self.notice("Defend has no effect", HudColor::Normal);
                }
            },
            MenuState::ItemsMenuAttacks | MenuState::ItemsMenuSkills | MenuState::ItemsMenuInventory => {
                match button {
                    Button::East => self.open_menu(MenuState::MainMenu),
                    Button::South => self.choose_entry(),
                    _ => {}
                }
            }
            MenuState::SelectTarget => match button {
                Button::East => {
                    if let Some(sel) = self.selection.take() {
                        self.candidates.clear();
                        self.open_menu(menu_for(sel.class));
                        self.entry_cursor = sel.index;
                    }
                }
                Button::South => self.confirm_targets(),
                _ => {}
            },
            MenuState::None => {}
        }
    }

    /// Move the items-menu cursor (stand-in for the external menu widget).
    pub fn highlight_entry(&mut self, index: usize) -> bool {
        let Some(class) = class_for(self.menu) else {
            return false;
        };
        let Some(actor) = self.current else {
            return false;
        };
        if index >= self.roster[actor].loadout.entries(class).len() {
            return false;
        }
        self.entry_cursor = index;
        true
    }

    /// Move the target cursor while selecting targets.
    pub fn highlight_target(&mut self, index: usize) -> bool {
        if self.menu != MenuState::SelectTarget || index >= self.candidates.len() {
            return false;
        }
        self.target_cursor = index;
        true
    }

    fn choose_entry(&mut self) {
        let (Some(class), Some(actor)) = (class_for(self.menu), self.current) else {
            return;
        };
        let c = &self.roster[actor];
        let Some(action) = c.loadout.entry(class, self.entry_cursor) else {
            self.notice("Nothing to use", HudColor::Normal);
            return;
        };
        if !action.unlocked(c.stats.level) {
            let text = format!("{} requires level {}", action.name(), action.required_level());
            self.notice(&text, HudColor::Warning);
            return;
        }
        if !action.can_afford(c.stats.mana) {
            let text = format!("Not enough mana for {}", action.name());
            self.notice(&text, HudColor::Mana);
            return;
        }

        let candidates = targeting::candidates(&self.roster, actor, action.target());
        if candidates.is_empty() {
            self.notice("No one to target", HudColor::Normal);
            return;
        }
        self.selection = Some(Selection { class, index: self.entry_cursor });
        self.candidates = candidates;
        self.target_cursor = 0;
        self.hooks.targets_offered(&self.candidates);
        self.open_menu(MenuState::SelectTarget);
    }

    fn confirm_targets(&mut self) {
        let (Some(sel), Some(actor)) = (self.selection, self.current) else {
            return;
        };
        let Some(action) = self.roster[actor].loadout.entry(sel.class, sel.index).cloned() else {
            return;
        };
        let chosen = self.candidates.get(self.target_cursor).copied();
        let targets = targeting::resolve(&self.roster, actor, action.target(), chosen);
        if targets.is_empty() {
            self.notice("No one to target", HudColor::Normal);
            return;
        }
        let item_index = (sel.class == Classification::Item).then_some(sel.index);
        self.execute_turn(actor, action, item_index, targets);
    }

    /// Supply the enemy's choice: index into [`usable_actions`](Self::usable_actions) and a target.
    pub fn enemy_act(&mut self, action_index: usize, target: Option<CombatantId>) -> Result<(), BattleError> {
        let actor = self.awaiting_enemy_decision().ok_or(BattleError::NotDeciding)?;
        let action = self
            .usable_actions(actor)
            .get(action_index)
            .map(|a| (*a).clone())
            .ok_or_else(|| BattleError::UnknownAction {
                name: self.name(actor).to_string(),
                index: action_index,
            })?;
        if let Some(t) = target {
            if t >= self.roster.len() {
                return Err(BattleError::UnknownCombatant(t));
            }
        }
        let targets = targeting::resolve(&self.roster, actor, action.target(), target);
        if targets.is_empty() {
            return Err(BattleError::NoTarget(action.name().to_string()));
        }
        self.execute_turn(actor, action, None, targets);
        Ok(())
    }

    /* ---------------- turn execution ---------------- */

    fn execute_turn(
        &mut self,
        actor: CombatantId,
        action: UsableAction,
        item_index: Option<usize>,
        targets: Vec<CombatantId>,
    ) {
        let c = &mut self.roster[actor];
        if !c.stats.spend_mana(action.mana_cost()) {
            let text = format!("Not enough mana for {}", action.name());
            self.notice(&text, HudColor::Mana);
            return;
        }
        if let Some(index) = item_index {
            c.loadout.consume_item(index);
        }

        let names = targets
            .iter()
            .map(|&t| self.name(t).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let line = format!("[USE] {} uses {} on {}", self.name(actor), action.name(), names);
        self.log.push(line);

        let player = self.roster[actor].stats.side == Side::Hero;
        self.menu = MenuState::None;
        self.selection = None;
        self.candidates.clear();
        let first = targets[0];
        self.targets = targets;
        let movement = action.movement();
        self.action = Some(action);

        match movement {
            MoveMode::MoveToTarget => {
                self.state = if player {
                    BattleState::PlayerMovingToTarget
                } else {
                    BattleState::EnemyMovingToTarget
                };
                self.moving = Some(Destination::Target(first));
                self.hooks.request_move(actor, Destination::Target(first));
            }
            MoveMode::StayInPlace => self.start_attack(),
        }
    }

    /// Movement collaborator callback. Ignored unless `actor` is the one moving.
    pub fn movement_arrived(&mut self, actor: CombatantId) {
        if self.current != Some(actor) {
            warn!(actor, "arrival from a combatant whose turn it is not");
            return;
        }
        match self.moving.take() {
            Some(Destination::Target(_)) => self.start_attack(),
            Some(Destination::Base) => self.current_battle_state_finished(),
            None => debug!(actor, "arrival without a pending move"),
        }
    }

    fn start_attack(&mut self) {
        let Some(actor) = self.current else {
            return;
        };
        self.state = match self.roster[actor].stats.side {
            Side::Hero => BattleState::PlayerAttack,
            Side::Enemy => BattleState::EnemyAttack,
        };
        self.execute_turn_prepare_attack();
    }

    /// Queue every strike of the chosen action and start on the first.
    fn execute_turn_prepare_attack(&mut self) {
        let Some(action) = self.action.as_ref() else {
            return;
        };
        self.strikes = action.strikes().iter().cloned().collect();
        self.advance_strike();
    }

    fn player_acting(&self) -> bool {
        self.current
            .is_some_and(|id| self.roster[id].stats.side == Side::Hero)
    }

    /// Step through queued strikes until one waits on an action command or the queue runs dry.
    fn advance_strike(&mut self) {
        loop {
            if !self.pending.is_empty() {
                self.look_ahead();
                return;
            }
            let Some(strike) = self.strikes.pop_front() else {
                self.attack_finished();
                return;
            };

            if !self.player_acting() || strike.command() == CommandSpec::None {
                self.apply_strike(&strike, StrikeResult::Unchallenged);
                continue;
            }

            match self.request_command(&strike) {
                Ok(ticket) => self.pending.push_back((ticket, strike)),
                Err(CommandError::PoolExhausted(kind)) => {
                    self.log.push(format!("[CMD] {:?} request dropped", kind));
                }
                Err(CommandError::Unsupported(kind)) => {
                    warn!(?kind, "action command not simulated; strike lands unchallenged");
                    self.apply_strike(&strike, StrikeResult::Unchallenged);
                }
                Err(err) => {
                    warn!(%err, "strike dropped");
                    self.log.push(format!("[CMD] strike dropped: {}", err));
                }
            }
        }
    }

    fn request_command(&mut self, strike: &Strike) -> Result<Ticket, CommandError> {
        let ticket = self
            .commands
            .request(strike.command(), strike.buttons(), strike.bonus(), &mut self.dice)?;
        if let Some(view) = self.commands.view(ticket) {
            self.log.push(format!("[CMD] {} armed", view.label));
            self.hooks.command_armed(&view);
        }
        Ok(ticket)
    }

    /// While a timely press is current, start the gauge of the next timely strike so
    /// chained presses follow each other without a gap.
    fn look_ahead(&mut self) {
        if self.pending.len() != 1 || !self.player_acting() {
            return;
        }
        let chained = |s: &Strike| matches!(s.command(), CommandSpec::Timely(_));
        let current_timely = self.pending.front().is_some_and(|(_, s)| chained(s));
        let next_timely = self.strikes.front().is_some_and(|s| chained(s));
        if !current_timely || !next_timely || !self.commands.has_room(CommandKind::TimelyPress) {
            return;
        }
        let Some(strike) = self.strikes.pop_front() else {
            return;
        };
        match self.request_command(&strike) {
            Ok(ticket) => {
                self.commands.highlight_next();
                self.pending.push_back((ticket, strike));
            }
            Err(err) => {
                debug!(%err, "lookahead request refused");
                self.strikes.push_front(strike);
            }
        }
    }

    fn on_command_report(&mut self, report: CommandReport) {
        self.hooks.command_resolved(report.ticket, report.outcome);
        self.log.push(format!("[CMD] {}", report.outcome.label()));

        let Some(index) = self.pending.iter().position(|(t, _)| *t == report.ticket) else {
            debug!(ticket = report.ticket, "report with no strike waiting");
            return;
        };
        let Some((ticket, strike)) = self.pending.remove(index) else {
            return;
        };

        match report.outcome {
            CommandOutcome::Passed { bonus } => self.apply_strike(&strike, StrikeResult::Passed(bonus)),
            CommandOutcome::Failed => self.apply_strike(&strike, StrikeResult::Failed),
            CommandOutcome::EndedBeforeReady => {
                warn!(ticket, "action command ended before it was ready; strike has no effect");
            }
            CommandOutcome::Cancelled => return,
        }
        if matches!(self.state, BattleState::PlayerAttack | BattleState::EnemyAttack) {
            self.advance_strike();
        }
    }

    fn attack_finished(&mut self) {
        let Some(actor) = self.current else {
            return;
        };
        let moved = self
            .action
            .as_ref()
            .is_some_and(|a| a.movement() == MoveMode::MoveToTarget);
        if moved && !self.roster[actor].stats.is_defeated() {
            self.state = match self.roster[actor].stats.side {
                Side::Hero => BattleState::PlayerMovingBackToBase,
                Side::Enemy => BattleState::EnemyMovingBackToBase,
            };
            self.moving = Some(Destination::Base);
            self.hooks.request_move(actor, Destination::Base);
        } else {
            self.current_battle_state_finished();
        }
    }

    /// Apply one strike to every current target.
    ///
    /// Passed strikes hit at full power (x1.25 with a damage bonus), failed ones at half power
    /// and without stage, mana or ailment effects. Unchallenged strikes hit at full power.
    fn apply_strike(&mut self, strike: &Strike, result: StrikeResult) {
        let Some(actor) = self.current else {
            return;
        };
        let attacker = self.roster[actor].stats.clone();
        let (damage_stat, accuracy) = self
            .action
            .as_ref()
            .map(|a| (a.damage_stat(), a.accuracy()))
            .unwrap_or((StatType::AttackPhysical, FULL_ACCURACY));
        let bonus = match result {
            StrikeResult::Passed(b) => b,
            _ => BonusType::None,
        };
        let failed = result == StrikeResult::Failed;

        if bonus == BonusType::ManaGain {
            let stats = &mut self.roster[actor].stats;
            let amount = (stats.max_mana.saturating_mul(MANA_GAIN_PERCENT) / 100).max(1);
            let gained = stats.restore_mana(amount);
            self.log.push(format!("[MP][{}] +{} from bonus", attacker.name, gained));
            self.hooks.hud_notice(actor, &format!("+{} MP", gained), HudColor::Mana);
        }

        for target in self.targets.clone() {
            let was_defeated = self.roster[target].stats.is_defeated();
            if was_defeated && !strike.revives() {
                debug!(target, "skipping defeated target");
                continue;
            }

            let power = strike.power();
            if power > 0 {
                // Full accuracy skips the roll and leaves the random stream untouched.
                if accuracy < FULL_ACCURACY && !damage::did_attack_land(&mut self.dice, accuracy) {
                    let line = format!("[MISS] {} misses {}", attacker.name, self.name(target));
                    self.log.push(line);
                    self.hooks.hud_notice(target, "Miss", HudColor::Normal);
                    continue;
                }
                let mut base = match bonus {
                    BonusType::DamageOutput => power.saturating_mul(DAMAGE_BONUS_PERCENT) / 100,
                    _ => power,
                };
                if failed {
                    base = (base / 2).max(1);
                }
                let crit_bonus = if bonus == BonusType::CritIncrease { CRIT_BONUS_CHANCE } else { 0 };
                if self.dice.chance(damage::crit_chance(&attacker, crit_bonus)) {
                    base = base.saturating_mul(CRIT_DAMAGE_PERCENT) / 100;
                    self.log.push(format!("[CRIT] {} lands a critical strike", attacker.name));
                }
                let dealt = self.deal_damage(target, base, &attacker, damage_stat);
                self.hooks.hud_notice(target, &format!("-{}", dealt), HudColor::Damage);
                self.wake(target, dealt);
            }

            for (&effect, &magnitude) in strike.effects().iter() {
                self.apply_effect(target, effect, magnitude, failed);
            }

            if !failed
                && !strike.ailments().is_empty()
                && !self.roster[target].stats.is_defeated()
                && self.dice.chance(strike.ailment_chance())
            {
                for (&kind, &turns) in strike.ailments().iter() {
                    let log = &mut self.log;
                    apply_ailment(&mut self.roster[target].stats, kind, turns, |m| log.push(m));
                }
            }

            self.sync_after_change(target, was_defeated);
        }
    }

    /// Enemies lose health at once. Heroes take the hit on their health roller: the
    /// estimate drops by the full damage, the true estimate by a lucky 75 to 95 percent.
    fn deal_damage(
        &mut self,
        target: CombatantId,
        base: i32,
        attacker: &CombatantStats,
        stat: StatType,
    ) -> i32 {
        let c = &mut self.roster[target];
        let Some(roller) = c.roller.as_mut() else {
            let log = &mut self.log;
            return damage::apply_damage(&mut c.stats, base, attacker, stat, self.formula.as_ref(), |m| {
                log.push(m)
            });
        };
        let hit = damage::estimate_damage_guarantee_luck(
            &c.stats,
            base,
            attacker,
            stat,
            self.formula.as_ref(),
            &mut self.dice,
        );
        let before = roller.estimate();
        roller.take_hit(hit.shown, hit.taken);
        let estimate = roller.estimate();
        let status = roller.status(c.stats.max_health);
        self.log.push(format!(
            "[DMG][{}] {} → est. {} (−{}) from {}",
            c.stats.name, before, estimate, hit.shown, attacker.name
        ));
        self.hooks.health_estimate(target, estimate, status);
        hit.shown
    }

    fn wake(&mut self, target: CombatantId, damage: i32) {
        let log = &mut self.log;
        wake_on_damage(&mut self.roster[target].stats, damage, |m| log.push(m));
    }

    fn apply_effect(&mut self, target: CombatantId, effect: StatEffect, magnitude: i32, failed: bool) {
        let c = &mut self.roster[target];
        let stats = &mut c.stats;
        let name = stats.name.clone();
        match effect {
            StatEffect::Power => {}
            StatEffect::HealthCurrent if magnitude > 0 => {
                let amount = if failed { (magnitude / 2).max(1) } else { magnitude };
                let healed = match c.roller.as_mut() {
                    Some(roller) => {
                        let risen = roller.restore(amount, stats.max_health);
                        let (estimate, status) = (roller.estimate(), roller.status(stats.max_health));
                        self.hooks.health_estimate(target, estimate, status);
                        risen
                    }
                    None => stats.heal(amount),
                };
                self.log.push(format!("[HEAL][{}] +{} HP", name, healed));
                self.hooks.hud_notice(target, &format!("+{}", healed), HudColor::Heal);
            }
            StatEffect::HealthCurrent => {
                let amount = magnitude.saturating_neg();
                let lost = match c.roller.as_mut() {
                    Some(roller) => {
                        let before = roller.estimate();
                        roller.take_hit(amount, amount);
                        let (estimate, status) = (roller.estimate(), roller.status(stats.max_health));
                        self.hooks.health_estimate(target, estimate, status);
                        before - estimate
                    }
                    None => stats.take_damage(amount),
                };
                self.log.push(format!("[DMG][{}] −{} HP", name, lost));
                self.wake(target, lost);
            }
            _ if failed => {}
            StatEffect::ManaCurrent => {
                let changed = stats.restore_mana(magnitude);
                self.log.push(format!("[MP][{}] {:+}", name, changed));
            }
            StatEffect::HealthMax => {
                stats.adjust_max_health(magnitude);
                self.log.push(format!("[STAT][{}] max HP {:+}", name, magnitude));
            }
            StatEffect::ManaMax => {
                stats.adjust_max_mana(magnitude);
                self.log.push(format!("[STAT][{}] max MP {:+}", name, magnitude));
            }
            stage => {
                if let Some(stat) = stage.stage_stat() {
                    let delta = magnitude.clamp(i8::MIN as i32, i8::MAX as i32) as i8;
                    if let Some(now) = stats.adjust_stage(stat, delta) {
                        self.log.push(format!("[STAT][{}] {:?} stage {:+} → {}", name, stat, delta, now));
                    }
                }
            }
        }
    }

    /// Fold direct health changes into the roller and keep the turn order in step with
    /// defeat and revival.
    fn sync_after_change(&mut self, id: CombatantId, was_defeated: bool) {
        let c = &mut self.roster[id];
        c.sync_roller();
        let defeated = c.stats.is_defeated();
        if defeated && !was_defeated {
            clear_ailments(&mut c.stats);
            let name = c.stats.name.clone();
            self.scheduler.remove(id);
            self.log.push(format!("[DOWN] {} is defeated", name));
            info!(id, %name, "combatant defeated");
            self.hooks.defeated(id);
        } else if !defeated && was_defeated {
            let speed = c.stats.stats.speed;
            let name = c.stats.name.clone();
            self.scheduler.insert(id, speed);
            self.log.push(format!("[REVIVE] {} is back on their feet", name));
            info!(id, %name, "combatant revived");
            self.hooks.revived(id);
        }
    }
}
