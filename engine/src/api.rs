use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::battle::{Combatant, Destination, Movement, Presentation};
use crate::catalog::{CommandKind, TargetScope};
use crate::command::CommandLimits;
use crate::content::{self, CombatantDef, Format, Library};
use crate::scheduler::TurnScheduler;
use crate::stats::{CombatantId, CombatantStats, HealthStatus, Side};
use crate::{BattleController, BattleState, Button, Dice, MenuState};

const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;
const DEFAULT_MAX_TURNS: u32 = 200;
const DEFAULT_PLAYER_SKILL: u32 = 80;
/// Simulated seconds a single turn may take before the run is abandoned.
const MAX_SECONDS_PER_TURN: f32 = 60.0;
/// Keeps the scripted player's rolls off the battle's own random stream.
const PLAYER_SEED_SALT: u64 = 0x5eed_0f_9a11;

/// A roster slot in a config: builtin id or inline definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RosterEntry {
    Builtin(String),
    Inline(CombatantDef),
}

fn default_time_step() -> f32 {
    DEFAULT_TIME_STEP
}

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

fn default_player_skill() -> u32 {
    DEFAULT_PLAYER_SKILL
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleConfig {
    /// Builtin encounter supplying heroes and enemies when those lists are empty.
    #[serde(default)]
    pub encounter: Option<String>,
    #[serde(default)]
    pub heroes: Vec<RosterEntry>,
    #[serde(default)]
    pub enemies: Vec<RosterEntry>,
    /// Extra move list files, added on top of the builtin ones.
    #[serde(default)]
    pub move_list_paths: Vec<PathBuf>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_time_step")]
    pub time_step: f32,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Percent chance the scripted player hits each input right.
    #[serde(default = "default_player_skill")]
    pub player_skill: u32,
    #[serde(default)]
    pub command_limits: CommandLimits,
}

impl BattleConfig {
    pub fn builtin(encounter: impl Into<String>, seed: u64) -> Self {
        Self {
            encounter: Some(encounter.into()),
            heroes: Vec::new(),
            enemies: Vec::new(),
            move_list_paths: Vec::new(),
            seed,
            time_step: DEFAULT_TIME_STEP,
            max_turns: DEFAULT_MAX_TURNS,
            player_skill: DEFAULT_PLAYER_SKILL,
            command_limits: CommandLimits::default(),
        }
    }

    pub fn parse(text: &str, format: Format) -> Result<Self> {
        format.parse(text).context("failed to parse battle config")
    }
}

pub fn load_config(path: &Path) -> Result<BattleConfig> {
    content::load_file(path)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleResult {
    pub winner: String,
    pub turns: u32,
    pub experience: u32,
    /// Hero snapshots as they stand after the battle.
    pub heroes: Vec<CombatantStats>,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchSummary {
    pub samples: u32,
    pub hero_wins: u32,
    pub enemy_wins: u32,
    pub draws: u32,
    pub avg_turns: f64,
    pub avg_experience: f64,
}

/// Presentation and movement for runs without a screen. Moves arrive on the next frame.
#[derive(Debug, Default)]
pub struct HeadlessHooks {
    arrivals: Vec<CombatantId>,
    narration: Vec<String>,
}

impl HeadlessHooks {
    pub fn narration(&self) -> &[String] {
        &self.narration
    }

    fn take_arrivals(&mut self) -> Vec<CombatantId> {
        std::mem::take(&mut self.arrivals)
    }
}

impl Presentation for HeadlessHooks {
    fn narrate(&mut self, text: &str) {
        debug!(text, "narrator");
        self.narration.push(text.to_string());
    }

    fn health_estimate(&mut self, id: CombatantId, estimate: i32, status: HealthStatus) {
        if status == HealthStatus::Danger {
            debug!(id, estimate, "health heading into danger");
        }
    }
}

impl Movement for HeadlessHooks {
    fn request_move(&mut self, actor: CombatantId, destination: Destination) {
        debug!(actor, ?destination, "instant move");
        self.arrivals.push(actor);
    }
}

pub fn build_library(cfg: &BattleConfig) -> Result<Library> {
    let mut library = Library::builtin()?;
    for path in &cfg.move_list_paths {
        library
            .load_file(path)
            .with_context(|| format!("failed to load move list {}", path.display()))?;
    }
    Ok(library)
}

fn resolve_entry(entry: &RosterEntry) -> Result<CombatantDef> {
    match entry {
        RosterEntry::Builtin(id) => content::builtin_combatant(id),
        RosterEntry::Inline(def) => Ok(def.clone()),
    }
}

/// Heroes first, then enemies, in config order.
pub fn build_roster(cfg: &BattleConfig, library: &Library) -> Result<Vec<Combatant>> {
    let (mut heroes, mut enemies) = (cfg.heroes.clone(), cfg.enemies.clone());
    if let Some(id) = cfg.encounter.as_deref() {
        let encounter = content::builtin_encounter(id)?;
        if heroes.is_empty() {
            heroes = encounter.heroes.into_iter().map(RosterEntry::Builtin).collect();
        }
        if enemies.is_empty() {
            enemies = encounter.enemies.into_iter().map(RosterEntry::Builtin).collect();
        }
    }
    if heroes.is_empty() || enemies.is_empty() {
        bail!("a battle needs at least one hero and one enemy");
    }

    let mut roster = Vec::with_capacity(heroes.len() + enemies.len());
    for (side, entries) in [(Side::Hero, &heroes), (Side::Enemy, &enemies)] {
        for entry in entries {
            let def = resolve_entry(entry)?;
            roster.push(def.build(side, library)?);
        }
    }
    Ok(roster)
}

/// Names in the opening turn order.
pub fn turn_order(cfg: &BattleConfig) -> Result<Vec<String>> {
    let library = build_library(cfg)?;
    let roster = build_roster(cfg, &library)?;
    let mut scheduler = TurnScheduler::new();
    scheduler.initialize(roster.iter().enumerate().map(|(id, c)| (id, &c.stats)));
    Ok(scheduler
        .order()
        .into_iter()
        .map(|id| roster[id].stats.name.clone())
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Plan {
    menu: MenuState,
    entry: usize,
    target: CombatantId,
}

/// Scripted stand-in for a human at the controller.
struct AutoPlayer {
    dice: Dice,
    skill: u32,
    plan: Option<Plan>,
}

impl AutoPlayer {
    fn new(seed: u64, skill: u32) -> Self {
        Self { dice: Dice::from_seed(seed ^ PLAYER_SEED_SALT), skill: skill.min(100), plan: None }
    }

    fn first_living(ctl: &BattleController<HeadlessHooks>, side: Side) -> Option<CombatantId> {
        ctl.roster()
            .iter()
            .position(|c| c.stats.side == side && !c.stats.is_defeated())
    }

    /// Heal when in danger, open with an affordable skill while mana is high, otherwise attack.
    fn decide(&self, ctl: &BattleController<HeadlessHooks>, actor: CombatantId) -> Option<Plan> {
        let me = &ctl.roster()[actor];
        let enemy = Self::first_living(ctl, Side::Enemy)?;

        if me.stats.health_status() == HealthStatus::Danger {
            let heal = me.loadout.items.iter().position(|s| {
                s.item.target() == TargetScope::TeamOne && s.item.strikes().iter().any(|st| st.revives())
            });
            if let Some(entry) = heal {
                return Some(Plan { menu: MenuState::ItemsMenuInventory, entry, target: actor });
            }
        }

        if me.stats.mana * 2 >= me.stats.max_mana {
            let skill = me.loadout.skills.iter().position(|a| {
                a.unlocked(me.stats.level)
                    && a.can_afford(me.stats.mana)
                    && matches!(a.target(), TargetScope::EnemyOne | TargetScope::EnemyAll)
            });
            if let Some(entry) = skill {
                return Some(Plan { menu: MenuState::ItemsMenuSkills, entry, target: enemy });
            }
        }

        let entry = me.loadout.attacks.iter().position(|a| a.unlocked(me.stats.level))?;
        Some(Plan { menu: MenuState::ItemsMenuAttacks, entry, target: enemy })
    }

    fn wrong_button(&mut self, right: Button) -> Button {
        let others: Vec<Button> = Button::ALL.iter().copied().filter(|b| *b != right).collect();
        self.dice.pick(&others).unwrap_or(right)
    }

    fn navigate(&mut self, ctl: &mut BattleController<HeadlessHooks>) {
        let Some(actor) = ctl.current() else {
            return;
        };
        let before = ctl.menu();
        match before {
            MenuState::MainMenu => {
                self.plan = self.decide(ctl, actor);
                let Some(plan) = self.plan else {
                    warn!(actor, "scripted player has nothing to do");
                    ctl.force_stop_player_input();
                    return;
                };
                let button = match plan.menu {
                    MenuState::ItemsMenuSkills => Button::West,
                    MenuState::ItemsMenuInventory => Button::North,
                    _ => Button::South,
                };
                ctl.check_button_pressed(button);
                if ctl.menu() == MenuState::MainMenu && plan.menu != MenuState::ItemsMenuAttacks {
                    self.plan = self.decide_attack(ctl, actor);
                    ctl.check_button_pressed(Button::South);
                }
            }
            MenuState::ItemsMenuAttacks | MenuState::ItemsMenuSkills | MenuState::ItemsMenuInventory => {
                let entry = self.plan.map(|p| p.entry).unwrap_or(0);
                ctl.highlight_entry(entry);
                ctl.check_button_pressed(Button::South);
            }
            MenuState::SelectTarget => {
                let wanted = self.plan.map(|p| p.target);
                let index = wanted
                    .and_then(|t| ctl.target_candidates().iter().position(|&c| c == t))
                    .unwrap_or(0);
                ctl.highlight_target(index);
                ctl.check_button_pressed(Button::South);
            }
            MenuState::None => {}
        }
        if ctl.state() == BattleState::PlayerNavigatingMenus && ctl.menu() == before {
            warn!(actor, menu = ?before, "scripted player is stuck; ending the turn");
            ctl.force_stop_player_input();
        }
    }

    fn decide_attack(&self, ctl: &BattleController<HeadlessHooks>, actor: CombatantId) -> Option<Plan> {
        let me = &ctl.roster()[actor];
        let enemy = Self::first_living(ctl, Side::Enemy)?;
        let entry = me.loadout.attacks.iter().position(|a| a.unlocked(me.stats.level))?;
        Some(Plan { menu: MenuState::ItemsMenuAttacks, entry, target: enemy })
    }

    fn play_command(&mut self, ctl: &mut BattleController<HeadlessHooks>) {
        let Some(view) = ctl.commands().current_view() else {
            return;
        };
        match view.kind {
            CommandKind::RapidPress => {
                let Some(button) = view.button else {
                    return;
                };
                let wants_more = match view.band {
                    Some((lo, hi)) => view.value < (lo + hi) / 2.0,
                    None => true,
                };
                if wants_more && self.dice.chance(self.skill) {
                    ctl.check_button_pressed(button);
                }
            }
            CommandKind::TimelyPress => {
                let Some(button) = view.button else {
                    return;
                };
                if !view.ready {
                    return;
                }
                let press = if self.dice.chance(self.skill) { button } else { self.wrong_button(button) };
                ctl.check_button_pressed(press);
            }
            _ => {}
        }
    }

    fn step(&mut self, ctl: &mut BattleController<HeadlessHooks>) {
        match ctl.state() {
            BattleState::PlayerNavigatingMenus => self.navigate(ctl),
            BattleState::PlayerAttack => self.play_command(ctl),
            _ => {}
        }
    }
}

/// Placeholder enemy choice: first usable action, aimed at the first living hero.
fn enemy_choice(ctl: &mut BattleController<HeadlessHooks>, actor: CombatantId) {
    let target = AutoPlayer::first_living(ctl, Side::Hero);
    if let Err(err) = ctl.enemy_act(0, target) {
        warn!(actor, %err, "enemy cannot act; ending its turn");
        ctl.force_stop_player_input();
    }
}

fn winner_label(outcome: Option<Side>) -> &'static str {
    match outcome {
        Some(Side::Hero) => "heroes",
        Some(Side::Enemy) => "enemies",
        None => "draw",
    }
}

pub fn simulate_battle(cfg: BattleConfig) -> Result<BattleResult> {
    if cfg.time_step.is_nan() || cfg.time_step <= 0.0 {
        bail!("time_step must be positive, got {}", cfg.time_step);
    }
    let library = build_library(&cfg)?;
    let roster = build_roster(&cfg, &library)?;
    let mut ctl = BattleController::new(
        roster,
        cfg.command_limits,
        Dice::from_seed(cfg.seed),
        HeadlessHooks::default(),
    )?;
    let mut player = AutoPlayer::new(cfg.seed, cfg.player_skill);

    let max_frames = (cfg.max_turns.max(1) as f32 * MAX_SECONDS_PER_TURN / cfg.time_step) as u64;
    let mut frames = 0u64;
    ctl.begin();
    loop {
        if ctl.state() == BattleState::FinishTurn && ctl.outcome().is_some() {
            break;
        }
        if ctl.turns_taken() >= cfg.max_turns {
            warn!(turns = ctl.turns_taken(), "turn cap reached");
            break;
        }
        if frames >= max_frames {
            warn!(frames, "frame cap reached");
            break;
        }
        frames += 1;

        ctl.update(cfg.time_step);
        for actor in ctl.hooks_mut().take_arrivals() {
            ctl.movement_arrived(actor);
        }
        if let Some(actor) = ctl.awaiting_enemy_decision() {
            enemy_choice(&mut ctl, actor);
        } else if ctl.players_turn() {
            player.step(&mut ctl);
        }
    }
    ctl.finish_battle();

    Ok(BattleResult {
        winner: winner_label(ctl.outcome()).to_string(),
        turns: ctl.turns_taken(),
        experience: ctl.experience_earned(),
        heroes: ctl.snapshots(Side::Hero),
        log: ctl.take_log(),
    })
}

/// Run `samples` battles with seeds `cfg.seed..cfg.seed + samples`.
pub fn simulate_battle_many(cfg: BattleConfig, samples: u32) -> Result<BatchSummary> {
    let mut summary = BatchSummary {
        samples,
        hero_wins: 0,
        enemy_wins: 0,
        draws: 0,
        avg_turns: 0.0,
        avg_experience: 0.0,
    };
    let (mut turns, mut experience) = (0u64, 0u64);
    for i in 0..samples {
        let mut run = cfg.clone();
        run.seed = cfg.seed.wrapping_add(i as u64);
        let res = simulate_battle(run)?;
        match res.winner.as_str() {
            "heroes" => summary.hero_wins += 1,
            "enemies" => summary.enemy_wins += 1,
            _ => summary.draws += 1,
        }
        turns += res.turns as u64;
        experience += res.experience as u64;
    }
    if samples > 0 {
        summary.avg_turns = turns as f64 / samples as f64;
        summary.avg_experience = experience as f64 / samples as f64;
    }
    Ok(summary)
}
