use battle_engine::ailments::{apply_ailment, ActiveAilment, StatusAilment};
use battle_engine::battle::{BattleError, Combatant, Destination, Movement, Presentation};
use battle_engine::catalog::{
    ActionDef, ActionKind, CommandSpec, Element, ItemStack, ItemType, Loadout, Movement as MoveMode,
    StatEffect, Strike, TargetScope, TimelyPreset, UsableAction,
};
use battle_engine::command::{CommandLimits, CommandOutcome, CommandView, Ticket};
use battle_engine::stats::{BaseStats, CombatantId, CombatantStats, Side, StatType};
use battle_engine::{BattleController, BattleState, Button, Dice, MenuState};

const DT: f32 = 1.0 / 60.0;

#[derive(Default)]
struct Recorder {
    narration: Vec<String>,
    moves: Vec<(CombatantId, Destination)>,
    resolved: Vec<(Ticket, CommandOutcome)>,
    armed: Vec<Ticket>,
    menus: Vec<MenuState>,
    defeated: Vec<CombatantId>,
    revived: Vec<CombatantId>,
}

impl Presentation for Recorder {
    fn narrate(&mut self, text: &str) {
        self.narration.push(text.to_string());
    }
    fn menu_opened(&mut self, menu: MenuState, _entries: &[String]) {
        self.menus.push(menu);
    }
    fn command_armed(&mut self, view: &CommandView) {
        self.armed.push(view.ticket);
    }
    fn command_resolved(&mut self, ticket: Ticket, outcome: CommandOutcome) {
        self.resolved.push((ticket, outcome));
    }
    fn defeated(&mut self, id: CombatantId) {
        self.defeated.push(id);
    }
    fn revived(&mut self, id: CombatantId) {
        self.revived.push(id);
    }
}

impl Movement for Recorder {
    fn request_move(&mut self, actor: CombatantId, destination: Destination) {
        self.moves.push((actor, destination));
    }
}

fn stats(name: &str, side: Side, speed: i32, health: i32) -> CombatantStats {
    CombatantStats::new(
        name,
        side,
        5,
        health,
        40,
        BaseStats {
            attack_physical: 14,
            attack_special: 8,
            defense_physical: 9,
            defense_special: 9,
            speed,
            luck: 0,
        },
    )
}

fn single_slash() -> UsableAction {
    ActionDef::new(
        1,
        "Single Slash",
        ActionKind::Attack { element: Element::Normal },
        TargetScope::EnemyOne,
    )
    .movement(MoveMode::MoveToTarget)
    .strike(
        Strike::new(CommandSpec::Timely(TimelyPreset::Medium), &[Button::West])
            .with_effect(StatEffect::Power, 40),
    )
    .build()
    .unwrap()
}

fn claw() -> UsableAction {
    ActionDef::new(
        2,
        "Claw",
        ActionKind::Attack { element: Element::Normal },
        TargetScope::EnemyOne,
    )
    .strike(Strike::plain().with_effect(StatEffect::Power, 30))
    .build()
    .unwrap()
}

fn phoenix_feather() -> UsableAction {
    ActionDef::new(
        102,
        "Phoenix Feather",
        ActionKind::Item { item_type: ItemType::Consume },
        TargetScope::TeamOne,
    )
    .strike(Strike::plain().with_effect(StatEffect::HealthCurrent, 20))
    .build()
    .unwrap()
}

fn hero(speed: i32) -> Combatant {
    Combatant::new(
        stats("Knight", Side::Hero, speed, 60),
        Loadout { attacks: vec![single_slash()], ..Loadout::default() },
    )
}

fn enemy(speed: i32) -> Combatant {
    let mut s = stats("Slime", Side::Enemy, speed, 45);
    s.experience_reward = 12;
    Combatant::new(s, Loadout { attacks: vec![claw()], ..Loadout::default() })
}

fn controller(roster: Vec<Combatant>) -> BattleController<Recorder> {
    BattleController::new(roster, CommandLimits::default(), Dice::from_seed(42), Recorder::default())
        .unwrap()
}

fn run_until(ctl: &mut BattleController<Recorder>, done: impl Fn(&BattleController<Recorder>) -> bool) {
    for _ in 0..2_000 {
        if done(ctl) {
            return;
        }
        ctl.update(DT);
    }
    panic!("condition not reached; state {:?}", ctl.state());
}

/// Walk the knight through Attacks → Single Slash → first enemy and pass the press.
fn play_slash(ctl: &mut BattleController<Recorder>) {
    ctl.check_button_pressed(Button::South);
    assert_eq!(ctl.menu(), MenuState::ItemsMenuAttacks);
    ctl.check_button_pressed(Button::South);
    assert_eq!(ctl.menu(), MenuState::SelectTarget);
    ctl.check_button_pressed(Button::South);
    assert_eq!(ctl.state(), BattleState::PlayerMovingToTarget);

    ctl.movement_arrived(0);
    assert_eq!(ctl.state(), BattleState::PlayerAttack);
    run_until(ctl, |c| c.commands().current_view().is_some_and(|v| v.ready));
    ctl.check_button_pressed(Button::West);
}

#[test]
fn player_turn_flows_into_enemy_turn() {
    let mut ctl = controller(vec![hero(10), enemy(5)]);
    ctl.begin();
    assert_eq!(ctl.state(), BattleState::IntroduceBattle);
    assert_eq!(ctl.hooks().narration, vec!["Slime appeared!".to_string()]);

    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    assert_eq!(ctl.current(), Some(0));
    assert_eq!(ctl.menu(), MenuState::MainMenu);
    assert!(ctl.hooks().narration.contains(&"What will Knight do?".to_string()));

    play_slash(&mut ctl);
    assert!(matches!(ctl.hooks().resolved[0].1, CommandOutcome::Passed { .. }));
    assert!(ctl.stats(1).unwrap().health < 45);
    assert_eq!(ctl.state(), BattleState::PlayerMovingBackToBase);
    assert_eq!(
        ctl.hooks().moves,
        vec![(0, Destination::Target(1)), (0, Destination::Base)]
    );

    ctl.movement_arrived(0);
    assert_eq!(ctl.state(), BattleState::FinishTurn);
    assert_eq!(ctl.turns_taken(), 1);
    assert_eq!(ctl.commands().activations().len(), single_slash().strikes().len());

    ctl.update(DT);
    assert_eq!(ctl.current(), Some(1));
    assert_eq!(ctl.awaiting_enemy_decision(), Some(1));
    assert!(ctl.state().enemys_turn());
    assert!(!ctl.players_turn());
}

#[test]
fn enemy_strikes_resolve_without_commands() {
    let mut ctl = controller(vec![hero(10), enemy(5)]);
    ctl.begin();
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    play_slash(&mut ctl);
    ctl.movement_arrived(0);
    ctl.update(DT);

    // input is ignored outside player states
    ctl.check_button_pressed(Button::South);
    assert_eq!(ctl.state(), BattleState::EnemyMovingToTarget);

    assert_eq!(ctl.enemy_act(5, Some(0)), Err(BattleError::UnknownAction { name: "Slime".into(), index: 5 }));
    ctl.enemy_act(0, Some(0)).unwrap();
    assert_eq!(ctl.state(), BattleState::FinishTurn);
    assert!(ctl.commands().activations().is_empty());
    assert_eq!(ctl.enemy_act(0, Some(0)), Err(BattleError::NotDeciding));

    // the hit lands on the knight's health roller and rolls in over the next frames
    let roller = ctl.roster()[0].roller.as_ref().unwrap();
    assert!(roller.estimate() < 60);
    assert_eq!(ctl.stats(0).unwrap().health, 60);
    run_until(&mut ctl, |c| c.roster()[0].roller.as_ref().unwrap().is_aligned());
    let roller = ctl.roster()[0].roller.as_ref().unwrap();
    assert_eq!(ctl.stats(0).unwrap().health, roller.true_estimate());
    assert!(ctl.stats(0).unwrap().health < 60);
}

#[test]
fn a_battle_needs_both_sides() {
    let err = BattleController::new(vec![hero(10)], CommandLimits::default(), Dice::from_seed(1), Recorder::default())
        .err();
    assert_eq!(err, Some(BattleError::EmptySide(Side::Enemy)));
}

#[test]
fn defeating_the_last_enemy_ends_the_battle() {
    let mut foe = enemy(5);
    foe.stats.health = 1;
    let mut ctl = controller(vec![hero(10), foe]);
    ctl.begin();
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    play_slash(&mut ctl);

    assert!(ctl.stats(1).unwrap().is_defeated());
    assert_eq!(ctl.hooks().defeated, vec![1]);
    assert!(!ctl.scheduler().contains(1));
    ctl.movement_arrived(0);
    assert_eq!(ctl.state(), BattleState::FinishTurn);
    assert_eq!(ctl.outcome(), Some(Side::Hero));
    assert!(ctl.enemies_defeated());
    assert_eq!(ctl.experience_earned(), 12);

    ctl.finish_battle();
    assert!(ctl.log().last().unwrap().starts_with("[END] heroes win"));
}

#[test]
fn force_stop_cancels_outstanding_commands() {
    let mut ctl = controller(vec![hero(10), enemy(5)]);
    ctl.begin();
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    for _ in 0..3 {
        ctl.check_button_pressed(Button::South);
    }
    ctl.movement_arrived(0);
    assert_eq!(ctl.commands().outstanding(), 1);

    ctl.force_stop_player_input();
    assert_eq!(ctl.hooks().resolved.last().unwrap().1, CommandOutcome::Cancelled);
    assert!(ctl.commands().is_idle());
    assert_eq!(ctl.state(), BattleState::FinishTurn);
    assert!(ctl.targets().is_empty());
    assert_eq!(ctl.queued_strikes(), 0);
    assert_eq!(ctl.stats(1).unwrap().health, 45);
}

#[test]
fn target_menu_back_returns_to_the_attack_list() {
    let mut ctl = controller(vec![hero(10), enemy(5)]);
    ctl.begin();
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    ctl.check_button_pressed(Button::South);
    ctl.check_button_pressed(Button::South);
    assert_eq!(ctl.target_candidates(), &[1]);
    ctl.check_button_pressed(Button::East);
    assert_eq!(ctl.menu(), MenuState::ItemsMenuAttacks);
    ctl.check_button_pressed(Button::East);
    assert_eq!(ctl.menu(), MenuState::MainMenu);
    assert_eq!(
        ctl.hooks().menus,
        vec![
            MenuState::MainMenu,
            MenuState::ItemsMenuAttacks,
            MenuState::SelectTarget,
            MenuState::ItemsMenuAttacks,
            MenuState::MainMenu,
        ]
    );
}

#[test]
fn frightened_heroes_cannot_open_skills() {
    let mut knight = hero(10);
    knight.stats.ailments.push(ActiveAilment::new(StatusAilment::Frightened, 3));
    let mut ctl = controller(vec![knight, enemy(5)]);
    ctl.begin();
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    ctl.check_button_pressed(Button::West);
    assert_eq!(ctl.menu(), MenuState::MainMenu);
    assert!(ctl.log().iter().any(|l| l.starts_with("[HUD] Too frightened")));
}

#[test]
fn stunned_heroes_lose_their_turn() {
    let mut knight = hero(10);
    knight.stats.ailments.push(ActiveAilment::new(StatusAilment::Stunned, 1));
    let mut ctl = controller(vec![knight, enemy(5)]);
    ctl.begin();
    run_until(&mut ctl, |c| c.turns_taken() == 1);
    assert!(ctl.hooks().narration.contains(&"Knight can't move!".to_string()));
    assert!(!ctl.stats(0).unwrap().has_ailment(StatusAilment::Stunned));
    ctl.update(DT);
    assert_eq!(ctl.awaiting_enemy_decision(), Some(1));
}

#[test]
fn items_can_revive_a_fallen_ally() {
    let mut knight = hero(10);
    knight.loadout.items.push(ItemStack { item: phoenix_feather(), quantity: 1 });
    let mut ranger = Combatant::new(stats("Ranger", Side::Hero, 12, 40), Loadout::default());
    ranger.stats.health = 0;
    let mut ctl = controller(vec![knight, ranger, enemy(5)]);
    assert!(ctl.stats(1).unwrap().is_defeated());

    ctl.begin();
    assert!(!ctl.scheduler().contains(1));
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    assert_eq!(ctl.current(), Some(0));

    ctl.check_button_pressed(Button::North);
    assert_eq!(ctl.menu(), MenuState::ItemsMenuInventory);
    ctl.check_button_pressed(Button::South);
    assert_eq!(ctl.target_candidates(), &[0, 1]);
    assert!(ctl.highlight_target(1));
    ctl.check_button_pressed(Button::South);

    assert_eq!(ctl.roster()[1].roller.as_ref().unwrap().estimate(), 20);
    assert_eq!(ctl.stats(1).unwrap().health, 0);
    assert!(ctl.hooks().revived.is_empty());
    assert!(ctl.roster()[0].loadout.items.is_empty());
    assert_eq!(ctl.state(), BattleState::FinishTurn);

    // the first point rolled in brings the ranger back; faster than the knight, so first in line
    run_until(&mut ctl, |c| !c.hooks().revived.is_empty());
    assert_eq!(ctl.hooks().revived, vec![1]);
    assert_eq!(ctl.awaiting_enemy_decision(), Some(2));
    assert_eq!(ctl.scheduler().order(), vec![1, 0]);

    ctl.enemy_act(0, Some(0)).unwrap();
    ctl.update(DT);
    assert_eq!(ctl.current(), Some(1));
    assert_eq!(ctl.state(), BattleState::PlayerNavigatingMenus);

    run_until(&mut ctl, |c| c.stats(1).unwrap().health == 20);
}

#[test]
fn player_states_start_at_menu_navigation() {
    assert!(!BattleState::EnemyMovingBackToBase.players_turn());
    assert!(BattleState::PlayerNavigatingMenus.players_turn());
    assert!(BattleState::PlayerMovingBackToBase.players_turn());
    assert!(!BattleState::FinishTurn.players_turn());
    assert_eq!(BattleState::PlayerAttack.ordinal(), 9);
}

fn hash_slinging_slasher() -> UsableAction {
    let strike = |button| {
        Strike::new(CommandSpec::Timely(TimelyPreset::Medium), &[button]).with_effect(StatEffect::Power, 10)
    };
    ActionDef::new(
        3,
        "Hash Slinging Slasher",
        ActionKind::Attack { element: Element::Normal },
        TargetScope::EnemyOne,
    )
    .strike(strike(Button::North))
    .strike(strike(Button::South))
    .strike(strike(Button::East))
    .build()
    .unwrap()
}

fn slasher_hero() -> Combatant {
    Combatant::new(
        stats("Knight", Side::Hero, 10, 60),
        Loadout { attacks: vec![hash_slinging_slasher()], ..Loadout::default() },
    )
}

/// Attacks → first entry → first target, for actions that stay in place.
fn choose_first_attack(ctl: &mut BattleController<Recorder>) {
    for _ in 0..3 {
        ctl.check_button_pressed(Button::South);
    }
    assert_eq!(ctl.state(), BattleState::PlayerAttack);
}

#[test]
fn every_strike_gets_its_own_command_in_order() {
    let mut ctl = controller(vec![slasher_hero(), enemy(5)]);
    ctl.begin();
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    choose_first_attack(&mut ctl);

    let mut pressed = Vec::new();
    for _ in 0..3 {
        run_until(&mut ctl, |c| c.commands().current_view().is_some_and(|v| v.ready));
        let view = ctl.commands().current_view().unwrap();
        pressed.push(view.button.unwrap());
        ctl.check_button_pressed(view.button.unwrap());
    }

    assert_eq!(pressed, vec![Button::North, Button::South, Button::East]);
    let hooks = ctl.hooks();
    assert_eq!(hooks.armed.len(), 3);
    assert_eq!(ctl.commands().activations(), hooks.armed.as_slice());
    assert!(hooks.resolved.iter().all(|(_, o)| matches!(o, CommandOutcome::Passed { .. })));
    assert_eq!(
        hooks.resolved.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
        hooks.armed
    );
    assert_eq!(ctl.state(), BattleState::FinishTurn);
    assert!(ctl.stats(1).unwrap().health < 45);
}

#[test]
fn queued_press_runs_dry_while_the_current_one_waits() {
    let mut ctl = controller(vec![slasher_hero(), enemy(5)]);
    ctl.begin();
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    choose_first_attack(&mut ctl);

    // the second gauge starts draining alongside the first
    assert_eq!(ctl.commands().outstanding(), 2);
    run_until(&mut ctl, |c| c.state() == BattleState::FinishTurn);

    let outcomes: Vec<_> = ctl.hooks().resolved.iter().map(|(_, o)| *o).collect();
    assert_eq!(
        outcomes,
        vec![CommandOutcome::Failed, CommandOutcome::EndedBeforeReady, CommandOutcome::Failed]
    );
}

#[test]
fn pressing_during_the_attack_survives_a_fatal_roll() {
    let mut knight = hero(5);
    knight.stats.health = 3;
    let mut ctl = controller(vec![knight, enemy(10)]);
    ctl.begin();
    run_until(&mut ctl, |c| c.awaiting_enemy_decision().is_some());
    ctl.enemy_act(0, Some(0)).unwrap();
    let roller = ctl.roster()[0].roller.as_ref().unwrap();
    assert_eq!((roller.estimate(), roller.true_estimate()), (0, 0));

    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    for _ in 0..3 {
        ctl.check_button_pressed(Button::South);
    }
    ctl.movement_arrived(0);
    assert_eq!(ctl.state(), BattleState::PlayerAttack);
    ctl.check_button_pressed(Button::West);

    assert!(ctl.log().iter().any(|l| l == "[HP][Knight] hangs on at 1 HP"));
    run_until(&mut ctl, |c| c.roster()[0].roller.as_ref().unwrap().is_aligned());
    assert_eq!(ctl.stats(0).unwrap().health, 1);
    assert!(ctl.hooks().defeated.is_empty());
}

#[test]
fn a_hero_rolled_to_zero_loses_the_rest_of_their_turn() {
    let mut knight = hero(5);
    knight.stats.health = 3;
    let mut ctl = controller(vec![knight, enemy(10)]);
    ctl.begin();
    run_until(&mut ctl, |c| c.awaiting_enemy_decision().is_some());
    ctl.enemy_act(0, Some(0)).unwrap();

    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    run_until(&mut ctl, |c| c.stats(0).unwrap().is_defeated());
    assert_eq!(ctl.hooks().defeated, vec![0]);
    assert_eq!(ctl.state(), BattleState::FinishTurn);
    assert!(ctl.log().iter().any(|l| l.starts_with("[STOP]")));
    assert_eq!(ctl.outcome(), Some(Side::Enemy));
}

#[test]
fn damage_wakes_a_sleeping_enemy() {
    let mut slime = enemy(5);
    slime.stats.ailments.push(ActiveAilment::new(StatusAilment::Asleep, 3));
    let mut ctl = controller(vec![hero(10), slime]);
    ctl.begin();
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    play_slash(&mut ctl);

    assert!(!ctl.stats(1).unwrap().has_ailment(StatusAilment::Asleep));
    assert!(ctl.log().iter().any(|l| l == "[AIL][Slime] wakes up"));
}

#[test]
fn defeat_undoes_the_burn_attack_drop() {
    let mut slime = enemy(5);
    slime.stats.health = 1;
    assert!(apply_ailment(&mut slime.stats, StatusAilment::Burned, 3, |_| {}));
    assert_eq!(slime.stats.stages.get(StatType::AttackPhysical), -1);
    let mut ctl = controller(vec![hero(10), slime]);
    ctl.begin();
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    play_slash(&mut ctl);

    let slime = ctl.stats(1).unwrap();
    assert!(slime.is_defeated());
    assert!(slime.ailments.is_empty());
    assert_eq!(slime.stages.get(StatType::AttackPhysical), 0);
}

#[test]
fn zero_accuracy_always_misses() {
    let wild_swing = ActionDef::new(
        4,
        "Wild Swing",
        ActionKind::Attack { element: Element::Normal },
        TargetScope::EnemyOne,
    )
    .accuracy(0)
    .strike(Strike::plain().with_effect(StatEffect::Power, 40))
    .build()
    .unwrap();
    let knight = Combatant::new(
        stats("Knight", Side::Hero, 10, 60),
        Loadout { attacks: vec![wild_swing], ..Loadout::default() },
    );
    let mut ctl = controller(vec![knight, enemy(5)]);
    ctl.begin();
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    for _ in 0..3 {
        ctl.check_button_pressed(Button::South);
    }

    assert!(ctl.log().iter().any(|l| l == "[MISS] Knight misses Slime"));
    assert_eq!(ctl.stats(1).unwrap().health, 45);
    assert_eq!(ctl.state(), BattleState::FinishTurn);
}

#[test]
fn defend_is_logged_and_keeps_the_main_menu() {
    let mut ctl = controller(vec![hero(10), enemy(5)]);
    ctl.begin();
    run_until(&mut ctl, |c| c.state() == BattleState::PlayerNavigatingMenus);
    ctl.check_button_pressed(Button::East);
    assert_eq!(ctl.menu(), MenuState::MainMenu);
    assert_eq!(ctl.state(), BattleState::PlayerNavigatingMenus);
    assert!(ctl.log().iter().any(|l| l == "[HUD] Defend has no effect"));
}
