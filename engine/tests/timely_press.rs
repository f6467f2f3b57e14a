use battle_engine::catalog::{BonusType, CommandKind, CommandSpec, TimelyPreset};
use battle_engine::command::{CommandEngine, CommandLimits, CommandOutcome, CommandPhase, TimelyPress};
use battle_engine::{Button, Dice};

const DT: f32 = 1.0 / 60.0;

fn request(engine: &mut CommandEngine, preset: TimelyPreset, buttons: &[Button], seed: u64) -> u64 {
    let mut dice = Dice::from_seed(seed);
    engine
        .request(CommandSpec::Timely(preset), buttons, BonusType::None, &mut dice)
        .unwrap()
}

#[test]
fn press_inside_the_window_passes() {
    let mut engine = CommandEngine::default();
    let ticket = request(&mut engine, TimelyPreset::Medium, &[Button::South], 1);
    let mut frames = 0;
    while !engine.current_view().unwrap().ready {
        assert!(engine.advance(DT).is_empty());
        frames += 1;
    }
    // 3.0 → 0.8 at 3.0/s takes about 0.73 s
    assert!((43..=45).contains(&frames), "{}", frames);
    let report = engine.press(Button::South).unwrap();
    assert_eq!(report.ticket, ticket);
    assert_eq!(report.outcome, CommandOutcome::Passed { bonus: BonusType::None });
}

#[test]
fn early_press_fails() {
    let mut engine = CommandEngine::default();
    request(&mut engine, TimelyPreset::Medium, &[Button::South], 1);
    engine.advance(DT);
    let report = engine.press(Button::South).unwrap();
    assert_eq!(report.outcome, CommandOutcome::Failed);
    assert!(engine.is_idle());
}

#[test]
fn wrong_button_in_the_window_fails() {
    let mut engine = CommandEngine::default();
    request(&mut engine, TimelyPreset::Quick, &[Button::North], 1);
    while !engine.current_view().unwrap().ready {
        engine.advance(DT);
    }
    assert_eq!(engine.press(Button::East).unwrap().outcome, CommandOutcome::Failed);
}

#[test]
fn running_dry_while_current_fails() {
    let mut engine = CommandEngine::default();
    request(&mut engine, TimelyPreset::Slow, &[Button::North], 1);
    let mut reports = Vec::new();
    for _ in 0..120 {
        reports.extend(engine.advance(DT));
    }
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, CommandOutcome::Failed);
}

#[test]
fn depletion_rates_differ_by_preset() {
    let mut slow = TimelyPress::new(TimelyPreset::Slow, Button::West);
    let mut quick = TimelyPress::new(TimelyPreset::Quick, Button::West);
    assert!(slow.time_left() > quick.time_left());
    assert!((slow.time_left() - 1.2).abs() < 1e-4);
    assert!((quick.time_left() - 0.75).abs() < 1e-4);
    slow.arm();
    quick.arm();
    assert_eq!(slow.phase(), CommandPhase::Armed);
    assert_eq!(slow.gauge(), 3.0);
    assert_eq!(quick.goal(), 0.8);
}

#[test]
fn high_noon_button_stays_hidden_until_near_ready() {
    let mut engine = CommandEngine::default();
    request(&mut engine, TimelyPreset::HighNoonSlow, &[Button::North], 9);
    let view = engine.current_view().unwrap();
    assert_eq!(view.kind, CommandKind::TimelyPress);
    assert_eq!(view.label, "HIGH NOON");
    assert!(view.button.is_none());

    let mut revealed_at = None;
    while !engine.current_view().unwrap().ready {
        engine.advance(DT);
        let view = engine.current_view().unwrap();
        if view.button.is_some() && revealed_at.is_none() {
            revealed_at = Some(view.value);
        }
    }
    let gauge = revealed_at.expect("button revealed before the window");
    assert!(gauge <= 1.0 + 1e-4 && gauge > 0.8, "{}", gauge);

    let button = engine.current_view().unwrap().button.unwrap();
    assert!(matches!(
        engine.press(button).unwrap().outcome,
        CommandOutcome::Passed { .. }
    ));
}

#[test]
fn high_noon_ignores_the_strike_buttons_and_draws_from_all_four() {
    let mut seen = std::collections::HashSet::new();
    for seed in 0..64 {
        let mut press = CommandEngine::new(CommandLimits::default());
        request(&mut press, TimelyPreset::HighNoonQuick, &[Button::North], seed);
        while press.current_view().unwrap().button.is_none() {
            press.advance(DT);
        }
        seen.insert(press.current_view().unwrap().button.unwrap());
    }
    assert!(seen.len() > 1);
}
