use battle_engine::catalog::{BonusType, CommandKind, CommandSpec, RapidPreset, SequencePreset, TimelyPreset};
use battle_engine::command::{CommandEngine, CommandError, CommandLimits, CommandOutcome};
use battle_engine::{Button, Dice};

const DT: f32 = 1.0 / 60.0;

fn timely(engine: &mut CommandEngine, dice: &mut Dice) -> Result<u64, CommandError> {
    engine.request(
        CommandSpec::Timely(TimelyPreset::Medium),
        &[Button::South],
        BonusType::None,
        dice,
    )
}

fn wait_until_ready(engine: &mut CommandEngine) -> Vec<battle_engine::command::CommandReport> {
    let mut reports = Vec::new();
    while !engine.current_view().is_some_and(|v| v.ready) {
        reports.extend(engine.advance(DT));
    }
    reports
}

#[test]
fn instances_become_current_in_request_order() {
    let mut engine = CommandEngine::default();
    let mut dice = Dice::from_seed(5);
    let a = timely(&mut engine, &mut dice).unwrap();
    let b = timely(&mut engine, &mut dice).unwrap();
    let c = timely(&mut engine, &mut dice).unwrap();
    assert_eq!(engine.outstanding(), 3);
    assert!(engine.is_current(a));

    let mut resolved = Vec::new();
    for _ in 0..3 {
        wait_until_ready(&mut engine);
        let report = engine.press(Button::South).unwrap();
        resolved.push(report.ticket);
    }
    assert_eq!(resolved, vec![a, b, c]);
    assert_eq!(engine.activations(), &[a, b, c]);
    assert!(engine.is_idle());
}

#[test]
fn only_the_current_instance_hears_input() {
    let mut engine = CommandEngine::default();
    let mut dice = Dice::from_seed(5);
    let a = timely(&mut engine, &mut dice).unwrap();
    let b = timely(&mut engine, &mut dice).unwrap();
    wait_until_ready(&mut engine);
    assert_eq!(engine.press(Button::South).unwrap().ticket, a);
    assert!(engine.is_current(b));
    // b has not ticked yet, so its gauge is still full
    let view = engine.current_view().unwrap();
    assert_eq!(view.value, 3.0);
}

#[test]
fn requests_beyond_capacity_are_rejected() {
    let mut engine = CommandEngine::new(CommandLimits { rapid: 1, timely: 2 });
    let mut dice = Dice::from_seed(5);
    timely(&mut engine, &mut dice).unwrap();
    timely(&mut engine, &mut dice).unwrap();
    assert_eq!(
        timely(&mut engine, &mut dice),
        Err(CommandError::PoolExhausted(CommandKind::TimelyPress))
    );

    engine
        .request(CommandSpec::Rapid(RapidPreset::Long), &[Button::West], BonusType::None, &mut dice)
        .unwrap();
    assert_eq!(
        engine.request(CommandSpec::Rapid(RapidPreset::Short), &[Button::West], BonusType::None, &mut dice),
        Err(CommandError::PoolExhausted(CommandKind::RapidPress))
    );
    assert_eq!(engine.outstanding(), 3);
}

#[test]
fn unsupported_and_empty_requests_are_errors() {
    let mut engine = CommandEngine::default();
    let mut dice = Dice::from_seed(5);
    assert_eq!(
        engine.request(CommandSpec::None, &[Button::West], BonusType::None, &mut dice),
        Err(CommandError::NoCommand)
    );
    assert_eq!(
        engine.request(
            CommandSpec::Sequence(SequencePreset::RevealAll),
            &[Button::West],
            BonusType::None,
            &mut dice
        ),
        Err(CommandError::Unsupported(CommandKind::SequencePress))
    );
    assert_eq!(
        engine.request(CommandSpec::Timely(TimelyPreset::Slow), &[], BonusType::None, &mut dice),
        Err(CommandError::NoButtons)
    );
    assert!(engine.is_idle());
}

#[test]
fn highlighted_instance_that_runs_out_ends_before_ready() {
    let mut engine = CommandEngine::default();
    let mut dice = Dice::from_seed(5);
    let a = engine
        .request(CommandSpec::Rapid(RapidPreset::Long), &[Button::West], BonusType::None, &mut dice)
        .unwrap();
    let b = engine
        .request(CommandSpec::Timely(TimelyPreset::Quick), &[Button::North], BonusType::None, &mut dice)
        .unwrap();
    assert_eq!(engine.highlight_next(), Some(b));
    assert!(engine.is_current(a));

    let mut reports = Vec::new();
    for _ in 0..60 {
        reports.extend(engine.advance(DT));
    }
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].ticket, b);
    assert_eq!(reports[0].outcome, CommandOutcome::EndedBeforeReady);
    assert!(engine.is_current(a));
    assert_eq!(engine.outstanding(), 1);
}

#[test]
fn cancel_all_reports_every_outstanding_instance() {
    let mut engine = CommandEngine::default();
    let mut dice = Dice::from_seed(5);
    let a = timely(&mut engine, &mut dice).unwrap();
    let b = timely(&mut engine, &mut dice).unwrap();
    let reports = engine.cancel_all();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].ticket, a);
    assert_eq!(reports[1].ticket, b);
    assert!(reports.iter().all(|r| r.outcome == CommandOutcome::Cancelled));
    assert!(engine.is_idle());
    assert!(engine.press(Button::South).is_none());
}

#[test]
fn activation_history_clears_on_reset() {
    let mut engine = CommandEngine::default();
    let mut dice = Dice::from_seed(5);
    let a = timely(&mut engine, &mut dice).unwrap();
    wait_until_ready(&mut engine);
    engine.press(Button::South).unwrap();
    assert_eq!(engine.activations(), &[a]);

    engine.reset_activations();
    assert!(engine.activations().is_empty());

    let b = timely(&mut engine, &mut dice).unwrap();
    assert_eq!(engine.activations(), &[b]);
}

#[test]
fn room_tracks_outstanding_instances_per_kind() {
    let mut engine = CommandEngine::new(CommandLimits { rapid: 1, timely: 1 });
    let mut dice = Dice::from_seed(5);
    assert!(engine.has_room(CommandKind::TimelyPress));
    timely(&mut engine, &mut dice).unwrap();
    assert!(!engine.has_room(CommandKind::TimelyPress));
    assert!(engine.has_room(CommandKind::RapidPress));

    wait_until_ready(&mut engine);
    engine.press(Button::South).unwrap();
    assert!(engine.has_room(CommandKind::TimelyPress));
}

#[test]
fn highlighting_starts_the_next_timer_once() {
    let mut engine = CommandEngine::default();
    let mut dice = Dice::from_seed(5);
    let a = timely(&mut engine, &mut dice).unwrap();
    let b = timely(&mut engine, &mut dice).unwrap();
    assert_eq!(engine.highlight_next(), Some(b));
    assert_eq!(engine.highlight_next(), None);

    engine.advance(DT);
    assert!(engine.is_current(a));
    assert!(engine.view(b).is_some_and(|v| v.value < 3.0));
}
