use battle_engine::roller::{HealthRoller, DEFAULT_SPEED, MAX_SPEED, MIN_SPEED, ROLL_INTERVAL};

fn roll_out(roller: &mut HealthRoller) -> i32 {
    for _ in 0..1_000 {
        if roller.is_aligned() {
            return roller.health();
        }
        roller.advance(ROLL_INTERVAL, false);
    }
    panic!("roller never settled: {:?}", roller);
}

#[test]
fn speed_defaults_to_three_and_stays_within_one_to_six() {
    assert_eq!(HealthRoller::new(10).speed(), DEFAULT_SPEED);
    assert_eq!(DEFAULT_SPEED, 3);
    assert_eq!(HealthRoller::with_speed(10, 0).speed(), MIN_SPEED);
    assert_eq!(HealthRoller::with_speed(10, 9).speed(), MAX_SPEED);
    assert_eq!((MIN_SPEED, MAX_SPEED), (1, 6));
}

#[test]
fn one_point_per_quarter_second_at_speed_one() {
    let mut r = HealthRoller::with_speed(60, 1);
    r.take_hit(5, 5);
    assert_eq!(r.advance(0.25, false), Some(59));
    assert_eq!(r.advance(0.125, false), None);
    assert_eq!(r.advance(0.125, false), Some(58));
    assert_eq!(r.estimate(), 55);
}

#[test]
fn speed_scales_points_per_tick() {
    let mut r = HealthRoller::with_speed(60, 4);
    r.take_hit(10, 10);
    assert_eq!(r.advance(0.25, false), Some(56));
}

#[test]
fn exhaustion_falls_faster_and_climbs_slower() {
    let mut down = HealthRoller::new(60);
    down.take_hit(20, 20);
    assert_eq!(down.advance(0.25, true), Some(54));

    let mut up = HealthRoller::new(30);
    assert_eq!(up.restore(20, 60), 20);
    assert_eq!(up.advance(0.25, true), Some(31));
    assert_eq!(up.advance(0.25, true), Some(33));

    let mut rested = HealthRoller::new(30);
    rested.restore(20, 60);
    assert_eq!(rested.advance(0.25, false), Some(33));
}

#[test]
fn aligned_rollers_do_not_move() {
    let mut r = HealthRoller::new(40);
    assert!(r.is_aligned());
    assert_eq!(r.advance(5.0, false), None);
    assert_eq!(r.health(), 40);
}

#[test]
fn rolling_stops_at_the_true_estimate() {
    let mut r = HealthRoller::new(60);
    r.take_hit(20, 12);
    assert_eq!((r.estimate(), r.true_estimate()), (40, 48));
    assert_eq!(roll_out(&mut r), 48);
    assert_eq!(r.estimate(), 48);
}

#[test]
fn restore_is_capped_at_max_health() {
    let mut r = HealthRoller::new(50);
    assert_eq!(r.restore(30, 60), 10);
    assert_eq!(r.true_estimate(), 60);
    assert_eq!(roll_out(&mut r), 60);
}

#[test]
fn a_fatal_roll_can_be_stopped_at_one() {
    let mut r = HealthRoller::new(3);
    r.take_hit(5, 5);
    assert_eq!((r.estimate(), r.true_estimate()), (0, 0));
    assert!(r.survive_fatal_hit());
    assert!(!r.survive_fatal_hit());
    assert_eq!(roll_out(&mut r), 1);

    let mut settled = HealthRoller::new(0);
    assert!(!settled.survive_fatal_hit());
}

#[test]
fn direct_health_changes_carry_into_the_estimates() {
    let mut r = HealthRoller::new(60);
    r.take_hit(10, 10);
    r.sync(56, 60);
    assert_eq!((r.health(), r.estimate(), r.true_estimate()), (56, 46, 46));
    assert_eq!(roll_out(&mut r), 46);
}

#[test]
fn stopping_freezes_in_place() {
    let mut r = HealthRoller::new(60);
    r.take_hit(30, 30);
    r.advance(0.25, false);
    r.stop(57);
    assert!(r.is_aligned());
    assert_eq!(r.advance(1.0, false), None);
    assert_eq!(r.estimate(), 57);
}
