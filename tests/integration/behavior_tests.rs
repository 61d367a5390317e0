//! Behaviour scenarios: motion cycle, re-trigger, blink, manual position.

use super::mock_hw::{Harness, HwCall, TICK_MS};

use prophead::app::events::AppEvent;
use prophead::config::{BehaviorConfig, HeadProfile, Rgb};
use prophead::fsm::StateId;

/// Motion reads true for exactly one tick.
fn pulse_motion(h: &mut Harness) {
    h.hw.motion = true;
    h.tick();
    h.hw.motion = false;
}

// ── Motion cycle ──────────────────────────────────────────────

#[test]
fn boot_drives_home_colour_and_volume() {
    let h = Harness::goblin();
    assert_eq!(h.state(), StateId::Idle);
    assert_eq!(
        h.hw.calls,
        vec![
            (0, HwCall::Angle(90)),
            (0, HwCall::Eyes(Rgb::BLUE)),
            (0, HwCall::Volume(27)),
        ]
    );
}

#[test]
fn motion_cycle_turns_holds_and_returns() {
    let mut h = Harness::goblin();

    pulse_motion(&mut h);
    assert_eq!(h.state(), StateId::Active);
    assert_eq!(h.hw.eyes(), Some(Rgb::RED));
    assert_eq!(h.hw.plays(), vec![1]);

    // One degree per 50 ms from 90 to 150.
    h.run_through(2_990);
    assert_eq!(h.hw.angle(), Some(149));
    h.run_through(3_000);
    assert_eq!(h.hw.angle(), Some(150));

    h.run_through(14_990);
    assert_eq!(h.state(), StateId::Active);
    assert_eq!(h.hw.angle(), Some(150));

    h.run_through(15_000);
    assert_eq!(h.state(), StateId::Returning);
    assert_eq!(h.hw.eyes(), Some(Rgb::RED), "eyes stay active while returning");

    h.run_through(17_990);
    assert_eq!(h.state(), StateId::Returning);
    assert_eq!(h.hw.angle(), Some(91));

    h.run_through(18_000);
    assert_eq!(h.state(), StateId::Idle);
    assert_eq!(h.hw.angle(), Some(90));
    assert_eq!(h.hw.eyes(), Some(Rgb::BLUE));

    assert_eq!(
        h.transitions(),
        vec![
            (StateId::Idle, StateId::Active),
            (StateId::Active, StateId::Returning),
            (StateId::Returning, StateId::Idle),
        ]
    );
    assert_eq!(h.link.published.len(), 3, "one status per transition");
    let status = h.last_status().unwrap();
    assert_eq!(status["state"], "idle");
    assert_eq!(status["position"], 90);
    assert_eq!(h.hw.plays(), vec![1], "sound plays once per wake-up");
}

#[test]
fn head_never_moves_more_than_one_degree_per_write() {
    let mut h = Harness::goblin();
    pulse_motion(&mut h);
    h.run_through(20_000);
    let angles: Vec<u8> = h
        .hw
        .calls
        .iter()
        .filter_map(|(_, c)| match c {
            HwCall::Angle(a) => Some(*a),
            _ => None,
        })
        .collect();
    for pair in angles.windows(2) {
        assert_eq!(pair[0].abs_diff(pair[1]), 1, "{:?}", pair);
    }
    assert!(angles.iter().all(|a| (30..=150).contains(a)));
}

#[test]
fn held_motion_keeps_the_head_active() {
    let mut h = Harness::goblin();
    h.hw.motion = true;
    h.run_through(40_000);
    assert_eq!(h.state(), StateId::Active);
    h.hw.motion = false;
    h.run_through(40_000 + 14_990);
    assert_eq!(h.state(), StateId::Active);
    h.run_through(40_000 + 15_000);
    assert_eq!(h.state(), StateId::Returning);
}

#[test]
fn motion_while_returning_reactivates_without_sound() {
    let mut h = Harness::goblin();
    pulse_motion(&mut h);
    h.run_through(15_990);
    assert_eq!(h.state(), StateId::Returning);

    pulse_motion(&mut h);
    assert_eq!(h.state(), StateId::Active);
    assert_eq!(h.hw.plays(), vec![1]);

    // The quiet timer restarted at the re-trigger.
    h.run_through(16_000 + 14_990);
    assert_eq!(h.state(), StateId::Active);
    h.run_through(16_000 + 15_000);
    assert_eq!(h.state(), StateId::Returning);
}

#[test]
fn skull_turns_left() {
    let mut h = Harness::with_config(BehaviorConfig::for_profile(HeadProfile::Skull));
    assert_eq!(h.hw.eyes(), Some(Rgb::GREEN));
    pulse_motion(&mut h);
    h.run_through(3_000);
    assert_eq!(h.hw.angle(), Some(30));
}

#[test]
fn auto_motion_off_ignores_the_sensor() {
    let mut h = Harness::goblin();
    h.send("cmnd/goblinhead/AutoMotion", "off");
    h.tick();
    h.hw.motion = true;
    h.run_through(5_000);
    assert_eq!(h.state(), StateId::Idle);
    assert!(h.hw.plays().is_empty());
}

#[test]
fn auto_motion_off_while_active_winds_down() {
    let mut h = Harness::goblin();
    pulse_motion(&mut h);
    h.run_through(1_000);
    h.send("cmnd/goblinhead/AutoMotion", "off");
    h.tick();
    h.tick();
    assert_eq!(h.state(), StateId::Returning);
}

#[test]
fn failed_sensor_reads_count_as_no_motion() {
    let mut h = Harness::goblin();
    h.hw.sensor_fails = true;
    h.hw.motion = true;
    h.run_through(2_000);
    assert_eq!(h.state(), StateId::Idle);
    let faults = h
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::SensorFault(_)))
        .count();
    assert_eq!(faults, 1, "reported once, not every tick");

    h.hw.sensor_fails = false;
    h.tick();
    assert_eq!(h.state(), StateId::Active);
}

// ── Blink ─────────────────────────────────────────────────────

#[test]
fn idle_blinks_at_random_intervals() {
    let mut h = Harness::goblin();
    h.run_through(120_000);

    let writes = h.hw.eye_writes();
    assert_eq!(writes[0], (0, Rgb::BLUE));
    let mut last_open = 0;
    let mut blinks = 0;
    for pair in writes[1..].chunks_exact(2) {
        let (t_off, off) = pair[0];
        let (t_on, on) = pair[1];
        assert_eq!(off, Rgb::OFF);
        assert_eq!(on, Rgb::BLUE);
        let wait = t_off - last_open;
        assert!((3_000..=10_000 + TICK_MS).contains(&wait), "wait {wait}");
        assert_eq!(t_on - t_off, 150, "pulse length");
        last_open = t_on;
        blinks += 1;
    }
    assert!(blinks >= 11, "only {blinks} blinks in two minutes");
}

#[test]
fn no_blinks_while_active() {
    let mut h = Harness::goblin();
    h.hw.motion = true;
    h.run_through(30_000);
    assert!(h.hw.eye_writes().iter().all(|(_, c)| *c != Rgb::OFF));
}

#[test]
fn auto_blink_off_stops_blinking() {
    let mut h = Harness::goblin();
    h.send("cmnd/goblinhead/AutoBlink", "0");
    h.run_through(60_000);
    assert_eq!(h.hw.eye_writes(), vec![(0, Rgb::BLUE)]);
}

// ── Manual position ───────────────────────────────────────────

#[test]
fn position_override_suspends_tracking_until_retrigger() {
    let mut h = Harness::goblin();
    pulse_motion(&mut h);
    h.run_through(990);
    assert_eq!(h.hw.angle(), Some(109));

    h.send("cmnd/goblinhead/Position", "60");
    h.run_through(4_000);
    assert_eq!(h.state(), StateId::Active);
    assert_eq!(h.hw.angle(), Some(60));
    assert_eq!(h.last_status().unwrap()["position_override"], 60);

    h.run_through(5_990);
    assert_eq!(h.hw.angle(), Some(60));

    // A fresh detection takes the head back.
    pulse_motion(&mut h);
    assert_eq!(h.app.context().state.position_override, None);
    h.run_through(10_600);
    assert_eq!(h.hw.angle(), Some(150));
}

#[test]
fn resume_returns_to_tracking() {
    let mut h = Harness::goblin();
    pulse_motion(&mut h);
    h.send("cmnd/goblinhead/Position", "100");
    h.run_through(1_000);
    h.send("cmnd/goblinhead/Resume", "");
    h.run_through(5_000);
    assert_eq!(h.hw.angle(), Some(150));
}

#[test]
fn override_holds_through_reset() {
    let mut h = Harness::goblin();
    pulse_motion(&mut h);
    h.send("cmnd/goblinhead/Position", "100");
    h.run_through(15_000);
    assert_eq!(h.state(), StateId::Returning);
    // Settled already: only the hold time remains.
    h.run_through(16_990);
    assert_eq!(h.state(), StateId::Returning);
    h.run_through(17_000);
    assert_eq!(h.state(), StateId::Idle);
    assert_eq!(h.hw.angle(), Some(100));
    assert_eq!(h.hw.eyes(), Some(Rgb::BLUE));

    h.send("cmnd/goblinhead/Resume", "");
    h.run_through(20_000);
    assert_eq!(h.hw.angle(), Some(90));
}
