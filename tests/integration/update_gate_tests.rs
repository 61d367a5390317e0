//! Firmware update requests against the time-boxed window.

use super::mock_hw::Harness;

use prophead::app::events::AppEvent;
use prophead::config::{BehaviorConfig, HeadProfile};
use prophead::update_gate::WindowPhase;

/// Raise a request just before the tick at `t_ms` and run that tick.
fn request_at(h: &mut Harness, t_ms: u32) {
    h.run_through(t_ms - 10);
    h.updates.pending = true;
    h.tick();
}

#[test]
fn requests_honoured_only_inside_the_window() {
    let mut h = Harness::goblin();

    request_at(&mut h, 1_000);
    assert_eq!((h.updates.accepted, h.updates.rejected), (0, 1));

    request_at(&mut h, 5_000);
    assert_eq!((h.updates.accepted, h.updates.rejected), (1, 1));

    request_at(&mut h, 25_000);
    assert_eq!((h.updates.accepted, h.updates.rejected), (1, 2));
}

#[test]
fn window_opens_and_closes_once() {
    let mut h = Harness::goblin();
    h.run_through(60_000);
    let phases: Vec<(WindowPhase, usize)> = h
        .sink
        .events
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match e {
            AppEvent::UpdateWindow(p) => Some((*p, i)),
            _ => None,
        })
        .collect();
    assert_eq!(phases.len(), 2);
    assert_eq!(phases[0].0, WindowPhase::Open);
    assert_eq!(phases[1].0, WindowPhase::Closed);
    assert_eq!(h.app.update_window(), WindowPhase::Closed);
}

#[test]
fn window_edges_are_half_open() {
    let mut h = Harness::goblin();
    request_at(&mut h, 2_490);
    assert_eq!(h.updates.rejected, 1);
    request_at(&mut h, 2_500);
    assert_eq!(h.updates.accepted, 1);
    request_at(&mut h, 22_490);
    assert_eq!(h.updates.accepted, 2);
    request_at(&mut h, 22_500);
    assert_eq!(h.updates.rejected, 2);
}

#[test]
fn disabled_updates_are_always_rejected() {
    let config = BehaviorConfig {
        ota_enabled: false,
        ..BehaviorConfig::for_profile(HeadProfile::Goblin)
    };
    let mut h = Harness::with_config(config);
    request_at(&mut h, 5_000);
    assert_eq!((h.updates.accepted, h.updates.rejected), (0, 1));
    assert_eq!(h.app.update_window(), WindowPhase::Closed);
}

#[test]
fn update_handling_does_not_stall_behaviour() {
    let mut h = Harness::goblin();
    h.hw.motion = true;
    request_at(&mut h, 5_000);
    assert_eq!(h.updates.accepted, 1);
    assert_eq!(h.state(), prophead::fsm::StateId::Active);
    assert_eq!(h.hw.angle(), Some(150));
}
