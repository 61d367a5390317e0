//! Remote commands through the inbound queue: decode, apply, acknowledge.

use super::mock_hw::Harness;

use prophead::app::events::AppEvent;
use prophead::config::Rgb;
use prophead::events::InboundMessage;
use prophead::fsm::StateId;

fn applied(h: &Harness) -> Vec<&'static str> {
    h.sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::CommandApplied(name) => Some(*name),
            _ => None,
        })
        .collect()
}

fn ignored(h: &Harness) -> usize {
    h.sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::CommandIgnored))
        .count()
}

#[test]
fn volume_is_clamped_sent_and_acknowledged() {
    let mut h = Harness::goblin();
    h.send("cmnd/goblinhead/Volume", "99");
    h.tick();
    assert_eq!(h.hw.volumes(), vec![27, 30]);
    assert_eq!(applied(&h), vec!["Volume"]);
    assert_eq!(h.link.published.len(), 1);
    assert_eq!(h.link.published[0].0, "stat/goblinhead");
    assert_eq!(h.last_status().unwrap()["volume"], 30);
}

#[test]
fn bare_topic_carries_key_and_value() {
    let mut h = Harness::goblin();
    h.send("cmnd/goblinhead", "volume 12");
    h.tick();
    assert_eq!(h.app.config().audio_volume, 12);
}

#[test]
fn play_defaults_to_first_track_and_rejects_zero() {
    let mut h = Harness::goblin();
    h.send("cmnd/goblinhead/Play", "");
    h.send("cmnd/goblinhead/Play", "0");
    h.send("cmnd/goblinhead/Play", "7");
    h.tick();
    h.tick();
    assert_eq!(h.hw.plays(), vec![7], "one play per tick, the last cue wins");
    assert_eq!(ignored(&h), 1);

    h.send("cmnd/goblinhead/Play", "");
    h.tick();
    assert_eq!(h.hw.plays(), vec![7, 1]);
    assert_eq!(h.state(), StateId::Idle, "playing does not wake the head");
}

#[test]
fn status_query_publishes_without_mutating() {
    let mut h = Harness::goblin();
    h.send("cmnd/goblinhead/Status", "");
    h.tick();
    assert!(applied(&h).is_empty());
    assert_eq!(h.link.published.len(), 1);
    let status = h.last_status().unwrap();
    assert_eq!(status["state"], "idle");
    assert_eq!(status["colour"], serde_json::json!([0, 0, 255]));
}

#[test]
fn unknown_or_malformed_messages_are_ignored() {
    let mut h = Harness::goblin();
    h.send("cmnd/goblinhead/Dance", "now");
    h.send("cmnd/goblinhead/Volume", "loud");
    h.send("cmnd/goblinhead/IdleColor", "#12345");
    h.send("cmnd/otherhead/Volume", "5");
    h.send("cmnd/goblinhead/Upgrade", "http://10.0.0.2/fw.bin");
    h.tick();
    assert_eq!(ignored(&h), 5);
    assert!(h.link.published.is_empty());
    assert_eq!(h.app.config().audio_volume, 27);
}

#[test]
fn idle_colour_fades_when_on_show() {
    let mut h = Harness::goblin();
    h.run_through(90);
    h.send("cmnd/goblinhead/IdleColor", "#00ff00");
    h.run_through(700);

    assert_eq!(h.last_status().unwrap()["colour"], serde_json::json!([0, 255, 0]));
    let writes: Vec<_> = h.hw.eye_writes().into_iter().filter(|(t, _)| *t > 0).collect();
    assert!(writes.len() > 10, "fade should step through colours");
    assert_eq!(*writes.last().unwrap(), (600, Rgb::GREEN));
    for (_, c) in &writes[..writes.len() - 1] {
        assert_ne!(*c, Rgb::BLUE);
        assert_ne!(*c, Rgb::GREEN);
    }
}

#[test]
fn active_colour_waits_for_the_next_wake() {
    let mut h = Harness::goblin();
    h.send("cmnd/goblinhead/ActiveColor", "255,128,0");
    h.tick();
    assert_eq!(h.hw.eyes(), Some(Rgb::BLUE));
    assert_eq!(h.app.config().active_colour, Rgb::ORANGE);

    h.hw.motion = true;
    h.tick();
    assert_eq!(h.hw.eyes(), Some(Rgb::ORANGE));
}

#[test]
fn active_colour_fades_while_active() {
    let mut h = Harness::goblin();
    h.hw.motion = true;
    h.tick();
    h.send("cmnd/goblinhead/ActiveColor", "[0, 0, 300]");
    h.run_through(1_000);
    assert_eq!(h.hw.eyes(), Some(Rgb::BLUE));
    assert!(h.hw.eye_writes().len() > 5);
}

#[test]
fn toggles_flip_without_a_value() {
    let mut h = Harness::goblin();
    h.send("cmnd/goblinhead/AutoBlink", "");
    h.tick();
    assert!(!h.app.config().auto_blink);
    h.send("cmnd/goblinhead/AutoBlink", "toggle");
    h.tick();
    assert!(h.app.config().auto_blink);
}

#[test]
fn queue_overflow_is_reported() {
    let mut h = Harness::goblin();
    let mut accepted = 0;
    for v in 0..10u8 {
        let msg = InboundMessage::new("cmnd/goblinhead/Volume", v.to_string().as_bytes()).unwrap();
        if h.inbound.push(msg) {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 8);
    h.tick();
    assert_eq!(applied(&h).len(), 8);
    assert!(
        h.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::InboundDropped(2)))
    );
    assert_eq!(h.app.config().audio_volume, 7);
}

#[test]
fn commands_apply_while_the_link_is_down() {
    let mut h = Harness::goblin();
    h.link.connected = false;
    h.send("cmnd/goblinhead/Volume", "5");
    h.tick();
    assert_eq!(h.app.config().audio_volume, 5);
    assert!(h.sink.events.iter().any(|e| matches!(e, AppEvent::PublishFailed(_))));
}

#[test]
fn position_is_clamped_to_servo_travel() {
    let mut h = Harness::goblin();
    h.send("cmnd/goblinhead/Position", "400");
    h.tick();
    assert_eq!(h.app.context().state.position_override, Some(180));
    assert_eq!(h.app.context().state.head.target(), 180);
}
