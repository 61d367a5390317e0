//! Fuzz target: `commands::decode` and `commands::apply`
//!
//! Splits the input into a topic suffix and a payload, decodes both the
//! keyed-topic and bare-topic forms, and applies whatever decodes to a
//! fresh context.  Nothing may panic and every applied value must land
//! in range.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use prophead::app::commands;
use prophead::config::{BehaviorConfig, MAX_VOLUME, SERVO_MAX_DEGREES};
use prophead::fsm::StateId;
use prophead::fsm::context::FsmContext;

const SUB: &str = "cmnd/goblinhead";

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let (suffix, payload) = text.split_once('\n').unwrap_or((text, ""));
    let topic = format!("{SUB}/{suffix}");

    let mut ctx = FsmContext::new(BehaviorConfig::default(), 0);
    for (cmd, state) in [
        (commands::decode(SUB, &topic, payload), StateId::Idle),
        (commands::decode(SUB, SUB, text), StateId::Active),
    ] {
        if let Some(cmd) = cmd {
            commands::apply(cmd, &mut ctx, state);
        }
    }

    assert!(ctx.config.audio_volume <= MAX_VOLUME);
    assert!(ctx.state.head.target() <= SERVO_MAX_DEGREES);
    assert!(ctx.cues.play != Some(0));
});
