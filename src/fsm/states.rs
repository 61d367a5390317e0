//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers: no closures, no
//! dynamic dispatch, no heap.
//!
//! ```text
//!  IDLE ──[motion && auto_motion]──▶ ACTIVE
//!    ▲                                │  ▲
//!    │                 [quiet for     │  │ [motion && auto_motion]
//!    │                  motion_reset] │  │
//!    │                                ▼  │
//!    └──[home && head_reset held]── RETURNING
//! ```
//!
//! The blink cycle runs only inside IDLE.  Head stepping happens in the
//! main loop before the FSM tick, so every handler sees the latest angle.

use super::context::FsmContext;
use super::{StateDescriptor, StateId};
use crate::fsm::blink::BlinkEdge;
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: Some(idle_exit),
            on_update: idle_update,
        },
        // Index 1: Active
        StateDescriptor {
            id: StateId::Active,
            name: "Active",
            on_enter: Some(active_enter),
            on_exit: None,
            on_update: active_update,
        },
        // Index 2: Returning
        StateDescriptor {
            id: StateId::Returning,
            name: "Returning",
            on_enter: Some(returning_enter),
            on_exit: None,
            on_update: returning_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state: head home, idle colour, blinking
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.state.motion_active = false;
    ctx.state.eyes.set(ctx.config.idle_colour);
    ctx.aim_head(ctx.config.home_position);
    if ctx.config.auto_blink {
        arm_blink(ctx);
    }
    info!("IDLE: head at {}°, waiting for motion", ctx.state.head.angle());
}

fn idle_exit(ctx: &mut FsmContext) {
    ctx.state.blink.disarm();
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.motion && ctx.config.auto_motion {
        ctx.cues.play = Some(ctx.config.motion_track);
        return Some(StateId::Active);
    }

    // Follow the toggle without waiting for a state change.
    match (ctx.config.auto_blink, ctx.state.blink.is_armed()) {
        (true, false) => arm_blink(ctx),
        (false, true) => {
            ctx.state.blink.disarm();
            debug!("BLINK: disabled");
        }
        _ => {}
    }

    let may_close = !ctx.state.eyes.is_fading(ctx.now_ms);
    let edge = ctx.state.blink.tick(
        ctx.now_ms,
        ctx.config.blink_min_ms,
        ctx.config.blink_max_ms,
        may_close,
    );
    if let Some(BlinkEdge::Reopened { next_interval_ms }) = edge {
        debug!("BLINK: next in {next_interval_ms} ms");
    }

    None
}

fn arm_blink(ctx: &mut FsmContext) {
    ctx.state
        .blink
        .arm(ctx.now_ms, ctx.config.blink_min_ms, ctx.config.blink_max_ms);
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE state: active colour, head swinging to the configured extreme
// ═══════════════════════════════════════════════════════════════════════════

fn active_enter(ctx: &mut FsmContext) {
    ctx.state.motion_active = true;
    ctx.state.last_motion_ms = ctx.now_ms;
    ctx.state.eyes.set(ctx.config.active_colour);
    ctx.state.position_override = None;
    ctx.aim_head(ctx.config.motion_target());
    info!(
        "ACTIVE: motion detected, turning to {}°",
        ctx.config.motion_target()
    );
}

fn active_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.config.auto_motion {
        info!("ACTIVE: auto motion disabled, winding down");
        return Some(StateId::Returning);
    }

    if ctx.motion {
        ctx.state.last_motion_ms = ctx.now_ms;
        // A fresh detection takes the head back from a manual position.
        if ctx.motion_rising && ctx.state.position_override.take().is_some() {
            ctx.aim_head(ctx.config.motion_target());
            debug!("ACTIVE: motion re-trigger cleared position override");
        }
    }

    if ctx.ms_since_motion() >= ctx.config.motion_reset_ms {
        info!(
            "ACTIVE: no motion for {} ms, returning home",
            ctx.ms_since_motion()
        );
        return Some(StateId::Returning);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RETURNING state: head travelling home, still active colour
// ═══════════════════════════════════════════════════════════════════════════

fn returning_enter(ctx: &mut FsmContext) {
    ctx.aim_head(ctx.config.home_position);
    info!(
        "RETURNING: head {}° -> {}°, hold {} ms",
        ctx.state.head.angle(),
        ctx.config.home_position,
        ctx.config.head_reset_ms
    );
}

fn returning_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.motion && ctx.config.auto_motion {
        info!("RETURNING: motion re-trigger");
        return Some(StateId::Active);
    }

    let settled = ctx.state.position_override.is_some() || ctx.state.head.at_target();
    if settled && ctx.ms_in_state() >= ctx.config.head_reset_ms {
        return Some(StateId::Idle);
    }

    None
}
