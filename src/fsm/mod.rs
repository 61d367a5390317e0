//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  StateTable                                               │
//! │  ┌───────────┬───────────┬──────────┬───────────────────┐ │
//! │  │ StateId   │ on_enter  │ on_exit  │ on_update         │ │
//! │  ├───────────┼───────────┼──────────┼───────────────────┤ │
//! │  │ Idle      │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │ │
//! │  │ Active    │ fn(ctx)   │ -        │ fn(ctx)->Option<> │ │
//! │  │ Returning │ fn(ctx)   │ -        │ fn(ctx)->Option<> │ │
//! │  └───────────┴───────────┴──────────┴───────────────────┘ │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  All functions receive `&mut FsmContext`.
//!
//! Time is the wall-clock uptime carried in the context, not a tick
//! count: the loop period is allowed to jitter.

pub mod blink;
pub mod context;
pub mod eyes;
pub mod head;
pub mod states;

use context::FsmContext;
use log::info;
use serde::Serialize;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all behaviour states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Active = 1,
    Returning = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert a `u8` index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Idle` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Active,
            2 => Self::Returning,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Returning => "returning",
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array: no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]).  The mutable
/// [`FsmContext`] is owned by the caller and threaded through every
/// handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Transitions taken since start.
    transitions: u32,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        ctx.state.state_entered_ms = ctx.now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    ///
    /// Returns the new state when a transition happened.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> Option<StateId> {
        let next = (self.table[self.current].on_update)(ctx)?;
        self.transition(next, ctx);
        Some(next)
    }

    /// Force an immediate transition regardless of what `on_update` would
    /// return.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// Transitions taken since start.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        // Exit current state
        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        // Update pointer and timing
        self.current = next_idx;
        self.transitions = self.transitions.wrapping_add(1);
        ctx.state.state_entered_ms = ctx.now_ms;

        // Enter new state
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::context::FsmContext;
    use super::*;
    use crate::config::{BehaviorConfig, HeadProfile, Rgb};

    fn make_ctx() -> FsmContext {
        FsmContext::new(BehaviorConfig::for_profile(HeadProfile::Goblin), 0)
    }

    fn make_fsm() -> Fsm {
        Fsm::new(states::build_state_table(), StateId::Idle)
    }

    #[test]
    fn log_names_match_status_names() {
        for id in [StateId::Idle, StateId::Active, StateId::Returning] {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
    }

    /// One loop iteration the way the service runs it: observe, step, tick.
    fn run(fsm: &mut Fsm, ctx: &mut FsmContext, now: u32, motion: bool) {
        ctx.observe(now, motion);
        ctx.step_head();
        fsm.tick(ctx);
    }

    #[test]
    fn starts_in_idle() {
        let fsm = make_fsm();
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn start_runs_on_enter() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        assert_eq!(ctx.state.eyes.colour(), ctx.config.idle_colour);
        assert!(ctx.state.blink.is_armed());
    }

    #[test]
    fn idle_to_active_on_motion() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        run(&mut fsm, &mut ctx, 100, true);
        assert_eq!(fsm.current_state(), StateId::Active);
        assert!(ctx.state.motion_active);
        assert_eq!(ctx.state.eyes.colour(), Rgb::RED);
        assert_eq!(ctx.state.head.target(), ctx.config.max_rotate);
        assert_eq!(ctx.cues.play, Some(1));
        assert!(!ctx.state.blink.is_armed());
    }

    #[test]
    fn idle_ignores_motion_when_auto_motion_off() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.config.auto_motion = false;
        fsm.start(&mut ctx);

        run(&mut fsm, &mut ctx, 100, true);
        assert_eq!(fsm.current_state(), StateId::Idle);
        assert_eq!(ctx.cues.play, None);
    }

    #[test]
    fn motion_refreshes_activity_without_restarting_rotation() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        run(&mut fsm, &mut ctx, 0, true);
        ctx.cues.take();

        run(&mut fsm, &mut ctx, 10_000, true);
        assert_eq!(fsm.current_state(), StateId::Active);
        assert_eq!(ctx.state.last_motion_ms, 10_000);
        assert_eq!(ctx.cues.play, None);

        run(&mut fsm, &mut ctx, 24_999, false);
        assert_eq!(fsm.current_state(), StateId::Active);
        run(&mut fsm, &mut ctx, 25_000, false);
        assert_eq!(fsm.current_state(), StateId::Returning);
    }

    #[test]
    fn returning_holds_for_head_reset_even_when_home() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        // Trigger and immediately go quiet; the head never leaves home.
        run(&mut fsm, &mut ctx, 0, true);
        run(&mut fsm, &mut ctx, 15_000, false);
        assert_eq!(fsm.current_state(), StateId::Returning);
        ctx.state.head = head::Head::new(ctx.config.home_position);

        run(&mut fsm, &mut ctx, 16_999, false);
        assert_eq!(fsm.current_state(), StateId::Returning);
        assert_eq!(ctx.state.eyes.colour(), ctx.config.active_colour);
        run(&mut fsm, &mut ctx, 17_000, false);
        assert_eq!(fsm.current_state(), StateId::Idle);
        assert_eq!(ctx.state.eyes.colour(), ctx.config.idle_colour);
        assert!(!ctx.state.motion_active);
    }

    #[test]
    fn returning_retriggers_to_active() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        fsm.force_transition(StateId::Returning, &mut ctx);

        run(&mut fsm, &mut ctx, 50, true);
        assert_eq!(fsm.current_state(), StateId::Active);
        assert_eq!(ctx.state.head.target(), ctx.config.max_rotate);
        // Only the wake from idle plays the track.
        assert_eq!(ctx.cues.play, None);
    }

    #[test]
    fn disabling_auto_motion_winds_down() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        run(&mut fsm, &mut ctx, 0, true);
        ctx.config.auto_motion = false;

        run(&mut fsm, &mut ctx, 10, true);
        assert_eq!(fsm.current_state(), StateId::Returning);
        run(&mut fsm, &mut ctx, 20, true);
        assert_eq!(fsm.current_state(), StateId::Returning);
    }

    #[test]
    fn rising_edge_clears_override_in_active() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        run(&mut fsm, &mut ctx, 0, true);
        run(&mut fsm, &mut ctx, 10, false);

        ctx.state.position_override = Some(45);
        ctx.state.head.aim(45, 10);

        // Held motion is not a re-trigger.
        run(&mut fsm, &mut ctx, 20, false);
        assert_eq!(ctx.state.head.target(), 45);

        run(&mut fsm, &mut ctx, 30, true);
        assert_eq!(ctx.state.position_override, None);
        assert_eq!(ctx.state.head.target(), ctx.config.max_rotate);
    }

    #[test]
    fn blink_only_runs_in_idle() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.config.blink_min_ms = 100;
        ctx.config.blink_max_ms = 100;
        fsm.start(&mut ctx);

        run(&mut fsm, &mut ctx, 100, false);
        assert!(ctx.state.blink.eyes_closed());

        run(&mut fsm, &mut ctx, 110, true);
        assert_eq!(fsm.current_state(), StateId::Active);
        assert!(!ctx.state.blink.eyes_closed());
    }

    #[test]
    fn toggling_auto_blink_in_idle() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.config.auto_blink = false;
        run(&mut fsm, &mut ctx, 10, false);
        assert!(!ctx.state.blink.is_armed());

        ctx.config.auto_blink = true;
        run(&mut fsm, &mut ctx, 20, false);
        assert!(ctx.state.blink.is_armed());
    }

    #[test]
    fn force_transition_calls_enter_and_exit() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        ctx.now_ms = 500;
        fsm.force_transition(StateId::Active, &mut ctx);
        assert!(!ctx.state.blink.is_armed());
        assert_eq!(ctx.state.eyes.colour(), ctx.config.active_colour);
        assert_eq!(ctx.state.state_entered_ms, 500);
        assert_eq!(fsm.transitions(), 1);
    }

    #[test]
    fn state_id_from_index_roundtrip() {
        for i in 0..StateId::COUNT {
            let id = StateId::from_index(i);
            assert_eq!(id as usize, i);
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn state_id_from_invalid_index_returns_idle() {
        let id = StateId::from_index(99);
        assert_eq!(id, StateId::Idle);
    }
}
