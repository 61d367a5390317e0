//! Idle eye blink cycle.
//!
//! Orthogonal to the head state: armed while the head is idle and
//! `auto_blink` is on.  Each cycle waits a pseudo-random interval in
//! `[blink_min, blink_max]`, closes the eyes for [`BLINK_PULSE_MS`], then
//! reopens them and draws the next interval.
//!
//! ```text
//!  Disarmed ──arm──▶ Open{interval} ──elapsed──▶ Closed ──pulse──▶ Open{new interval}
//!      ▲                   │                        │
//!      └──────disarm───────┴────────────────────────┘
//! ```

/// How long the eyes stay dark during a blink.
pub const BLINK_PULSE_MS: u32 = 150;

/// Xorshift32 generator.  Blink timing only needs to look irregular.
#[derive(Debug, Clone, Copy)]
pub struct Xorshift32(u32);

impl Xorshift32 {
    pub fn new(seed: u32) -> Self {
        // Zero is a fixed point of xorshift.
        Self(if seed == 0 { 0x9E37_79B9 } else { seed })
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Uniform-ish draw in `[lo, hi]` (inclusive).
    pub fn range(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo) as u64 + 1;
        lo + (self.next_u32() as u64 % span) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkPhase {
    Disarmed,
    Open { since_ms: u32, interval_ms: u32 },
    Closed { since_ms: u32 },
}

/// Edges reported by [`BlinkCycle::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkEdge {
    Closed,
    Reopened { next_interval_ms: u32 },
}

#[derive(Debug, Clone)]
pub struct BlinkCycle {
    phase: BlinkPhase,
    rng: Xorshift32,
    count: u32,
}

impl BlinkCycle {
    pub fn new(seed: u32) -> Self {
        Self {
            phase: BlinkPhase::Disarmed,
            rng: Xorshift32::new(seed),
            count: 0,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.phase != BlinkPhase::Disarmed
    }

    pub fn eyes_closed(&self) -> bool {
        matches!(self.phase, BlinkPhase::Closed { .. })
    }

    /// Completed blinks since boot.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Start a fresh wait.  Re-arming an armed cycle redraws the interval.
    pub fn arm(&mut self, now_ms: u32, min_ms: u32, max_ms: u32) {
        self.phase = BlinkPhase::Open {
            since_ms: now_ms,
            interval_ms: self.rng.range(min_ms, max_ms),
        };
    }

    /// Drop any pending or in-progress blink.  Eyes read as open afterwards.
    pub fn disarm(&mut self) {
        self.phase = BlinkPhase::Disarmed;
    }

    /// Advance the cycle.  A due blink is held back while `may_close` is
    /// false (eyes mid-fade) and fires on the first tick it is allowed.
    pub fn tick(&mut self, now_ms: u32, min_ms: u32, max_ms: u32, may_close: bool) -> Option<BlinkEdge> {
        match self.phase {
            BlinkPhase::Disarmed => None,
            BlinkPhase::Open { since_ms, interval_ms } => {
                if may_close && now_ms.wrapping_sub(since_ms) >= interval_ms {
                    self.phase = BlinkPhase::Closed { since_ms: now_ms };
                    Some(BlinkEdge::Closed)
                } else {
                    None
                }
            }
            BlinkPhase::Closed { since_ms } => {
                if now_ms.wrapping_sub(since_ms) >= BLINK_PULSE_MS {
                    self.count = self.count.wrapping_add(1);
                    let interval_ms = self.rng.range(min_ms, max_ms);
                    self.phase = BlinkPhase::Open {
                        since_ms: now_ms,
                        interval_ms,
                    };
                    Some(BlinkEdge::Reopened {
                        next_interval_ms: interval_ms,
                    })
                } else {
                    None
                }
            }
        }
    }
}
