//! Logical eye colour with an optional crossfade.
//!
//! State-driven colour changes (idle/active) are instant.  Remote colour
//! overrides that hit the colour currently on show fade over
//! `colour_fade_ms`; blinking is held off until the fade completes.

use crate::config::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fade {
    from: Rgb,
    started_ms: u32,
    duration_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eyes {
    colour: Rgb,
    fade: Option<Fade>,
}

impl Eyes {
    pub fn new(colour: Rgb) -> Self {
        Self { colour, fade: None }
    }

    /// The colour the eyes are (or are fading toward).
    pub fn colour(&self) -> Rgb {
        self.colour
    }

    /// Switch instantly, cancelling any fade.
    pub fn set(&mut self, colour: Rgb) {
        self.colour = colour;
        self.fade = None;
    }

    /// Fade from whatever is on show now to `colour`.
    pub fn fade_to(&mut self, colour: Rgb, now_ms: u32, duration_ms: u32) {
        let from = self.shown(now_ms);
        if duration_ms == 0 || from == colour {
            self.set(colour);
            return;
        }
        self.colour = colour;
        self.fade = Some(Fade {
            from,
            started_ms: now_ms,
            duration_ms,
        });
    }

    pub fn is_fading(&self, now_ms: u32) -> bool {
        self.fade
            .is_some_and(|f| now_ms.wrapping_sub(f.started_ms) < f.duration_ms)
    }

    /// Colour to drive onto the LEDs right now (ignoring blink).
    pub fn shown(&self, now_ms: u32) -> Rgb {
        match self.fade {
            Some(f) => {
                let elapsed = now_ms.wrapping_sub(f.started_ms);
                f.from.lerp(self.colour, elapsed, f.duration_ms)
            }
            None => self.colour,
        }
    }

    /// Forget a fade that has run its course.
    pub fn settle(&mut self, now_ms: u32) {
        if self.fade.is_some() && !self.is_fading(now_ms) {
            self.fade = None;
        }
    }
}
