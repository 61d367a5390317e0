//! Remote commands arriving over the message-queue link.
//!
//! Topic layout follows the `cmnd/<device>/<Command>` convention:
//!
//! ```text
//!   cmnd/goblinhead/Volume      "18"
//!   cmnd/goblinhead/IdleColor   "#ff8000"
//!   cmnd/goblinhead             "status"        (bare topic: key in payload)
//!   cmnd/goblinhead             "volume 18"     (bare topic: key and value)
//! ```
//!
//! Keys are case-insensitive.  Anything that does not decode cleanly is
//! dropped by [`decode`] and never reaches [`apply`].

use crate::config::{MAX_VOLUME, Rgb, SERVO_MAX_DEGREES};
use crate::fsm::StateId;
use crate::fsm::context::FsmContext;

/// Explicit value or flip for a boolean toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
    Flip,
}

impl Toggle {
    fn parse(value: &str) -> Option<Self> {
        const ON: [&str; 3] = ["on", "true", "1"];
        const OFF: [&str; 3] = ["off", "false", "0"];
        let v = value.trim();
        if v.is_empty() || v.eq_ignore_ascii_case("toggle") {
            Some(Self::Flip)
        } else if ON.iter().any(|s| s.eq_ignore_ascii_case(v)) {
            Some(Self::On)
        } else if OFF.iter().any(|s| s.eq_ignore_ascii_case(v)) {
            Some(Self::Off)
        } else {
            None
        }
    }

    pub fn resolve(self, current: bool) -> bool {
        match self {
            Self::On => true,
            Self::Off => false,
            Self::Flip => !current,
        }
    }
}

/// A decoded command.  Lives for the tick that applies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    SetIdleColour(Rgb),
    SetActiveColour(Rgb),
    /// Manual head position, already clamped to servo travel.
    SetPosition(u8),
    Resume,
    /// Volume, already clamped to the player's range.
    SetVolume(u8),
    SetAutoMotion(Toggle),
    SetAutoBlink(Toggle),
    Play(u16),
    QueryStatus,
}

impl RemoteCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetIdleColour(_) => "IdleColor",
            Self::SetActiveColour(_) => "ActiveColor",
            Self::SetPosition(_) => "Position",
            Self::Resume => "Resume",
            Self::SetVolume(_) => "Volume",
            Self::SetAutoMotion(_) => "AutoMotion",
            Self::SetAutoBlink(_) => "AutoBlink",
            Self::Play(_) => "Play",
            Self::QueryStatus => "Status",
        }
    }

    /// Whether applying this command can change configuration or state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::QueryStatus)
    }
}

// ───────────────────────────────────────────────────────────────
// Decoding
// ───────────────────────────────────────────────────────────────

/// Decode an inbound `(topic, payload)` pair received on `sub_topic`.
pub fn decode(sub_topic: &str, topic: &str, payload: &str) -> Option<RemoteCommand> {
    let rest = topic.strip_prefix(sub_topic)?;
    let (key, value) = if rest.is_empty() {
        let payload = payload.trim();
        payload
            .split_once(char::is_whitespace)
            .unwrap_or((payload, ""))
    } else {
        let key = rest.strip_prefix('/')?;
        if key.is_empty() || key.contains('/') {
            return None;
        }
        (key, payload)
    };
    decode_key(key, value.trim())
}

fn decode_key(key: &str, value: &str) -> Option<RemoteCommand> {
    let is = |name: &str| key.eq_ignore_ascii_case(name);

    if is("idlecolor") || is("idlecolour") {
        parse_colour(value).map(RemoteCommand::SetIdleColour)
    } else if is("activecolor") || is("activecolour") {
        parse_colour(value).map(RemoteCommand::SetActiveColour)
    } else if is("position") {
        let deg = value.parse::<i64>().ok()?;
        Some(RemoteCommand::SetPosition(
            deg.clamp(0, SERVO_MAX_DEGREES as i64) as u8,
        ))
    } else if is("resume") {
        Some(RemoteCommand::Resume)
    } else if is("volume") {
        let vol = value.parse::<i64>().ok()?;
        Some(RemoteCommand::SetVolume(vol.clamp(0, MAX_VOLUME as i64) as u8))
    } else if is("automotion") {
        Toggle::parse(value).map(RemoteCommand::SetAutoMotion)
    } else if is("autoblink") {
        Toggle::parse(value).map(RemoteCommand::SetAutoBlink)
    } else if is("play") {
        if value.is_empty() {
            return Some(RemoteCommand::Play(1));
        }
        match value.parse::<u16>().ok()? {
            0 => None,
            track => Some(RemoteCommand::Play(track)),
        }
    } else if is("status") {
        Some(RemoteCommand::QueryStatus)
    } else {
        None
    }
}

/// Accepts a colour name, `r,g,b`, `#rrggbb` or a JSON array `[r,g,b]`.
/// Channel values outside 0–255 are clamped.
pub fn parse_colour(value: &str) -> Option<Rgb> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return Some(Rgb(channel(0)?, channel(2)?, channel(4)?));
    }
    if value.starts_with('[') {
        let [r, g, b] = serde_json::from_str::<[i64; 3]>(value).ok()?;
        return Some(Rgb(clamp_channel(r), clamp_channel(g), clamp_channel(b)));
    }
    if value.contains(',') {
        let mut parts = value.split(',').map(|p| p.trim().parse::<i64>());
        let (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        return Some(Rgb(clamp_channel(r), clamp_channel(g), clamp_channel(b)));
    }
    Rgb::from_name(value)
}

fn clamp_channel(v: i64) -> u8 {
    v.clamp(0, 255) as u8
}

// ───────────────────────────────────────────────────────────────
// Applying
// ───────────────────────────────────────────────────────────────

/// Apply a decoded command to the live configuration and behaviour state.
/// `state` is the FSM state at the time of application.
pub fn apply(cmd: RemoteCommand, ctx: &mut FsmContext, state: StateId) {
    let now = ctx.now_ms;
    let fade_ms = ctx.config.colour_fade_ms;
    match cmd {
        RemoteCommand::SetIdleColour(c) => {
            ctx.config.idle_colour = c;
            if state == StateId::Idle {
                ctx.state.eyes.fade_to(c, now, fade_ms);
            }
        }
        RemoteCommand::SetActiveColour(c) => {
            ctx.config.active_colour = c;
            if state != StateId::Idle {
                ctx.state.eyes.fade_to(c, now, fade_ms);
            }
        }
        RemoteCommand::SetPosition(deg) => {
            ctx.state.position_override = Some(deg);
            ctx.state.head.aim(deg, now);
        }
        RemoteCommand::Resume => {
            ctx.state.position_override = None;
            let target = if state == StateId::Active {
                ctx.config.motion_target()
            } else {
                ctx.config.home_position
            };
            ctx.aim_head(target);
        }
        RemoteCommand::SetVolume(v) => {
            ctx.config.audio_volume = v;
            ctx.cues.volume = Some(v);
        }
        RemoteCommand::SetAutoMotion(t) => {
            ctx.config.auto_motion = t.resolve(ctx.config.auto_motion);
        }
        RemoteCommand::SetAutoBlink(t) => {
            ctx.config.auto_blink = t.resolve(ctx.config.auto_blink);
            if !ctx.config.auto_blink {
                ctx.state.blink.disarm();
            }
        }
        RemoteCommand::Play(track) => ctx.cues.play = Some(track),
        RemoteCommand::QueryStatus => {}
    }
}
