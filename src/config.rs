//! System configuration parameters
//!
//! All tunable behaviour for the prop head.  Values are compiled in and
//! rebuilt from defaults on every boot; remote commands may override a
//! subset at runtime (in RAM only, lost on reboot).
//!
//! Two head builds ship from the same firmware: the goblin head (independent
//! left/right eye pins, MQTT enabled) and the skull head (shared eye pins).
//! The `skull` cargo feature selects the latter.

use log::warn;
use serde::{Deserialize, Serialize};

/// Physical travel limit of a standard hobby servo, in degrees.
pub const SERVO_MAX_DEGREES: u8 = 180;

/// Highest volume the audio module accepts.
pub const MAX_VOLUME: u8 = 30;

/// Longest colour fade accepted (one minute).
pub const MAX_COLOUR_FADE_MS: u32 = 60_000;

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// Eye colour, one byte of PWM duty per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const OFF: Rgb = Rgb(0, 0, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const GREEN: Rgb = Rgb(0, 255, 0);
    pub const BLUE: Rgb = Rgb(0, 0, 255);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    pub const ORANGE: Rgb = Rgb(255, 128, 0);
    pub const PURPLE: Rgb = Rgb(128, 0, 255);
    pub const CYAN: Rgb = Rgb(0, 255, 255);
    pub const MAGENTA: Rgb = Rgb(255, 0, 255);
    pub const PINK: Rgb = Rgb(255, 64, 128);

    /// Look up a colour by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        const NAMED: [(&str, Rgb); 12] = [
            ("red", Rgb::RED),
            ("green", Rgb::GREEN),
            ("blue", Rgb::BLUE),
            ("white", Rgb::WHITE),
            ("yellow", Rgb::YELLOW),
            ("orange", Rgb::ORANGE),
            ("purple", Rgb::PURPLE),
            ("cyan", Rgb::CYAN),
            ("magenta", Rgb::MAGENTA),
            ("pink", Rgb::PINK),
            ("off", Rgb::OFF),
            ("black", Rgb::OFF),
        ];
        let name = name.trim();
        NAMED
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, c)| c)
    }

    /// Linear blend from `self` to `to`; `num / den` is the progress (0..=1).
    pub fn lerp(self, to: Rgb, num: u32, den: u32) -> Rgb {
        if den == 0 || num >= den {
            return to;
        }
        let mix = |a: u8, b: u8| -> u8 {
            let a = i64::from(a);
            let b = i64::from(b);
            (a + (b - a) * i64::from(num) / i64::from(den)) as u8
        };
        Rgb(mix(self.0, to.0), mix(self.1, to.1), mix(self.2, to.2))
    }
}

// ---------------------------------------------------------------------------
// Enumerated options
// ---------------------------------------------------------------------------

/// Which extreme the head swings to when motion is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotateDirection {
    /// Swing toward `max_rotate` (`rotate_dir = 0` on the original builds).
    Right,
    /// Swing toward `min_rotate` (`rotate_dir = 1`).
    Left,
}

/// How the eye LEDs are wired to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EyeWiring {
    /// Both eyes share one set of R/G/B pins.
    Shared,
    /// Each eye has its own R/G/B pins (driven with the same colour).
    Independent,
}

/// Network bring-up mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WifiMode {
    SoftApOnly,
    StationOnly,
    Both,
}

/// Compiled head variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadProfile {
    Goblin,
    Skull,
}

impl HeadProfile {
    /// The profile selected at build time.
    #[cfg(not(feature = "skull"))]
    pub const ACTIVE: HeadProfile = HeadProfile::Goblin;
    #[cfg(feature = "skull")]
    pub const ACTIVE: HeadProfile = HeadProfile::Skull;
}

// ---------------------------------------------------------------------------
// BehaviorConfig
// ---------------------------------------------------------------------------

/// Core behaviour configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorConfig {
    // --- Head ---
    /// Position the head rests at on boot and returns to after activity.
    pub home_position: u8,
    /// Lower rotation bound while motion drives the head (degrees).
    pub min_rotate: u8,
    /// Upper rotation bound while motion drives the head (degrees).
    pub max_rotate: u8,
    pub rotate_dir: RotateDirection,
    /// Milliseconds between one-degree steps.
    pub step_delay_ms: u32,

    // --- Eyes ---
    pub idle_colour: Rgb,
    pub active_colour: Rgb,
    /// Crossfade length when a remote command recolours the eyes on show.
    pub colour_fade_ms: u32,
    pub eye_wiring: EyeWiring,

    // --- Timers ---
    /// Quiet time after the last motion before the head starts home.
    pub motion_reset_ms: u32,
    /// Minimum hold from the start of the return before the eyes go idle.
    pub head_reset_ms: u32,
    pub blink_min_ms: u32,
    pub blink_max_ms: u32,

    // --- Audio ---
    /// Volume 0-30.
    pub audio_volume: u8,
    /// Track played each time the head wakes up.
    pub motion_track: u16,

    // --- Toggles ---
    pub auto_motion: bool,
    pub auto_blink: bool,

    // --- Firmware update window ---
    pub ota_enabled: bool,
    /// Grace period after boot before update requests are honoured.
    pub ota_boot_window_ms: u32,
    /// How long the update window stays open once it opens.
    pub ota_window_ms: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self::for_profile(HeadProfile::ACTIVE)
    }
}

impl BehaviorConfig {
    /// Compiled defaults for a head variant.
    pub fn for_profile(profile: HeadProfile) -> Self {
        let goblin = Self {
            // Head
            home_position: 90, // midpoint of a 180° servo
            min_rotate: 30,
            max_rotate: 150,
            rotate_dir: RotateDirection::Right,
            step_delay_ms: 50,

            // Eyes
            idle_colour: Rgb::BLUE,
            active_colour: Rgb::RED,
            colour_fade_ms: 500,
            eye_wiring: EyeWiring::Independent,

            // Timers
            motion_reset_ms: 15_000,
            head_reset_ms: 2_000,
            blink_min_ms: 3_000,
            blink_max_ms: 10_000,

            // Audio
            audio_volume: 27,
            motion_track: 1,

            // Toggles
            auto_motion: true,
            auto_blink: true,

            // OTA
            ota_enabled: true,
            ota_boot_window_ms: 2_500,
            ota_window_ms: 20_000,
        };

        match profile {
            HeadProfile::Goblin => goblin,
            HeadProfile::Skull => Self {
                rotate_dir: RotateDirection::Left,
                idle_colour: Rgb::GREEN,
                eye_wiring: EyeWiring::Shared,
                head_reset_ms: 3_000,
                audio_volume: 25,
                ..goblin
            },
        }
    }

    /// Clamp every field into its valid range.  Nothing is rejected.
    pub fn sanitized(mut self) -> Self {
        if self.max_rotate > SERVO_MAX_DEGREES {
            warn!("config: max_rotate {} clamped to {}", self.max_rotate, SERVO_MAX_DEGREES);
            self.max_rotate = SERVO_MAX_DEGREES;
        }
        if self.min_rotate > SERVO_MAX_DEGREES {
            warn!("config: min_rotate {} clamped to {}", self.min_rotate, SERVO_MAX_DEGREES);
            self.min_rotate = SERVO_MAX_DEGREES;
        }
        if self.min_rotate > self.max_rotate {
            warn!("config: rotation bounds inverted, swapping");
            core::mem::swap(&mut self.min_rotate, &mut self.max_rotate);
        }
        if self.min_rotate == self.max_rotate {
            warn!("config: empty rotation range at {}°, widening", self.min_rotate);
            if self.max_rotate < SERVO_MAX_DEGREES {
                self.max_rotate += 1;
            } else {
                self.min_rotate -= 1;
            }
        }
        let home = self.home_position.clamp(self.min_rotate, self.max_rotate);
        if home != self.home_position {
            warn!("config: home position {} clamped to {}", self.home_position, home);
            self.home_position = home;
        }
        if self.blink_min_ms > self.blink_max_ms {
            warn!("config: blink bounds inverted, swapping");
            core::mem::swap(&mut self.blink_min_ms, &mut self.blink_max_ms);
        }
        if self.audio_volume > MAX_VOLUME {
            warn!("config: volume {} clamped to {}", self.audio_volume, MAX_VOLUME);
            self.audio_volume = MAX_VOLUME;
        }
        if self.colour_fade_ms > MAX_COLOUR_FADE_MS {
            warn!("config: colour fade {} ms clamped to {}", self.colour_fade_ms, MAX_COLOUR_FADE_MS);
            self.colour_fade_ms = MAX_COLOUR_FADE_MS;
        }
        self
    }

    /// Bound the head swings to when motion is detected.
    pub fn motion_target(&self) -> u8 {
        match self.rotate_dir {
            RotateDirection::Right => self.max_rotate,
            RotateDirection::Left => self.min_rotate,
        }
    }
}

// ---------------------------------------------------------------------------
// NetworkConfig
// ---------------------------------------------------------------------------

/// Protocol identifiers.  Compile-time constants; never changed at runtime.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkConfig {
    pub wifi_mode: WifiMode,
    pub mqtt_enabled: bool,
    pub mqtt_client_id: &'static str,
    /// Commands arrive on this topic (and `<topic>/<Command>`).
    pub sub_topic: &'static str,
    /// Status snapshots are published here.
    pub pub_topic: &'static str,
    /// Name advertised to the firmware upload tool.
    pub ota_hostname: &'static str,
    /// Station credentials and broker URL, injected at build time.
    pub wifi_ssid: Option<&'static str>,
    #[serde(skip)]
    pub wifi_password: Option<&'static str>,
    pub mqtt_url: Option<&'static str>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::for_profile(HeadProfile::ACTIVE)
    }
}

impl NetworkConfig {
    pub fn for_profile(profile: HeadProfile) -> Self {
        let creds = (
            option_env!("PROPHEAD_WIFI_SSID"),
            option_env!("PROPHEAD_WIFI_PASS"),
            option_env!("PROPHEAD_MQTT_URL"),
        );
        match profile {
            HeadProfile::Goblin => Self {
                wifi_mode: WifiMode::Both,
                mqtt_enabled: true,
                mqtt_client_id: "goblinhead",
                sub_topic: "cmnd/goblinhead",
                pub_topic: "stat/goblinhead",
                ota_hostname: "GoblinHeadOTA",
                wifi_ssid: creds.0,
                wifi_password: creds.1,
                mqtt_url: creds.2,
            },
            HeadProfile::Skull => Self {
                wifi_mode: WifiMode::Both,
                mqtt_enabled: false,
                mqtt_client_id: "skullhead",
                sub_topic: "cmnd/skullhead",
                pub_topic: "stat/skullhead",
                ota_hostname: "SkullHeadOTA",
                wifi_ssid: creds.0,
                wifi_password: creds.1,
                mqtt_url: creds.2,
            },
        }
    }
}
