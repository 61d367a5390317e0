//! GPIO / peripheral pin assignments for the prop head controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  The behaviour core never sees these; it only
//! talks to the capability ports in [`crate::app::ports`].

// ---------------------------------------------------------------------------
// Servo
// ---------------------------------------------------------------------------

/// LEDC PWM output driving the neck servo signal line.
pub const SERVO_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Motion sensor
// ---------------------------------------------------------------------------

/// HC-SR501 PIR output.  HIGH = motion detected.
pub const MOTION_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Eyes
// ---------------------------------------------------------------------------

/// Shared-wiring eye pins, or the left eye when wired independently.
pub const EYE_LEFT_R_GPIO: i32 = 6;
pub const EYE_LEFT_G_GPIO: i32 = 7;
pub const EYE_LEFT_B_GPIO: i32 = 8;

/// Right eye pins (independent wiring only).
pub const EYE_RIGHT_R_GPIO: i32 = 9;
pub const EYE_RIGHT_G_GPIO: i32 = 10;
pub const EYE_RIGHT_B_GPIO: i32 = 11;

// ---------------------------------------------------------------------------
// Audio module UART
// ---------------------------------------------------------------------------

/// UART port wired to the audio player.
pub const AUDIO_UART_PORT: i32 = 1;
/// Board TX -> player RX.
pub const AUDIO_TX_GPIO: i32 = 17;
/// Board RX <- player TX (unused; commands are fire-and-forget).
pub const AUDIO_RX_GPIO: i32 = 18;
/// Audio player serial rate.
pub const AUDIO_BAUD: i32 = 9_600;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// Servo frame rate (50 Hz = 20 ms period).
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// Servo timer resolution; 14 bits gives ~1.2 µs per count at 50 Hz.
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 14;
/// Pulse width at 0°, microseconds.
pub const SERVO_MIN_PULSE_US: u32 = 544;
/// Pulse width at 180°, microseconds.
pub const SERVO_MAX_PULSE_US: u32 = 2_400;

/// LEDC frequency for the eye LEDs (1 kHz, 8-bit duty).
pub const EYE_PWM_FREQ_HZ: u32 = 1_000;
