//! RGB eye LEDs.
//!
//! Three LEDC PWM channels per eye drive discrete R/G/B LEDs (or a
//! common-cathode RGB LED).  With shared wiring both eyes hang off one set
//! of pins; with independent wiring both sets are written with the same
//! colour.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LEDC channels via hw_init.
//! On host/test: tracks state in-memory only.

use crate::config::{EyeWiring, Rgb};
use crate::drivers::hw_init;
use crate::error::ActuatorError;

const LEFT: [u32; 3] = [
    hw_init::LEDC_CH_EYE_L_R,
    hw_init::LEDC_CH_EYE_L_G,
    hw_init::LEDC_CH_EYE_L_B,
];
const RIGHT: [u32; 3] = [
    hw_init::LEDC_CH_EYE_R_R,
    hw_init::LEDC_CH_EYE_R_G,
    hw_init::LEDC_CH_EYE_R_B,
];

pub struct EyeLeds {
    wiring: EyeWiring,
    current: Rgb,
}

impl EyeLeds {
    pub fn new(wiring: EyeWiring) -> Self {
        Self {
            wiring,
            current: Rgb::OFF,
        }
    }

    pub fn set_colour(&mut self, colour: Rgb) -> Result<(), ActuatorError> {
        write_eye(LEFT, colour)?;
        if self.wiring == EyeWiring::Independent {
            write_eye(RIGHT, colour)?;
        }
        self.current = colour;
        Ok(())
    }

    pub fn current_colour(&self) -> Rgb {
        self.current
    }
}

fn write_eye(channels: [u32; 3], Rgb(r, g, b): Rgb) -> Result<(), ActuatorError> {
    hw_init::ledc_set(channels[0], r as u32)?;
    hw_init::ledc_set(channels[1], g as u32)?;
    hw_init::ledc_set(channels[2], b as u32)
}
