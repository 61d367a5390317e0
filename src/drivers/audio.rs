//! Serial MP3 player (DFPlayer Mini protocol).
//!
//! Every command is a fixed 10-byte frame:
//!
//! ```text
//!  0x7E  0xFF  0x06  CMD  FB  PH  PL  CKH  CKL  0xEF
//!  start ver   len        ack param      checksum end
//! ```
//!
//! The checksum is the two's complement of the sum of bytes 1..=6.
//! Replies are never requested (FB = 0), so writes are fire-and-forget.

use log::debug;

use crate::config::MAX_VOLUME;
use crate::drivers::hw_init;
use crate::error::ActuatorError;

pub const FRAME_LEN: usize = 10;

const START: u8 = 0x7E;
const VERSION: u8 = 0xFF;
const LENGTH: u8 = 0x06;
const NO_FEEDBACK: u8 = 0x00;
const END: u8 = 0xEF;

/// Player command codes used by the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlayerCommand {
    /// Play track N from the root folder.
    PlayTrack = 0x03,
    /// Set volume 0-30.
    SetVolume = 0x06,
    Reset = 0x0C,
}

/// Build a complete frame for `cmd` with a 16-bit parameter.
pub fn encode(cmd: PlayerCommand, param: u16) -> [u8; FRAME_LEN] {
    let [ph, pl] = param.to_be_bytes();
    let mut frame = [START, VERSION, LENGTH, cmd as u8, NO_FEEDBACK, ph, pl, 0, 0, END];
    let sum: u16 = frame[1..7].iter().map(|&b| b as u16).sum();
    let [ckh, ckl] = 0u16.wrapping_sub(sum).to_be_bytes();
    frame[7] = ckh;
    frame[8] = ckl;
    frame
}

pub struct AudioPlayer {
    volume: Option<u8>,
}

impl AudioPlayer {
    pub fn new() -> Self {
        Self { volume: None }
    }

    pub fn reset(&mut self) -> Result<(), ActuatorError> {
        self.send(PlayerCommand::Reset, 0)
    }

    pub fn play(&mut self, track: u16) -> Result<(), ActuatorError> {
        self.send(PlayerCommand::PlayTrack, track)
    }

    pub fn set_volume(&mut self, volume: u8) -> Result<(), ActuatorError> {
        let volume = volume.min(MAX_VOLUME);
        self.send(PlayerCommand::SetVolume, volume as u16)?;
        self.volume = Some(volume);
        Ok(())
    }

    /// Last volume sent, `None` before the first.
    pub fn volume(&self) -> Option<u8> {
        self.volume
    }

    fn send(&mut self, cmd: PlayerCommand, param: u16) -> Result<(), ActuatorError> {
        debug!("AUDIO: {:?} {}", cmd, param);
        hw_init::uart_write(&encode(cmd, param))
    }
}

impl Default for AudioPlayer {
    fn default() -> Self {
        Self::new()
    }
}
