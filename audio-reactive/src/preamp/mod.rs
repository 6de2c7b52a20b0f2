//! SPI programmable-gain microphone preamp.
//!
//! The amplifier takes one 16-bit word per chip-select frame: the gain-write
//! command in the upper byte and the 3-bit step code in the low bits.
//!
//! # Feature gate
//!
//! This module is available when the `preamp` feature is enabled (on by default).

mod spi_preamp;

pub use spi_preamp::SpiPreamp;

use crate::gain::GainStep;

/// Gain-register write command.
pub const WRITE_GAIN: u16 = 0x4000;

/// Bus word selecting `step`.
#[inline]
pub const fn gain_word(step: GainStep) -> u16 {
    WRITE_GAIN | step.code() as u16
}
