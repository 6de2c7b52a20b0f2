//! Preamp driver over [`embedded_hal::spi::SpiDevice`].
//!
//! # Example
//!
//! ```ignore
//! let mut preamp = SpiPreamp::new(spi);
//! preamp.set_gain(GainStep::X16)?;   // one 0x4002 frame
//! preamp.set_gain(GainStep::X16)?;   // already there, no traffic
//! ```

use embedded_hal::spi::SpiDevice;

use super::gain_word;
use crate::control::GainBus;
use crate::gain::GainStep;

/// Programmable-gain preamp on a 16-bit SPI device.
///
/// The device implementation owns chip select, so each write is one framed
/// transaction. The last step written successfully is cached and repeated
/// requests for it are skipped.
pub struct SpiPreamp<SPI> {
    spi: SPI,
    /// `None` until the first successful write.
    current: Option<GainStep>,
}

impl<SPI> SpiPreamp<SPI>
where
    SPI: SpiDevice<u16>,
{
    /// Wrap `spi`. The amplifier state is unknown until the first write.
    pub fn new(spi: SPI) -> Self {
        Self { spi, current: None }
    }

    /// Program `step` unless it is already set.
    ///
    /// On a bus error the cache is left untouched, so the next request for
    /// the same step retries.
    pub fn set_gain(&mut self, step: GainStep) -> Result<(), SPI::Error> {
        if self.current == Some(step) {
            return Ok(());
        }
        self.spi.write(&[gain_word(step)])?;
        self.current = Some(step);
        Ok(())
    }

    /// Step last written successfully.
    pub fn current(&self) -> Option<GainStep> {
        self.current
    }

    /// Forget the cached step, e.g. after the amplifier lost power.
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    /// Release the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> GainBus for SpiPreamp<SPI>
where
    SPI: SpiDevice<u16>,
{
    type Error = SPI::Error;

    fn transmit(&mut self, step: GainStep) -> Result<(), Self::Error> {
        self.set_gain(step)
    }
}
