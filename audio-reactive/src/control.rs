use crate::gain::GainStep;

/// Trait for the bus that carries gain decisions to the microphone preamp.
///
/// The pipeline only decides; an implementation of this trait performs the
/// transaction. Errors are the bus's own.
pub trait GainBus {
    /// Error type for bus transactions.
    type Error;

    /// Program the amplifier to `step`.
    fn transmit(&mut self, step: GainStep) -> Result<(), Self::Error>;
}
