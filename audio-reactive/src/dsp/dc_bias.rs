//! Adaptive DC-bias tracker.
//!
//! Single-pole low-pass that follows the slow-moving offset of the raw ADC
//! signal (amplifier offset, temperature drift) and subtracts it. The output
//! is an adaptive high-pass with no fixed zero reference.

use core::f32::consts::PI;

use super::fixed::Q16;

/// One-pole DC-bias estimator.
///
/// ```text
/// signal = raw - bias
/// bias  += a0 * signal        a0 = 1 - e^(-2π·fc/SR)
/// ```
///
/// # Example
/// ```
/// use audio_reactive::dsp::{DcBiasTracker, Q16};
///
/// let mut dc = DcBiasTracker::new(7.32, 16_129.0, Q16::from_int(2048));
/// let conditioned = dc.update(Q16::from_int(2100));
/// assert_eq!(conditioned, Q16::from_int(52));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DcBiasTracker {
    a0: Q16,
    bias: Q16,
}

impl DcBiasTracker {
    /// Create a tracker with the given cutoff and starting bias estimate.
    pub fn new(cutoff_hz: f32, sample_rate: f32, initial_bias: Q16) -> Self {
        DcBiasTracker {
            a0: Self::coefficient(cutoff_hz, sample_rate),
            bias: initial_bias,
        }
    }

    /// Smoothing coefficient `1 - e^(-2π·fc/SR)` for a cutoff in Hz.
    pub fn coefficient(cutoff_hz: f32, sample_rate: f32) -> Q16 {
        Q16::from_f32(1.0 - libm::expf(-2.0 * PI * cutoff_hz / sample_rate))
    }

    /// Remove the current bias estimate from `raw`, then move the estimate
    /// toward `raw`.
    #[inline]
    pub fn update(&mut self, raw: Q16) -> Q16 {
        let signal = raw - self.bias;
        self.bias += signal * self.a0;
        signal
    }

    /// Current bias estimate.
    pub fn bias(&self) -> Q16 {
        self.bias
    }

    /// Smoothing coefficient in use.
    pub fn a0(&self) -> Q16 {
        self.a0
    }

    /// Restart tracking from `bias`.
    pub fn reset(&mut self, bias: Q16) {
        self.bias = bias;
    }
}
