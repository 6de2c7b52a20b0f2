//! Asymmetric attack/release envelope follower.
//!
//! Peak-capturing level tracker used by the auto-gain controller and for
//! general loudness tracking.

use super::fixed::Q16;

/// Peak envelope follower with independent attack and release.
///
/// Each time constant is stored as the per-sample decay factor that reaches
/// 1% of a step within the given number of milliseconds:
///
/// ```text
/// coeff = 0.01 ^ (1 / (ms · SR · 0.001))
/// ```
///
/// # Example
/// ```
/// use audio_reactive::dsp::{EnvelopeFollower, Q16};
///
/// let mut env = EnvelopeFollower::new(10.0, 500.0, 16_000.0);
/// for _ in 0..1600 {
///     env.update(Q16::from_int(-100));
/// }
/// assert!(env.value() > Q16::from_int(99));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeFollower {
    attack_coeff: Q16,
    release_coeff: Q16,
    /// Current envelope, never negative.
    value: Q16,
}

impl EnvelopeFollower {
    /// Create a follower at rest (value 0).
    pub fn new(attack_ms: f32, release_ms: f32, sample_rate: f32) -> Self {
        EnvelopeFollower {
            attack_coeff: Self::coefficient(attack_ms, sample_rate),
            release_coeff: Self::coefficient(release_ms, sample_rate),
            value: Q16::ZERO,
        }
    }

    /// Decay factor for a time constant in milliseconds. A non-positive time
    /// gives 0, i.e. the envelope jumps straight to the input.
    pub fn coefficient(ms: f32, sample_rate: f32) -> Q16 {
        let samples = ms * sample_rate * 0.001;
        if samples <= 0.0 {
            return Q16::ZERO;
        }
        Q16::from_f32(libm::powf(0.01, 1.0 / samples))
    }

    /// Feed one sample and return the new envelope value.
    #[inline]
    pub fn update(&mut self, x: Q16) -> Q16 {
        let level = x.abs();
        let coeff = if level > self.value {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.value = level + coeff * (self.value - level);
        self.value
    }

    /// Current envelope value.
    pub fn value(&self) -> Q16 {
        self.value
    }

    /// Per-sample factor applied while the input is above the envelope.
    pub fn attack_coeff(&self) -> Q16 {
        self.attack_coeff
    }

    /// Per-sample factor applied while the input is at or below the envelope.
    pub fn release_coeff(&self) -> Q16 {
        self.release_coeff
    }

    /// Drop the envelope back to zero.
    pub fn reset(&mut self) {
        self.value = Q16::ZERO;
    }
}
