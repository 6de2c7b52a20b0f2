//! Automatic input gain.
//!
//! The microphone preamp offers eight discrete gain steps. The
//! [`AutoGainController`] watches a slow envelope of the conditioned signal
//! and moves one step up when the input is too quiet or one step down when it
//! is too loud, then waits out a hold-off before it may move again. Each
//! hardware step has a matching software attenuation (a right shift) so the
//! analysis sees a level that stays roughly constant across steps.

use crate::config::GainConfig;
use crate::dsp::{EnvelopeFollower, Q16};

/// Hardware gain step of the microphone preamp.
///
/// The discriminant is the 3-bit code sent to the amplifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum GainStep {
    /// ×1
    #[default]
    X1 = 0,
    /// ×4
    X4 = 1,
    /// ×16
    X16 = 2,
    /// ×25
    X25 = 3,
    /// ×64
    X64 = 4,
    /// ×100
    X100 = 5,
    /// ×256
    X256 = 6,
    /// ×1024
    X1024 = 7,
}

impl GainStep {
    /// Number of steps.
    pub const COUNT: usize = 8;

    /// Lowest gain.
    pub const MIN: GainStep = GainStep::X1;

    /// Highest gain.
    pub const MAX: GainStep = GainStep::X1024;

    /// Every step, lowest first.
    pub const ALL: [GainStep; Self::COUNT] = [
        GainStep::X1,
        GainStep::X4,
        GainStep::X16,
        GainStep::X25,
        GainStep::X64,
        GainStep::X100,
        GainStep::X256,
        GainStep::X1024,
    ];

    /// Amplifier code, 0..=7.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Step for an amplifier code.
    pub const fn from_code(code: u8) -> Option<Self> {
        if (code as usize) < Self::COUNT {
            Some(Self::ALL[code as usize])
        } else {
            None
        }
    }

    /// Linear gain factor.
    pub const fn factor(self) -> u16 {
        match self {
            GainStep::X1 => 1,
            GainStep::X4 => 4,
            GainStep::X16 => 16,
            GainStep::X25 => 25,
            GainStep::X64 => 64,
            GainStep::X100 => 100,
            GainStep::X256 => 256,
            GainStep::X1024 => 1024,
        }
    }

    /// Next step up, or `None` at [`GainStep::MAX`].
    pub const fn up(self) -> Option<Self> {
        Self::from_code(self.code() + 1)
    }

    /// Next step down, or `None` at [`GainStep::MIN`].
    pub const fn down(self) -> Option<Self> {
        match self.code().checked_sub(1) {
            Some(code) => Self::from_code(code),
            None => None,
        }
    }
}

/// Envelope-driven preamp gain controller with hysteresis and hold-off.
#[derive(Debug, Clone)]
pub struct AutoGainController {
    envelope: EnvelopeFollower,
    low: Q16,
    high: Q16,
    /// Ticks to wait after a change.
    hold_off_samples: u32,
    /// Ticks left before the next change is allowed.
    hold_off: u32,
    step: GainStep,
    shifts: [u8; GainStep::COUNT],
    sw_gain: Q16,
}

impl AutoGainController {
    /// Build a controller from a validated [`GainConfig`].
    pub fn new(config: &GainConfig, sample_rate: f32) -> Self {
        let hold_off_samples = libm::roundf(config.hold_off_ms * sample_rate * 0.001) as u32;
        let step = config.initial_step;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            low = config.low_threshold.to_f32(),
            high = config.high_threshold.to_f32(),
            hold_off_samples,
            step = ?step,
            "auto gain configured"
        );

        AutoGainController {
            envelope: EnvelopeFollower::new(
                config.envelope.attack_ms,
                config.envelope.release_ms,
                sample_rate,
            ),
            low: config.low_threshold,
            high: config.high_threshold,
            hold_off_samples,
            hold_off: 0,
            step,
            shifts: config.sw_gain_shifts,
            sw_gain: software_gain(config.sw_gain_shifts[step.code() as usize]),
        }
    }

    /// Feed the bias-free sample, normalised to ±1.0, to the gain envelope.
    #[inline]
    pub fn track(&mut self, x: Q16) -> Q16 {
        self.envelope.update(x)
    }

    /// Run one gain decision. Returns the new step when it changed; the
    /// caller transmits it to the amplifier.
    ///
    /// Only an actual change starts a hold-off. At ×1 or ×1024 a level that
    /// asks to go further leaves the step alone and is re-checked on the
    /// next tick.
    #[inline]
    pub fn tick(&mut self) -> Option<GainStep> {
        if self.hold_off > 0 {
            self.hold_off -= 1;
            return None;
        }

        let level = self.envelope.value();
        let next = if level < self.low {
            self.step.up()
        } else if level > self.high {
            self.step.down()
        } else {
            None
        }?;

        self.apply(next);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            step = ?next,
            factor = next.factor(),
            level = level.to_f32(),
            "preamp gain changed"
        );

        Some(next)
    }

    /// Force a step, e.g. to resynchronise with the amplifier after a bus
    /// error. Starts a new hold-off.
    pub fn set_step(&mut self, step: GainStep) {
        self.apply(step);
    }

    fn apply(&mut self, step: GainStep) {
        self.step = step;
        self.sw_gain = software_gain(self.shifts[step.code() as usize]);
        self.hold_off = self.hold_off_samples;
    }

    /// Current hardware step.
    pub fn step(&self) -> GainStep {
        self.step
    }

    /// Software gain compensating the current hardware step.
    pub fn sw_gain(&self) -> Q16 {
        self.sw_gain
    }

    /// Ticks left before another change is allowed.
    pub fn hold_off(&self) -> u32 {
        self.hold_off
    }

    /// Hold-off length in ticks.
    pub fn hold_off_samples(&self) -> u32 {
        self.hold_off_samples
    }

    /// Gain envelope level.
    pub fn envelope(&self) -> Q16 {
        self.envelope.value()
    }
}

/// `2^-shift` in Q16; shifts past the fractional width give zero.
fn software_gain(shift: u8) -> Q16 {
    Q16::from_bits(Q16::ONE.to_bits().checked_shr(shift as u32).unwrap_or(0))
}
