//! Analysis configuration.
//!
//! Everything that differed between hardware revisions of the wearable
//! (sample rate, band layout, hold-off, shift table, ADC width) is injected
//! here rather than compiled in. [`AnalysisConfig::validate`] is run by
//! [`AnalysisPipeline::new`](crate::pipeline::AnalysisPipeline::new), so a
//! pipeline can never be built from malformed geometry.

use crate::constants::*;
use crate::dsp::{bin_count, Aggregation, BinTuning, Q16};
use crate::error::ConfigError;
use crate::gain::GainStep;

/// Attack and release times of an envelope follower.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvelopeConfig {
    /// Time to reach 1% of a rising step, in ms.
    pub attack_ms: f32,
    /// Time to reach 1% of a falling step, in ms.
    pub release_ms: f32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        EnvelopeConfig {
            attack_ms: GAIN_ATTACK_MS,
            release_ms: GAIN_RELEASE_MS,
        }
    }
}

impl EnvelopeConfig {
    fn validate(&self, attack: &'static str, release: &'static str) -> Result<(), ConfigError> {
        check_time(attack, self.attack_ms)?;
        check_time(release, self.release_ms)
    }
}

/// One frequency band: a Goertzel bank plus its flux detector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BandConfig {
    /// Samples per Goertzel block.
    pub block_len: u16,
    /// Lowest bin frequency in Hz.
    pub start_freq: f32,
    /// Upper edge of the band in Hz.
    pub end_freq: f32,
    pub tuning: BinTuning,
    pub aggregation: Aggregation,
}

impl BandConfig {
    /// Band with exact tuning and summed magnitudes.
    pub const fn new(block_len: u16, start_freq: f32, end_freq: f32) -> Self {
        BandConfig {
            block_len,
            start_freq,
            end_freq,
            tuning: BinTuning::Exact,
            aggregation: Aggregation::Sum,
        }
    }

    /// Bins this band needs at `sample_rate`.
    pub fn bin_count(&self, sample_rate: f32) -> Result<usize, crate::error::BankError> {
        bin_count(self.block_len, self.start_freq, self.end_freq, sample_rate)
    }
}

/// The wearable's bass, low-mid and mid bands.
pub const FIRMWARE_BANDS: [BandConfig; 3] = [
    BandConfig::new(DEFAULT_BLOCK_LEN, 0.0, 80.0),
    BandConfig::new(DEFAULT_BLOCK_LEN, 160.0, 250.0),
    BandConfig::new(DEFAULT_BLOCK_LEN, 320.0, 800.0),
];

/// DC-bias tracker settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DcBiasConfig {
    /// High-pass cutoff in Hz.
    pub cutoff_hz: f32,
    /// Starting bias in ADC counts; `None` starts at ADC mid-scale.
    pub initial_bias: Option<Q16>,
}

impl Default for DcBiasConfig {
    fn default() -> Self {
        DcBiasConfig {
            cutoff_hz: DEFAULT_DC_CUTOFF_HZ,
            initial_bias: None,
        }
    }
}

/// Automatic gain settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GainConfig {
    /// Envelope the gain decision is based on.
    pub envelope: EnvelopeConfig,
    /// Raise the gain below this level, as a fraction of full scale.
    pub low_threshold: Q16,
    /// Lower the gain above this level, as a fraction of full scale. Must be
    /// below 1.0 or the envelope could never exceed it.
    pub high_threshold: Q16,
    /// Minimum time between changes in ms.
    pub hold_off_ms: f32,
    /// Software attenuation per step, as a right shift.
    pub sw_gain_shifts: [u8; GainStep::COUNT],
    /// Step the amplifier is assumed to start at.
    pub initial_step: GainStep,
}

impl Default for GainConfig {
    fn default() -> Self {
        GainConfig {
            envelope: EnvelopeConfig::default(),
            low_threshold: Q16::from_bits(GAIN_LOW_THRESHOLD),
            high_threshold: Q16::from_bits(GAIN_HIGH_THRESHOLD),
            hold_off_ms: GAIN_HOLD_OFF_MS,
            sw_gain_shifts: DEFAULT_SW_GAIN_SHIFTS,
            initial_step: GainStep::MIN,
        }
    }
}

/// Complete configuration of an [`AnalysisPipeline`](crate::pipeline::AnalysisPipeline)
/// with `BANDS` bands.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisConfig<const BANDS: usize> {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// ADC resolution in bits (1..=15).
    pub adc_bits: u8,
    pub dc: DcBiasConfig,
    pub gain: GainConfig,
    /// Optional general loudness envelope.
    pub loudness: Option<EnvelopeConfig>,
    #[cfg_attr(feature = "serde", serde(with = "serde_bands"))]
    pub bands: [BandConfig; BANDS],
}

impl<const BANDS: usize> AnalysisConfig<BANDS> {
    /// Configuration with the given rate and bands and firmware defaults for
    /// everything else.
    pub fn new(sample_rate: f32, bands: [BandConfig; BANDS]) -> Self {
        AnalysisConfig {
            sample_rate,
            adc_bits: DEFAULT_ADC_BITS,
            dc: DcBiasConfig::default(),
            gain: GainConfig::default(),
            loudness: None,
            bands,
        }
    }

    /// Check every parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sr = self.sample_rate;
        if !(sr.is_finite() && sr > 0.0) {
            return Err(ConfigError::InvalidSampleRate(sr));
        }
        if !(1..=15).contains(&self.adc_bits) {
            return Err(ConfigError::InvalidAdcBits(self.adc_bits));
        }

        let nyquist = sr * 0.5;
        let cutoff = self.dc.cutoff_hz;
        if !(cutoff > 0.0 && cutoff < nyquist) {
            return Err(ConfigError::InvalidCutoff { cutoff, nyquist });
        }

        let gain = &self.gain;
        gain.envelope.validate("gain attack", "gain release")?;
        check_time("hold-off", gain.hold_off_ms)?;
        if gain.low_threshold.is_negative()
            || gain.low_threshold >= gain.high_threshold
            || gain.high_threshold >= Q16::ONE
        {
            return Err(ConfigError::InvalidGainThresholds {
                low: gain.low_threshold.to_f32(),
                high: gain.high_threshold.to_f32(),
            });
        }
        if let Some((step, &shift)) = gain
            .sw_gain_shifts
            .iter()
            .enumerate()
            .find(|(_, &shift)| shift > 16)
        {
            return Err(ConfigError::InvalidShift { step, shift });
        }

        if let Some(loudness) = &self.loudness {
            loudness.validate("loudness attack", "loudness release")?;
        }

        for (band, cfg) in self.bands.iter().enumerate() {
            cfg.bin_count(sr)
                .map_err(|source| ConfigError::Band { band, source })?;
        }
        Ok(())
    }

    /// Starting DC bias: the configured value or ADC mid-scale.
    pub fn initial_bias(&self) -> Q16 {
        self.dc
            .initial_bias
            .unwrap_or_else(|| Q16::from_int(self.full_scale()))
    }

    /// Peak amplitude of a full-scale signal in ADC counts, `2^(bits-1)`.
    pub fn full_scale(&self) -> i32 {
        1 << self.adc_bits.saturating_sub(1).min(30)
    }

    /// Factor mapping ADC counts onto ±1.0.
    pub fn input_scale(&self) -> Q16 {
        Q16::from_int(self.full_scale()).recip()
    }
}

impl Default for AnalysisConfig<3> {
    fn default() -> Self {
        AnalysisConfig::new(DEFAULT_SAMPLE_RATE, FIRMWARE_BANDS)
    }
}

fn check_time(what: &'static str, ms: f32) -> Result<(), ConfigError> {
    if ms.is_finite() && ms >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidTimeConstant { what, ms })
    }
}

/// serde has no impls for arrays of generic length; bands are written as a
/// tuple of `N` elements.
#[cfg(feature = "serde")]
mod serde_bands {
    use super::BandConfig;
    use core::fmt;
    use serde::de::{Error, SeqAccess, Visitor};
    use serde::ser::SerializeTuple;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bands: &[BandConfig; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(N)?;
        for band in bands {
            tup.serialize_element(band)?;
        }
        tup.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[BandConfig; N], D::Error> {
        struct BandsVisitor<const N: usize>;

        impl<'de, const N: usize> Visitor<'de> for BandsVisitor<N> {
            type Value = [BandConfig; N];

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "an array of {} bands", N)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut bands = [BandConfig::new(1, 0.0, 1.0); N];
                for (i, band) in bands.iter_mut().enumerate() {
                    *band = seq
                        .next_element()?
                        .ok_or_else(|| A::Error::invalid_length(i, &self))?;
                }
                Ok(bands)
            }
        }

        deserializer.deserialize_tuple(N, BandsVisitor::<N>)
    }
}
