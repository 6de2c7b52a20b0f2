//! Construction-time errors.
//!
//! Nothing on the per-sample path can fail; every error here is raised while
//! building a bank or validating an [`AnalysisConfig`](crate::config::AnalysisConfig).

use thiserror::Error;

/// Invalid Goertzel bank geometry.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum BankError {
    /// Sample rate is zero, negative or not finite.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f32),

    /// Block length of zero samples.
    #[error("block length must be at least one sample")]
    ZeroBlockLength,

    /// Block too long for `1/n` to be represented.
    #[error("block length {0} exceeds {max}", max = crate::dsp::MAX_BLOCK_LEN)]
    BlockTooLong(u16),

    /// Range is empty, reversed or negative.
    #[error("invalid frequency range: {start} Hz to {end} Hz")]
    InvalidFrequencyRange {
        /// Requested lower edge.
        start: f32,
        /// Requested upper edge.
        end: f32,
    },

    /// The range needs more bins than the bank can hold.
    #[error("band needs {required} bins but capacity is {capacity}")]
    TooManyBins {
        /// Bins the range would produce.
        required: usize,
        /// Compile-time bank capacity.
        capacity: usize,
    },
}

/// Invalid analysis configuration.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    /// Sample rate is zero, negative or not finite.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f32),

    /// A band's geometry was rejected.
    #[error("band {band}: {source}")]
    Band {
        /// Index of the offending band.
        band: usize,
        /// What was wrong with it.
        #[source]
        source: BankError,
    },

    /// A time constant is negative or not finite.
    #[error("invalid {what} time: {ms} ms")]
    InvalidTimeConstant {
        /// Which time constant.
        what: &'static str,
        /// Offending value.
        ms: f32,
    },

    /// Gain thresholds must satisfy `0 <= low < high < 1.0`.
    #[error("invalid gain thresholds: low {low}, high {high} (full scale is 1.0)")]
    InvalidGainThresholds {
        /// Lower threshold as a fraction of full scale.
        low: f32,
        /// Upper threshold as a fraction of full scale.
        high: f32,
    },

    /// DC cutoff must lie in `(0, SR/2)`.
    #[error("DC cutoff {cutoff} Hz outside (0, {nyquist}) Hz")]
    InvalidCutoff {
        /// Requested cutoff.
        cutoff: f32,
        /// Half the sample rate.
        nyquist: f32,
    },

    /// ADC width must be 1 to 15 bits to fit the integer part of Q15.16.
    #[error("unsupported ADC resolution: {0} bits")]
    InvalidAdcBits(u8),

    /// Software gain shifts above 16 would zero the gain.
    #[error("software gain shift {shift} for step {step} exceeds 16")]
    InvalidShift {
        /// Gain step index.
        step: usize,
        /// Offending shift.
        shift: u8,
    },
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::error::Error as _;
    use std::string::ToString;

    #[test]
    fn bank_error_display() {
        assert_eq!(
            BankError::TooManyBins {
                required: 10,
                capacity: 2
            }
            .to_string(),
            "band needs 10 bins but capacity is 2"
        );
        assert_eq!(
            BankError::BlockTooLong(40_000).to_string(),
            "block length 40000 exceeds 32767"
        );
        assert_eq!(
            BankError::ZeroBlockLength.to_string(),
            "block length must be at least one sample"
        );
    }

    #[test]
    fn config_error_keeps_band_source() {
        let err = ConfigError::Band {
            band: 2,
            source: BankError::ZeroBlockLength,
        };
        assert_eq!(
            err.to_string(),
            "band 2: block length must be at least one sample"
        );
        let source = err.source().map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("block length must be at least one sample")
        );
    }

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::InvalidAdcBits(16).to_string(),
            "unsupported ADC resolution: 16 bits"
        );
        assert_eq!(
            ConfigError::InvalidTimeConstant {
                what: "attack",
                ms: -1.0
            }
            .to_string(),
            "invalid attack time: -1 ms"
        );
        assert_eq!(
            ConfigError::InvalidShift { step: 7, shift: 17 }.to_string(),
            "software gain shift 17 for step 7 exceeds 16"
        );
    }
}
