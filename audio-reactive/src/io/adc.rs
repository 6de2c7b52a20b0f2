//! ADC sample acquisition helpers.
//!
//! The reference board oversamples: each sample-rate interrupt collects a
//! burst of conversions and averages them into one reading before it enters
//! the analysis chain.

use crate::dsp::Q16;

/// Mean of an oversampled burst, truncated. An empty burst reads 0.
///
/// For a power-of-two burst this equals the sum shifted right by its log2,
/// which is how the firmware averages its four conversions.
#[inline]
pub fn average_readings(readings: &[u16]) -> u16 {
    if readings.is_empty() {
        return 0;
    }
    let sum: u64 = readings.iter().map(|&r| r as u64).sum();
    (sum / readings.len() as u64) as u16
}

/// Raw ADC counts as a Q16 sample. Readings above 32767 saturate.
#[inline(always)]
pub fn counts_to_sample(raw: u16) -> Q16 {
    Q16::from_int(raw as i32)
}
