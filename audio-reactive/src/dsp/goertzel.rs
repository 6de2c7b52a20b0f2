//! Goertzel single-bin detectors and fixed-capacity bin banks.
//!
//! A [`GoertzelBin`] is a second-order resonator that measures the energy of
//! its input at one frequency over a block of `n` samples. A
//! [`GoertzelBank`] spans a frequency range with bins spaced `SR / n` apart;
//! because every bin shares `n`, the whole bank completes on the same sample.

use core::f32::consts::PI;

use super::fixed::{wide_sqrt, Q16, FRAC_BITS};
use crate::error::BankError;

/// Longest supported block. `1/n` must stay representable in Q16.
pub const MAX_BLOCK_LEN: u16 = i16::MAX as u16;

/// Most bins a single bank can be asked for.
pub const MAX_BANK_BINS: usize = u16::MAX as usize;

/// How a bin's target frequency maps onto its resonator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinTuning {
    /// `k = n·f/SR`: the bin resonates at its target frequency.
    #[default]
    Exact,
    /// `k = 0.5·n·f/SR`: the tuning the wearable firmware shipped with, which
    /// resonates at half the target frequency.
    HalfRate,
}

impl BinTuning {
    /// Factor applied to `n·f/SR` when computing the bin index `k`.
    pub fn factor(self) -> f32 {
        match self {
            BinTuning::Exact => 1.0,
            BinTuning::HalfRate => 0.5,
        }
    }
}

/// How bin magnitudes are combined into one band magnitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Aggregation {
    /// Plain sum of the bin magnitudes.
    #[default]
    Sum,
    /// Sum scaled by `1 / bin count`.
    Mean,
}

/// Single-frequency Goertzel detector.
#[derive(Debug, Clone, Copy)]
pub struct GoertzelBin {
    /// Block length in samples.
    n: u16,
    /// Position inside the current block, `0 ≤ i < n`.
    i: u16,
    q0: Q16,
    q1: Q16,
    q2: Q16,
    /// `2·cos(w)`
    c: Q16,
    /// Result of the last completed block.
    magnitude: Q16,
    /// `1 / n`
    mag_scaler: Q16,
    frequency: f32,
    tuning: BinTuning,
}

impl GoertzelBin {
    const IDLE: GoertzelBin = GoertzelBin {
        n: 0,
        i: 0,
        q0: Q16::ZERO,
        q1: Q16::ZERO,
        q2: Q16::ZERO,
        c: Q16::ZERO,
        magnitude: Q16::ZERO,
        mag_scaler: Q16::ZERO,
        frequency: 0.0,
        tuning: BinTuning::Exact,
    };

    /// Create a bin for `frequency` Hz over blocks of `block_len` samples.
    ///
    /// A `block_len` of zero is treated as one; [`GoertzelBank::new`] rejects
    /// it outright.
    pub fn new(block_len: u16, frequency: f32, sample_rate: f32, tuning: BinTuning) -> Self {
        let block_len = block_len.max(1);
        let n = block_len as f32;
        let k = tuning.factor() * (n * frequency / sample_rate);
        let w = (2.0 * PI / n) * k;
        GoertzelBin {
            n: block_len,
            c: Q16::from_f32(2.0 * libm::cosf(w)),
            mag_scaler: Q16::from_int(block_len as i32).recip(),
            frequency,
            tuning,
            ..Self::IDLE
        }
    }

    /// Feed one sample. Returns `true` on the sample that completes a block,
    /// at which point [`magnitude()`](Self::magnitude) holds the new result.
    #[inline]
    pub fn update(&mut self, x: Q16) -> bool {
        self.q0 = self.c * self.q1 - self.q2 + x;
        self.q2 = self.q1;
        self.q1 = self.q0;
        self.i += 1;

        if self.i != self.n {
            return false;
        }

        // q1² + q2² - q1·q2·c in Q32, wide enough that no term overflows.
        let q1 = self.q1.to_bits() as i128;
        let q2 = self.q2.to_bits() as i128;
        let c = self.c.to_bits() as i128;
        let power = q1 * q1 + q2 * q2 - ((q1 * q2 * c) >> FRAC_BITS);
        self.magnitude = wide_sqrt(power) * self.mag_scaler;

        self.q0 = Q16::ZERO;
        self.q1 = Q16::ZERO;
        self.q2 = Q16::ZERO;
        self.i = 0;
        true
    }

    /// Magnitude of the last completed block.
    pub fn magnitude(&self) -> Q16 {
        self.magnitude
    }

    /// Target frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Frequency the resonator actually peaks at, in Hz.
    pub fn resonant_frequency(&self) -> f32 {
        self.frequency * self.tuning.factor()
    }

    /// Resonator coefficient `2·cos(w)`.
    pub fn coefficient(&self) -> Q16 {
        self.c
    }

    /// Block length in samples.
    pub fn block_len(&self) -> u16 {
        self.n
    }

    /// Samples consumed in the current block.
    pub fn position(&self) -> u16 {
        self.i
    }

    /// Discard the partial block and the last magnitude.
    pub fn reset(&mut self) {
        self.q0 = Q16::ZERO;
        self.q1 = Q16::ZERO;
        self.q2 = Q16::ZERO;
        self.i = 0;
        self.magnitude = Q16::ZERO;
    }
}

/// A contiguous run of [`GoertzelBin`]s sharing one block length.
///
/// Storage is a fixed array of `MAX_BINS`; only the first [`len()`](Self::len)
/// bins are live. Bin `k` targets `start + k·(SR / n)`.
///
/// # Example
/// ```
/// use audio_reactive::dsp::{BinTuning, GoertzelBank, Q16};
///
/// let mut bank = GoertzelBank::<4>::new(100, 160.0, 250.0, 8064.5, BinTuning::Exact).unwrap();
/// assert_eq!(bank.len(), 2);
///
/// let ready = (1..=100).map(|_| bank.update(Q16::ZERO)).filter(|&r| r).count();
/// assert_eq!(ready, 1);
/// ```
#[derive(Debug, Clone)]
pub struct GoertzelBank<const MAX_BINS: usize> {
    bins: [GoertzelBin; MAX_BINS],
    len: usize,
    block_len: u16,
    bin_width: f32,
    /// `1 / len`, applied only for [`Aggregation::Mean`].
    scaler: Q16,
    ready: bool,
}

impl<const MAX_BINS: usize> GoertzelBank<MAX_BINS> {
    /// Build a bank covering `start_freq..=end_freq` Hz.
    pub fn new(
        block_len: u16,
        start_freq: f32,
        end_freq: f32,
        sample_rate: f32,
        tuning: BinTuning,
    ) -> Result<Self, BankError> {
        let len = bin_count(block_len, start_freq, end_freq, sample_rate)?;
        if len > MAX_BINS {
            return Err(BankError::TooManyBins {
                required: len,
                capacity: MAX_BINS,
            });
        }

        Ok(Self::with_len(len, block_len, start_freq, sample_rate, tuning))
    }

    /// Build a bank of `len` bins from geometry that has already been
    /// checked. `len` is clamped to `MAX_BINS`.
    pub(crate) fn with_len(
        len: usize,
        block_len: u16,
        start_freq: f32,
        sample_rate: f32,
        tuning: BinTuning,
    ) -> Self {
        let len = len.min(MAX_BINS);
        let bin_width = sample_rate / block_len as f32;
        let mut bins = [GoertzelBin::IDLE; MAX_BINS];
        for (k, bin) in bins[..len].iter_mut().enumerate() {
            let frequency = start_freq + k as f32 * bin_width;
            *bin = GoertzelBin::new(block_len, frequency, sample_rate, tuning);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            bins = len,
            block_len,
            bin_width,
            start_freq,
            "goertzel bank configured"
        );

        GoertzelBank {
            bins,
            len,
            block_len,
            bin_width,
            scaler: Q16::from_int(len as i32).recip(),
            ready: false,
        }
    }

    /// Feed one sample to every bin. Returns `true` on the sample that
    /// completes the shared block.
    #[inline]
    pub fn update(&mut self, x: Q16) -> bool {
        let mut ready = false;
        for bin in self.bins[..self.len].iter_mut() {
            ready = bin.update(x);
        }
        self.ready = ready;
        ready
    }

    /// Unscaled sum of the bin magnitudes.
    pub fn aggregate_magnitude(&self) -> Q16 {
        self.magnitudes().fold(Q16::ZERO, |acc, m| acc + m)
    }

    /// Sum of the bin magnitudes scaled by `1 / len`.
    pub fn scaled_magnitude(&self) -> Q16 {
        self.aggregate_magnitude() * self.scaler
    }

    /// Band magnitude using the given aggregation.
    pub fn magnitude(&self, aggregation: Aggregation) -> Q16 {
        match aggregation {
            Aggregation::Sum => self.aggregate_magnitude(),
            Aggregation::Mean => self.scaled_magnitude(),
        }
    }

    /// `true` only on the sample that completed the last block.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Live bins, lowest frequency first.
    pub fn bins(&self) -> &[GoertzelBin] {
        &self.bins[..self.len]
    }

    /// Magnitudes of the live bins from the last completed block.
    pub fn magnitudes(&self) -> impl Iterator<Item = Q16> + '_ {
        self.bins().iter().map(GoertzelBin::magnitude)
    }

    /// Bin `k`, if it exists.
    pub fn bin(&self, k: usize) -> Option<&GoertzelBin> {
        self.bins().get(k)
    }

    /// Number of live bins.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: a bank has at least one bin.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shared block length.
    pub fn block_len(&self) -> u16 {
        self.block_len
    }

    /// Spacing between adjacent bins in Hz.
    pub fn bin_width(&self) -> f32 {
        self.bin_width
    }

    /// The `1 / len` aggregation scaler.
    pub fn scaler(&self) -> Q16 {
        self.scaler
    }

    /// Reset every bin.
    pub fn reset(&mut self) {
        for bin in self.bins[..self.len].iter_mut() {
            bin.reset();
        }
        self.ready = false;
    }
}

/// Number of bins needed to cover `start_freq..=end_freq`:
/// `1 + floor((end - start) / (SR / n))`.
pub fn bin_count(
    block_len: u16,
    start_freq: f32,
    end_freq: f32,
    sample_rate: f32,
) -> Result<usize, BankError> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(BankError::InvalidSampleRate(sample_rate));
    }
    if block_len == 0 {
        return Err(BankError::ZeroBlockLength);
    }
    if block_len > MAX_BLOCK_LEN {
        return Err(BankError::BlockTooLong(block_len));
    }
    if !(start_freq >= 0.0 && end_freq > start_freq && end_freq.is_finite()) {
        return Err(BankError::InvalidFrequencyRange {
            start: start_freq,
            end: end_freq,
        });
    }
    let bin_width = sample_rate / block_len as f32;
    let bins = libm::floorf((end_freq - start_freq) / bin_width) + 1.0;
    if bins > MAX_BANK_BINS as f32 {
        return Err(BankError::TooManyBins {
            required: bins as usize,
            capacity: MAX_BANK_BINS,
        });
    }
    Ok(bins as usize)
}
