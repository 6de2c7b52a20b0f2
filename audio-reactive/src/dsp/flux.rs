//! Spectral-flux onset detection on top of a [`GoertzelBank`].
//!
//! Each completed bank block yields one flux value: the half-wave rectified
//! sum of per-bin magnitude increases. Onsets are local maxima of flux over a
//! short circular window, confirmed once `WINDOW / 2` newer blocks have
//! arrived after the candidate.

use super::fixed::Q16;
use super::goertzel::GoertzelBank;
use crate::constants::ONSET_WINDOW_SIZE;

/// Spectral-flux onset detector owning its bank.
///
/// `WINDOW` is the peak-picking window (5 on the reference hardware).
pub struct SpectralFluxDetector<const MAX_BINS: usize, const WINDOW: usize = ONSET_WINDOW_SIZE> {
    bank: GoertzelBank<MAX_BINS>,
    prev_magnitudes: [Q16; MAX_BINS],
    /// The last `WINDOW` block fluxes, newest at `write_index`.
    flux_history: [Q16; WINDOW],
    write_index: usize,
    ready: bool,
}

impl<const MAX_BINS: usize, const WINDOW: usize> SpectralFluxDetector<MAX_BINS, WINDOW> {
    const WINDOW_NOT_EMPTY: () = assert!(WINDOW > 0, "onset window must hold at least one flux");

    /// Wrap `bank`, starting from all-zero magnitude and flux history.
    pub fn new(bank: GoertzelBank<MAX_BINS>) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::WINDOW_NOT_EMPTY;

        SpectralFluxDetector {
            bank,
            prev_magnitudes: [Q16::ZERO; MAX_BINS],
            flux_history: [Q16::ZERO; WINDOW],
            write_index: 0,
            ready: false,
        }
    }

    /// Feed one sample to the bank. On the sample that completes a block the
    /// block's flux is computed and pushed into the window; returns `true`
    /// on that sample.
    #[inline]
    pub fn update(&mut self, x: Q16) -> bool {
        self.ready = self.bank.update(x);
        if self.ready {
            let mut flux = Q16::ZERO;
            let live = self.bank.len();
            for (prev, bin) in self.prev_magnitudes[..live].iter_mut().zip(self.bank.bins()) {
                flux += rectify(bin.magnitude() - *prev);
                *prev = bin.magnitude();
            }
            self.push_flux(flux);
        }
        self.ready
    }

    /// Advance the window and store `flux` as the newest block value.
    pub fn push_flux(&mut self, flux: Q16) {
        self.write_index = (self.write_index + 1) % WINDOW;
        self.flux_history[self.write_index] = flux;
    }

    /// `true` if the flux `WINDOW / 2` blocks back is at least as large as
    /// every flux in the window. Ties count as an onset.
    pub fn onset(&self) -> bool {
        let lag = (self.write_index + WINDOW / 2 + 1) % WINDOW;
        let candidate = self.flux_history[lag];
        self.flux_history.iter().all(|&f| candidate >= f)
    }

    /// Flux of the newest block.
    pub fn flux(&self) -> Q16 {
        self.flux_history[self.write_index]
    }

    /// The flux window in storage order.
    pub fn history(&self) -> &[Q16; WINDOW] {
        &self.flux_history
    }

    /// Slot holding the newest flux.
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Bin magnitudes of the previous block.
    pub fn prev_magnitudes(&self) -> &[Q16] {
        &self.prev_magnitudes[..self.bank.len()]
    }

    /// `true` only on the sample that completed the last block.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The underlying bank.
    pub fn bank(&self) -> &GoertzelBank<MAX_BINS> {
        &self.bank
    }
}

/// Half-wave rectified flux between two magnitude vectors.
///
/// Sums `d + |d|` with `d = current - previous`, so each bin contributes
/// twice its increase and nothing for a decrease.
pub fn rectified_flux(previous: &[Q16], current: &[Q16]) -> Q16 {
    previous
        .iter()
        .zip(current)
        .fold(Q16::ZERO, |acc, (&p, &c)| acc + rectify(c - p))
}

#[inline(always)]
fn rectify(d: Q16) -> Q16 {
    d + d.abs()
}
