//! Fixed-point signal processing for the analysis chain.
//!
//! Everything here runs per sample in interrupt context: no allocation, no
//! floating point after construction, no failure paths.
//!
//! ## Components
//!
//! | Type | Role |
//! |------|------|
//! | [`Q16`] | Saturating Q15.16 scalar |
//! | [`DcBiasTracker`] | Adaptive DC removal (slow high-pass) |
//! | [`EnvelopeFollower`] | Attack/release peak envelope |
//! | [`GoertzelBin`] | Single-frequency energy detector |
//! | [`GoertzelBank`] | Bins spanning a band, completing together |
//! | [`SpectralFluxDetector`] | Per-block flux and onset peak-picking |

pub mod fixed;
pub mod dc_bias;
pub mod envelope;
pub mod goertzel;
pub mod flux;

pub use dc_bias::DcBiasTracker;
pub use envelope::EnvelopeFollower;
pub use fixed::{saturate16, wide_sqrt, Q16};
pub use flux::{rectified_flux, SpectralFluxDetector};
pub use goertzel::{bin_count, Aggregation, BinTuning, GoertzelBank, GoertzelBin, MAX_BANK_BINS, MAX_BLOCK_LEN};
