//! # audio-reactive
//!
//! A `no_std`, zero-allocation audio analysis core for audio-reactive
//! wearables and LED controllers. It turns a stream of raw ADC readings into
//! per-band energy, per-band onsets and preamp gain decisions, one sample at a
//! time from the sampling interrupt, using Q15.16 fixed-point arithmetic
//! throughout.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Numeric | [`dsp`] | Fixed point, DC removal, envelopes, Goertzel banks, spectral flux |
//! | Gain | [`gain`] | Preamp gain steps and the automatic gain controller |
//! | Context | [`pipeline`] | Per-sample chain owning all filter state |
//! | Handoff | [`io`] | ADC burst averaging, interrupt-to-foreground mailboxes |
//! | Trait | [`control`] | `GainBus` seam for the amplifier bus |
//! | Driver | [`preamp`] | SPI preamp driver (feature-gated) |
//! | Setup | [`config`] / [`error`] | Injected configuration and its validation |
//!
//! ## Quick start
//!
//! ```ignore
//! use audio_reactive::config::AnalysisConfig;
//! use audio_reactive::pipeline::{AnalysisPipeline, PipelineOutputs};
//!
//! static OUTPUTS: PipelineOutputs<3> = PipelineOutputs::new();
//!
//! let config = AnalysisConfig::default();     // bass, low-mid, mid
//! let mut pipeline = AnalysisPipeline::<3, 8>::new(&config, &OUTPUTS)?;
//!
//! // In the ADC interrupt:
//! if let Some(step) = pipeline.on_readings(&burst) {
//!     preamp.set_gain(step)?;
//! }
//!
//! // In the main loop:
//! if let Some(bass) = OUTPUTS.take_band(0) {
//!     led.set_duty(bass.duty_q15());
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `preamp` | yes | SPI preamp driver (requires `embedded-hal`) |
//! | `tracing` | no | `tracing` events at construction and on gain changes |
//! | `serde` | no | `Serialize`/`Deserialize` for configuration and outputs |
//!
//! ## Reference parameters
//!
//! - **Sample rate:** 16 129.032 Hz ([`constants::DEFAULT_SAMPLE_RATE`])
//! - **ADC:** 12-bit, 4× oversampled ([`constants::DEFAULT_ADC_BITS`])
//! - **Block length:** 200 samples ([`constants::DEFAULT_BLOCK_LEN`])
//! - **Onset window:** 5 blocks ([`constants::ONSET_WINDOW_SIZE`])

#![no_std]

pub mod constants;
pub mod control;
pub mod config;
pub mod dsp;
pub mod error;
pub mod gain;
pub mod io;
pub mod pipeline;

#[cfg(feature = "preamp")]
pub mod preamp;

pub use config::{AnalysisConfig, BandConfig};
pub use error::{BankError, ConfigError};
pub use gain::GainStep;
pub use pipeline::{AnalysisPipeline, BandOutput, PipelineOutputs};

#[cfg(test)]
mod integration_tests;
