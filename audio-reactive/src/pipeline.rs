//! Per-sample analysis pipeline.
//!
//! [`AnalysisPipeline`] owns every piece of filter state for one audio input
//! and is driven from the sampling interrupt, one reading at a time:
//!
//! ```text
//! raw ─► DC bias ─► × input_scale ─► gain envelope ─► × sw_gain ─┬─► band 0 ─► publish
//!                                    (loudness)                   ├─► band 1 ─► publish
//!                                                                 └─► …
//!        auto gain tick ─► publish step
//! ```
//!
//! Both envelopes see the normalised input before software gain, so a
//! full-scale reading tracks 1.0 whatever the ADC width.
//! Results leave through a [`PipelineOutputs`] shared with the foreground:
//! one [`Mailbox`] per band plus one for gain changes. The gain decision made
//! on a sample only affects conditioning from the next sample on.

use crate::config::AnalysisConfig;
use crate::constants::ONSET_WINDOW_SIZE;
use crate::control::GainBus;
use crate::dsp::{Aggregation, DcBiasTracker, EnvelopeFollower, GoertzelBank, SpectralFluxDetector, Q16};
use crate::error::{BankError, ConfigError};
use crate::gain::{AutoGainController, GainStep};
use crate::io::{average_readings, counts_to_sample, Mailbox};

/// One band's result for a completed block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BandOutput {
    /// Aggregated bin magnitude.
    pub magnitude: Q16,
    /// Spectral flux of the block.
    pub flux: Q16,
    /// Onset confirmed on this block.
    pub onset: bool,
}

impl BandOutput {
    /// Magnitude as a Q1.15 duty cycle.
    pub fn duty_q15(&self) -> i16 {
        self.magnitude.to_q15()
    }
}

/// Mailboxes connecting a pipeline to the foreground loop.
///
/// `const`-constructible so it can be a `static` shared with the interrupt.
pub struct PipelineOutputs<const BANDS: usize> {
    bands: [Mailbox<BandOutput>; BANDS],
    gain: Mailbox<GainStep>,
}

impl<const BANDS: usize> PipelineOutputs<BANDS> {
    /// Empty mailboxes.
    pub const fn new() -> Self {
        PipelineOutputs {
            bands: [const { Mailbox::new() }; BANDS],
            gain: Mailbox::new(),
        }
    }

    /// Take band `b`'s newest unread result.
    pub fn take_band(&self, b: usize) -> Option<BandOutput> {
        self.bands.get(b).and_then(Mailbox::take)
    }

    /// Take the newest unread gain change.
    pub fn take_gain(&self) -> Option<GainStep> {
        self.gain.take()
    }

    /// Band `b`'s mailbox.
    pub fn band(&self, b: usize) -> Option<&Mailbox<BandOutput>> {
        self.bands.get(b)
    }

    /// The gain-change mailbox.
    pub fn gain(&self) -> &Mailbox<GainStep> {
        &self.gain
    }
}

impl<const BANDS: usize> Default for PipelineOutputs<BANDS> {
    fn default() -> Self {
        Self::new()
    }
}

/// Audio analysis context for `BANDS` bands of up to `MAX_BINS` bins each.
///
/// # Example
///
/// ```
/// use audio_reactive::config::{AnalysisConfig, BandConfig};
/// use audio_reactive::dsp::Q16;
/// use audio_reactive::pipeline::{AnalysisPipeline, PipelineOutputs};
///
/// static OUTPUTS: PipelineOutputs<2> = PipelineOutputs::new();
///
/// let config = AnalysisConfig::new(
///     8064.5,
///     [BandConfig::new(100, 0.0, 80.0), BandConfig::new(100, 160.0, 250.0)],
/// );
/// let mut pipeline = AnalysisPipeline::<2, 4>::new(&config, &OUTPUTS).unwrap();
///
/// // Sampling interrupt: a silent input sitting at ADC mid-scale
/// for _ in 0..100 {
///     pipeline.on_sample(2048);
/// }
///
/// // Foreground
/// let bass = OUTPUTS.take_band(0).unwrap();
/// assert_eq!(bass.magnitude, Q16::ZERO);
/// ```
pub struct AnalysisPipeline<'a, const BANDS: usize, const MAX_BINS: usize, const WINDOW: usize = ONSET_WINDOW_SIZE> {
    dc: DcBiasTracker,
    auto_gain: AutoGainController,
    loudness: Option<EnvelopeFollower>,
    detectors: [SpectralFluxDetector<MAX_BINS, WINDOW>; BANDS],
    aggregation: [Aggregation; BANDS],
    /// Maps ADC counts onto ±1.0.
    input_scale: Q16,
    latest: [Option<BandOutput>; BANDS],
    outputs: &'a PipelineOutputs<BANDS>,
}

impl<'a, const BANDS: usize, const MAX_BINS: usize, const WINDOW: usize>
    AnalysisPipeline<'a, BANDS, MAX_BINS, WINDOW>
{
    /// Validate `config` and build every filter.
    pub fn new(
        config: &AnalysisConfig<BANDS>,
        outputs: &'a PipelineOutputs<BANDS>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let sr = config.sample_rate;

        let mut lens = [0usize; BANDS];
        for (band, (len, cfg)) in lens.iter_mut().zip(config.bands.iter()).enumerate() {
            *len = cfg
                .bin_count(sr)
                .map_err(|source| ConfigError::Band { band, source })?;
            if *len > MAX_BINS {
                return Err(ConfigError::Band {
                    band,
                    source: BankError::TooManyBins {
                        required: *len,
                        capacity: MAX_BINS,
                    },
                });
            }
        }

        let detectors = core::array::from_fn(|b| {
            let cfg = &config.bands[b];
            SpectralFluxDetector::new(GoertzelBank::with_len(
                lens[b],
                cfg.block_len,
                cfg.start_freq,
                sr,
                cfg.tuning,
            ))
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(
            bands = BANDS,
            sample_rate = sr,
            adc_bits = config.adc_bits,
            "analysis pipeline configured"
        );

        Ok(AnalysisPipeline {
            dc: DcBiasTracker::new(config.dc.cutoff_hz, sr, config.initial_bias()),
            auto_gain: AutoGainController::new(&config.gain, sr),
            loudness: config
                .loudness
                .map(|env| EnvelopeFollower::new(env.attack_ms, env.release_ms, sr)),
            detectors,
            aggregation: config.bands.map(|b| b.aggregation),
            input_scale: config.input_scale(),
            latest: [None; BANDS],
            outputs,
        })
    }

    /// Process one raw ADC reading. Returns the new preamp step when the gain
    /// controller changed it; the step is also published to the outputs.
    #[inline]
    pub fn on_sample(&mut self, raw: u16) -> Option<GainStep> {
        let level = self.dc.update(counts_to_sample(raw)) * self.input_scale;
        self.auto_gain.track(level);
        if let Some(env) = self.loudness.as_mut() {
            env.update(level);
        }

        let x = level * self.auto_gain.sw_gain();
        let outputs = self.outputs;
        for (b, det) in self.detectors.iter_mut().enumerate() {
            if det.update(x) {
                let out = BandOutput {
                    magnitude: det.bank().magnitude(self.aggregation[b]),
                    flux: det.flux(),
                    onset: det.onset(),
                };
                self.latest[b] = Some(out);
                outputs.bands[b].publish(out);
            }
        }

        let change = self.auto_gain.tick();
        if let Some(step) = change {
            outputs.gain.publish(step);
        }
        change
    }

    /// Average an oversampled burst and process it as one sample.
    #[inline]
    pub fn on_readings(&mut self, readings: &[u16]) -> Option<GainStep> {
        self.on_sample(average_readings(readings))
    }

    /// [`on_sample`](Self::on_sample), sending any gain change straight to
    /// `bus`. On a bus error the controller has already moved; the step is
    /// still in the gain mailbox for a retry.
    pub fn on_sample_with_bus<B: GainBus>(
        &mut self,
        raw: u16,
        bus: &mut B,
    ) -> Result<Option<GainStep>, B::Error> {
        let change = self.on_sample(raw);
        if let Some(step) = change {
            bus.transmit(step)?;
            self.outputs.gain.take();
        }
        Ok(change)
    }

    /// Band `b`'s result from its last completed block.
    pub fn latest(&self, b: usize) -> Option<BandOutput> {
        self.latest.get(b).copied().flatten()
    }

    /// General loudness envelope as a fraction of full scale, if configured.
    pub fn loudness(&self) -> Option<Q16> {
        self.loudness.as_ref().map(EnvelopeFollower::value)
    }

    /// Current preamp step.
    pub fn gain_step(&self) -> GainStep {
        self.auto_gain.step()
    }

    /// The gain controller.
    pub fn auto_gain(&self) -> &AutoGainController {
        &self.auto_gain
    }

    /// Band `b`'s flux detector.
    pub fn detector(&self, b: usize) -> Option<&SpectralFluxDetector<MAX_BINS, WINDOW>> {
        self.detectors.get(b)
    }

    /// Current DC bias estimate in ADC counts.
    pub fn dc_bias(&self) -> Q16 {
        self.dc.bias()
    }

    /// Scale from ADC counts to ±1.0.
    pub fn input_scale(&self) -> Q16 {
        self.input_scale
    }

    /// The shared outputs.
    pub fn outputs(&self) -> &'a PipelineOutputs<BANDS> {
        self.outputs
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::{BandConfig, EnvelopeConfig};
    use std::vec::Vec;

    const SR: f32 = 8064.5;

    fn config() -> AnalysisConfig<2> {
        AnalysisConfig::new(
            SR,
            [BandConfig::new(100, 0.0, 80.0), BandConfig::new(100, 160.0, 250.0)],
        )
    }

    fn tone(t: usize, freq: f32, amplitude: f32) -> u16 {
        let phase = 2.0 * core::f32::consts::PI * freq * t as f32 / SR;
        libm::roundf(2048.0 + amplitude * libm::sinf(phase)) as u16
    }

    struct RecordingBus {
        sent: Vec<GainStep>,
        fail: bool,
    }

    impl GainBus for RecordingBus {
        type Error = ();

        fn transmit(&mut self, step: GainStep) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.sent.push(step);
            Ok(())
        }
    }

    #[test]
    fn rejects_band_over_capacity() {
        let outputs = PipelineOutputs::new();
        let mut cfg = config();
        cfg.bands[1] = BandConfig::new(100, 160.0, 800.0);
        let err = AnalysisPipeline::<2, 4>::new(&cfg, &outputs).err();
        assert_eq!(
            err,
            Some(ConfigError::Band {
                band: 1,
                source: BankError::TooManyBins {
                    required: 8,
                    capacity: 4
                }
            })
        );
    }

    #[test]
    fn rejects_invalid_config() {
        let outputs = PipelineOutputs::new();
        let mut cfg = config();
        cfg.adc_bits = 20;
        assert!(AnalysisPipeline::<2, 4>::new(&cfg, &outputs).is_err());
    }

    #[test]
    fn bands_publish_on_block_boundaries() {
        let outputs = PipelineOutputs::new();
        let mut p = AnalysisPipeline::<2, 4>::new(&config(), &outputs).unwrap();
        assert_eq!(p.detector(0).unwrap().bank().len(), 1);
        assert_eq!(p.detector(1).unwrap().bank().len(), 2);
        assert_eq!(p.input_scale(), Q16::from_bits(32));

        for t in 0..99 {
            p.on_sample(tone(t, 200.0, 1000.0));
        }
        assert_eq!(outputs.take_band(0), None);
        assert_eq!(p.latest(1), None);

        p.on_sample(tone(99, 200.0, 1000.0));
        let out = outputs.take_band(1).unwrap();
        assert_eq!(p.latest(1), Some(out));
        assert!(out.magnitude > Q16::ZERO);
        assert!(outputs.take_band(0).is_some());
        assert_eq!(outputs.take_band(1), None);
        assert_eq!(outputs.take_band(5), None);
    }

    #[test]
    fn quiet_start_raises_gain_once() {
        let outputs = PipelineOutputs::new();
        let mut p = AnalysisPipeline::<2, 4>::new(&config(), &outputs).unwrap();

        // Mid-scale input: the envelope starts below the low threshold
        assert_eq!(p.on_sample(2048), Some(GainStep::X4));
        assert_eq!(outputs.take_gain(), Some(GainStep::X4));
        assert_eq!(p.auto_gain().sw_gain(), Q16::from_f32(0.25));

        let hold_off = p.auto_gain().hold_off_samples() as usize;
        for _ in 0..hold_off {
            assert_eq!(p.on_sample(2048), None);
        }
        assert_eq!(p.on_sample(2048), Some(GainStep::X16));
        assert_eq!(p.gain_step(), GainStep::X16);
    }

    #[test]
    fn bus_receives_gain_changes() {
        let outputs = PipelineOutputs::new();
        let mut p = AnalysisPipeline::<2, 4>::new(&config(), &outputs).unwrap();
        let mut bus = RecordingBus {
            sent: Vec::new(),
            fail: false,
        };

        assert_eq!(p.on_sample_with_bus(2048, &mut bus), Ok(Some(GainStep::X4)));
        assert_eq!(p.on_sample_with_bus(2048, &mut bus), Ok(None));
        assert_eq!(bus.sent, [GainStep::X4]);
        // Delivered through the bus, so nothing is left for the foreground
        assert_eq!(outputs.take_gain(), None);
    }

    #[test]
    fn failed_bus_leaves_step_pending() {
        let outputs = PipelineOutputs::new();
        let mut p = AnalysisPipeline::<2, 4>::new(&config(), &outputs).unwrap();
        let mut bus = RecordingBus {
            sent: Vec::new(),
            fail: true,
        };
        assert_eq!(p.on_sample_with_bus(2048, &mut bus), Err(()));
        assert_eq!(outputs.take_gain(), Some(GainStep::X4));
    }

    #[test]
    fn readings_are_averaged() {
        let outputs = PipelineOutputs::new();
        let mut a = AnalysisPipeline::<2, 4>::new(&config(), &outputs).unwrap();
        let other = PipelineOutputs::new();
        let mut b = AnalysisPipeline::<2, 4>::new(&config(), &other).unwrap();

        for t in 0..300 {
            let s = tone(t, 200.0, 800.0);
            a.on_readings(&[s - 2, s + 2, s - 1, s + 1]);
            b.on_sample(s);
        }
        assert_eq!(a.latest(1), b.latest(1));
        assert_eq!(a.dc_bias(), b.dc_bias());
    }

    #[test]
    fn loudness_envelope_is_optional() {
        let outputs = PipelineOutputs::new();
        let mut p = AnalysisPipeline::<2, 4>::new(&config(), &outputs).unwrap();
        p.on_sample(3000);
        assert_eq!(p.loudness(), None);

        let mut cfg = config();
        cfg.loudness = Some(EnvelopeConfig {
            attack_ms: 0.0,
            release_ms: 50.0,
        });
        let mut p = AnalysisPipeline::<2, 4>::new(&cfg, &outputs).unwrap();
        p.on_sample(3000);
        // 3000 - 2048 counts, normalised by 1/2048
        assert_eq!(p.loudness(), Some(Q16::from_bits(952 * 32)));
    }

    #[test]
    fn clipped_input_steps_gain_down_to_min() {
        let outputs = PipelineOutputs::new();
        let mut cfg = config();
        cfg.gain.initial_step = GainStep::X1024;
        cfg.gain.hold_off_ms = 10.0;
        let mut p = AnalysisPipeline::<2, 4>::new(&cfg, &outputs).unwrap();

        // Rail-to-rail square wave
        let mut changes = Vec::new();
        for t in 0..2000 {
            let raw = if t % 2 == 0 { 0 } else { 4095 };
            if let Some(step) = p.on_sample(raw) {
                changes.push(step);
            }
        }
        assert_eq!(
            changes,
            [
                GainStep::X256,
                GainStep::X100,
                GainStep::X64,
                GainStep::X25,
                GainStep::X16,
                GainStep::X4,
                GainStep::X1,
            ]
        );
        assert_eq!(p.gain_step(), GainStep::MIN);
        assert!(p.auto_gain().envelope() > Q16::from_f32(0.9));
    }

    #[test]
    fn in_range_input_holds_gain() {
        let outputs = PipelineOutputs::new();
        let mut cfg = config();
        cfg.gain.initial_step = GainStep::X64;
        cfg.gain.hold_off_ms = 10.0;
        cfg.gain.envelope.attack_ms = 0.0;
        let mut p = AnalysisPipeline::<2, 4>::new(&cfg, &outputs).unwrap();

        // 100 of 2048 counts is about 0.05 of full scale, between the
        // thresholds. Start on a crest so the first decision already sees it.
        for t in 10..4010 {
            assert_eq!(p.on_sample(tone(t, 200.0, 100.0)), None, "sample {}", t);
        }
        assert_eq!(p.gain_step(), GainStep::X64);
    }

    #[test]
    fn mean_aggregation_scales_band() {
        let outputs = PipelineOutputs::new();
        let mut cfg = config();
        cfg.bands[1].aggregation = Aggregation::Mean;
        let mut p = AnalysisPipeline::<2, 4>::new(&cfg, &outputs).unwrap();
        for t in 0..100 {
            p.on_sample(tone(t, 200.0, 1000.0));
        }
        let bank = p.detector(1).unwrap().bank();
        assert_eq!(
            p.latest(1).unwrap().magnitude,
            bank.aggregate_magnitude() * Q16::HALF
        );
    }
}
