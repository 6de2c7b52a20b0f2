//! End-to-end tests driving the whole analysis chain in software.
//!
//! Synthetic 12-bit ADC readings go in through
//! [`AnalysisPipeline::on_sample`], results come out of the
//! [`PipelineOutputs`] mailboxes the way the foreground loop would read them:
//!
//! ```text
//! tone generator → on_sample() → [band mailboxes] → take_band()
//! ```

#[cfg(test)]
mod tests {
    extern crate std;

    use crate::config::{AnalysisConfig, BandConfig};
    use crate::dsp::{BinTuning, Q16};
    use crate::gain::GainStep;
    use crate::pipeline::{AnalysisPipeline, BandOutput, PipelineOutputs};
    use std::vec::Vec;

    const SR: f32 = 8064.5;
    const BLOCK: usize = 100;

    fn two_band_config() -> AnalysisConfig<2> {
        AnalysisConfig::new(
            SR,
            [
                BandConfig::new(BLOCK as u16, 0.0, 80.0),
                BandConfig::new(BLOCK as u16, 160.0, 250.0),
            ],
        )
    }

    /// Full-scale 12-bit reading of a sinusoid around mid-scale.
    fn full_scale(freq: f32, t: usize) -> u16 {
        let phase = 2.0 * core::f32::consts::PI * freq * t as f32 / SR;
        libm::roundf(2048.0 + 2047.0 * libm::sinf(phase)) as u16
    }

    /// Feed `samples` and collect each band's published output per block.
    fn drive(
        pipeline: &mut AnalysisPipeline<'_, 2, 4>,
        outputs: &PipelineOutputs<2>,
        samples: impl Iterator<Item = u16>,
    ) -> [Vec<BandOutput>; 2] {
        let mut blocks = [Vec::new(), Vec::new()];
        for raw in samples {
            pipeline.on_sample(raw);
            for (b, list) in blocks.iter_mut().enumerate() {
                if let Some(out) = outputs.take_band(b) {
                    list.push(out);
                }
            }
        }
        blocks
    }

    // ---------------------------------------------------------------
    // 200 Hz full-scale tone into a bass band and a low-mid band
    // ---------------------------------------------------------------
    #[test]
    fn tone_lands_in_its_band() {
        let outputs = PipelineOutputs::new();
        let mut p = AnalysisPipeline::<2, 4>::new(&two_band_config(), &outputs).unwrap();

        let half_second = (SR * 0.5) as usize;
        let [bass, low_mid] = drive(&mut p, &outputs, (0..half_second).map(|t| full_scale(200.0, t)));

        assert_eq!(bass.len(), half_second / BLOCK);
        assert_eq!(low_mid.len(), half_second / BLOCK);

        // Already separated after the first completed block
        assert!(bass[0].magnitude < Q16::from_f32(0.05), "bass {}", bass[0].magnitude.to_f32());
        assert!(low_mid[0].magnitude > Q16::from_f32(0.12), "low-mid {}", low_mid[0].magnitude.to_f32());

        for (i, (b, m)) in bass.iter().zip(low_mid.iter()).enumerate() {
            assert!(b.magnitude < Q16::from_f32(0.05), "block {}: bass {}", i, b.magnitude.to_f32());
            assert!(
                m.magnitude > b.magnitude + b.magnitude + b.magnitude,
                "block {}: low-mid {} vs bass {}",
                i,
                m.magnitude.to_f32(),
                b.magnitude.to_f32()
            );
        }
    }

    #[test]
    fn gain_steps_once_then_holds() {
        let outputs = PipelineOutputs::new();
        let mut p = AnalysisPipeline::<2, 4>::new(&two_band_config(), &outputs).unwrap();

        // The envelope starts at zero, so the first tick raises the gain; the
        // hold-off (one second) outlasts the half-second tone.
        let mut changes = Vec::new();
        for t in 0..(SR * 0.5) as usize {
            if let Some(step) = p.on_sample(full_scale(200.0, t)) {
                changes.push((t, step));
            }
        }
        assert_eq!(changes, [(0, GainStep::X4)]);
        assert_eq!(outputs.take_gain(), Some(GainStep::X4));
        assert!(p.auto_gain().envelope() > Q16::from_f32(0.5));
    }

    // ---------------------------------------------------------------
    // Silence, then a tone: one onset two blocks after the attack
    // ---------------------------------------------------------------
    #[test]
    fn tone_attack_is_an_onset() {
        let outputs = PipelineOutputs::new();
        let mut p = AnalysisPipeline::<2, 4>::new(&two_band_config(), &outputs).unwrap();

        let silent = 10 * BLOCK;
        let samples = (0..30 * BLOCK).map(|t| {
            if t < silent {
                2048
            } else {
                full_scale(200.0, t - silent)
            }
        });
        let [_, low_mid] = drive(&mut p, &outputs, samples);
        assert_eq!(low_mid.len(), 30);

        for out in &low_mid[..10] {
            assert_eq!(out.magnitude, Q16::ZERO);
            assert_eq!(out.flux, Q16::ZERO);
        }

        // Block 10 is the first with the tone: the flux jump
        let jump = low_mid[10];
        assert!(jump.flux > Q16::from_f32(0.3), "flux {}", jump.flux.to_f32());
        assert!(low_mid[11..].iter().all(|o| o.flux < jump.flux));

        assert!(!low_mid[10].onset);
        assert!(!low_mid[11].onset);
        assert!(low_mid[12].onset);
        assert!(!low_mid[13].onset);
        assert!(!low_mid[14].onset);
    }

    // ---------------------------------------------------------------
    // Firmware tuning: bins resonate at half their nominal frequency
    // ---------------------------------------------------------------
    #[test]
    fn half_rate_tuning_shifts_response_down() {
        let mut cfg = two_band_config();
        for band in cfg.bands.iter_mut() {
            band.tuning = BinTuning::HalfRate;
        }
        let outputs = PipelineOutputs::new();
        let mut p = AnalysisPipeline::<2, 4>::new(&cfg, &outputs).unwrap();

        // 100 Hz excites the HalfRate bin nominally at 200 Hz
        let [_, low_mid] = drive(&mut p, &outputs, (0..4 * BLOCK).map(|t| full_scale(100.0, t)));
        let exact_outputs = PipelineOutputs::new();
        let mut exact = AnalysisPipeline::<2, 4>::new(&two_band_config(), &exact_outputs).unwrap();
        let [_, exact_mid] = drive(
            &mut exact,
            &exact_outputs,
            (0..4 * BLOCK).map(|t| full_scale(100.0, t)),
        );

        assert!(low_mid[3].magnitude > exact_mid[3].magnitude);
    }

    #[test]
    fn firmware_defaults_build() {
        let outputs = PipelineOutputs::new();
        let cfg = AnalysisConfig::default();
        let mut p = AnalysisPipeline::<3, 8>::new(&cfg, &outputs).unwrap();
        let sizes: Vec<usize> = (0..3).map(|b| p.detector(b).unwrap().bank().len()).collect();
        assert_eq!(sizes, [1, 2, 6]);

        for _ in 0..200 {
            p.on_sample(2048);
        }
        for b in 0..3 {
            assert_eq!(outputs.take_band(b).map(|o| o.magnitude), Some(Q16::ZERO));
        }
    }
}
