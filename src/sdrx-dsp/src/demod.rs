// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Per-mode demodulation pipelines and their dispatch.

mod am;
mod cw;
mod fm;
mod nbfm;
mod ssb;
mod stereo;
mod wbfm;

use sdrx_core::blocks::AudioBlock;
use sdrx_core::mode::{Mode, Scheme};

pub use self::am::AmPipeline;
pub use self::cw::{CwPipeline, DEFAULT_TONE_HZ};
pub use self::nbfm::NbfmPipeline;
pub use self::ssb::SsbPipeline;
pub use self::wbfm::WbfmPipeline;

/// The active demodulation pipeline for one scheme.
///
/// Closed set: adding a scheme means adding a variant and its constructor
/// arm here, which keeps dispatch explicit and free of global registries.
pub enum Pipeline {
    Wbfm(WbfmPipeline),
    Nbfm(NbfmPipeline),
    Am(AmPipeline),
    Ssb(SsbPipeline),
    Cw(CwPipeline),
}

impl Pipeline {
    /// Build a pipeline for `mode` converting `in_rate` I/Q to `out_rate`
    /// audio. `deemphasis_us` only affects WBFM.
    pub fn new(mode: &Mode, in_rate: u32, out_rate: u32, deemphasis_us: u32) -> Self {
        let mode = mode.clamped();
        match mode {
            Mode::WBFM { stereo } => {
                Pipeline::Wbfm(WbfmPipeline::new(in_rate, out_rate, stereo, deemphasis_us))
            }
            Mode::NBFM {
                max_deviation_hz, ..
            } => Pipeline::Nbfm(NbfmPipeline::new(in_rate, out_rate, max_deviation_hz)),
            Mode::AM { bandwidth_hz, .. } => {
                Pipeline::Am(AmPipeline::new(in_rate, out_rate, bandwidth_hz))
            }
            Mode::USB { bandwidth_hz, .. } => {
                Pipeline::Ssb(SsbPipeline::new(in_rate, out_rate, bandwidth_hz, true))
            }
            Mode::LSB { bandwidth_hz, .. } => {
                Pipeline::Ssb(SsbPipeline::new(in_rate, out_rate, bandwidth_hz, false))
            }
            Mode::CW { bandwidth_hz } => {
                Pipeline::Cw(CwPipeline::new(in_rate, out_rate, bandwidth_hz))
            }
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            Pipeline::Wbfm(_) => Scheme::WBFM,
            Pipeline::Nbfm(_) => Scheme::NBFM,
            Pipeline::Am(_) => Scheme::AM,
            Pipeline::Ssb(p) => {
                if p.upper() {
                    Scheme::USB
                } else {
                    Scheme::LSB
                }
            }
            Pipeline::Cw(_) => Scheme::CW,
        }
    }

    /// Demodulate one block. `freq_offset` selects the signal within the
    /// captured bandwidth.
    pub fn demodulate(&mut self, i: &[f32], q: &[f32], freq_offset: f64) -> AudioBlock {
        match self {
            Pipeline::Wbfm(p) => p.demodulate(i, q, freq_offset),
            Pipeline::Nbfm(p) => p.demodulate(i, q, freq_offset),
            Pipeline::Am(p) => p.demodulate(i, q, freq_offset),
            Pipeline::Ssb(p) => p.demodulate(i, q, freq_offset),
            Pipeline::Cw(p) => p.demodulate(i, q, freq_offset),
        }
    }

    /// Forward new parameters of the same scheme; kernels are recomputed
    /// where the bandwidth changed.
    pub fn update(&mut self, mode: &Mode) {
        let mode = mode.clamped();
        match self {
            Pipeline::Wbfm(p) => p.update(&mode),
            Pipeline::Nbfm(p) => p.update(&mode),
            Pipeline::Am(p) => p.update(&mode),
            Pipeline::Ssb(p) => p.update(&mode),
            Pipeline::Cw(p) => p.update(&mode),
        }
    }

    /// Hand a played audio block back for buffer reuse.
    pub fn recycle(&mut self, block: AudioBlock) {
        match self {
            Pipeline::Wbfm(p) => p.recycle(block),
            Pipeline::Nbfm(p) => p.recycle(block),
            Pipeline::Am(p) => p.recycle(block),
            Pipeline::Ssb(p) => p.recycle(block),
            Pipeline::Cw(p) => p.recycle(block),
        }
    }

    pub fn set_deemphasis_us(&mut self, deemphasis_us: u32) {
        if let Pipeline::Wbfm(p) = self {
            p.set_deemphasis_us(deemphasis_us);
        }
    }

    pub fn set_cw_tone_hz(&mut self, tone_hz: f64) {
        if let Pipeline::Cw(p) = self {
            p.set_tone_hz(tone_hz);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_scheme_dispatch() {
        for scheme in [
            Scheme::WBFM,
            Scheme::NBFM,
            Scheme::AM,
            Scheme::USB,
            Scheme::LSB,
            Scheme::CW,
        ] {
            let pipeline = Pipeline::new(&Mode::default_for(scheme), 1_024_000, 48_000, 50);
            assert_eq!(pipeline.scheme(), scheme);
        }
    }

    #[test]
    fn test_pipeline_length_law_across_modes() {
        let in_rate = 1_024_000;
        let out_rate = 48_000;
        let n = 65_536;
        let i = vec![0.0_f32; n];
        let q = vec![0.0_f32; n];
        let expect = n * out_rate as usize / in_rate as usize;
        for scheme in [
            Scheme::WBFM,
            Scheme::NBFM,
            Scheme::AM,
            Scheme::USB,
            Scheme::LSB,
            Scheme::CW,
        ] {
            let mut pipeline = Pipeline::new(&Mode::default_for(scheme), in_rate, out_rate, 50);
            let audio = pipeline.demodulate(&i, &q, 0.0);
            assert_eq!(audio.left.len(), expect, "length law broken for {scheme}");
            assert_eq!(audio.right.len(), expect);
            pipeline.recycle(audio);
        }
    }

    #[test]
    fn test_pipeline_silence_has_zero_snr() {
        let mut pipeline = Pipeline::new(&Mode::default_for(Scheme::AM), 96_000, 48_000, 50);
        let audio = pipeline.demodulate(&[0.0; 4096], &[0.0; 4096], 0.0);
        assert_eq!(audio.snr, 0.0);
    }
}
