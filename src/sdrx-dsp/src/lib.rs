// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Signal-processing core of the sdrx receiver.
//!
//! Raw I/Q from a tuner flows through the source adapter, the active
//! per-mode demodulation pipeline, and the squelch gate out to an audio
//! sink. See [`controller::DemodController`] for the orchestration and
//! [`demod::Pipeline`] for the mode pipelines.

pub mod buffers;
pub mod coeffs;
pub mod controller;
pub mod demod;
pub mod dsp;
pub mod source;

pub use controller::DemodController;
pub use demod::Pipeline;
pub use source::{ReceiverPipeline, SampleGenerator, SampleSource, SimulatedTuner};
