// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Tuner abstraction.
//!
//! Every control operation and the block read may suspend; they return boxed
//! futures so implementations stay object-safe. Pure getters are synchronous
//! and infallible.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::blocks::RawBlock;
use crate::DynResult;

/// Boxed future returned by tuner operations.
pub type TunerFuture<'a, T> = Pin<Box<dyn Future<Output = DynResult<T>> + Send + 'a>>;

/// Tuner gain setting. `Auto` is the explicit "no value" marker for the
/// hardware AGC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gain {
    Auto,
    Db(f32),
}

/// Direct-sampling mixer bypass selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectSampling {
    Off,
    IChannel,
    QChannel,
}

/// Frequencies below this use direct sampling when a channel is configured.
pub const DIRECT_SAMPLING_LIMIT_HZ: f64 = 29_000_000.0;

/// Contract between the receiver core and a tuner device.
///
/// `reset_buffer` must be invoked once before the first `read_samples`.
/// `read_samples` lengths should be a multiple of 512; a fulfilled read
/// carries exactly `2 * length` interleaved `(I, Q)` bytes.
pub trait Tuner: Send {
    fn set_sample_rate<'a>(&'a mut self, hz: u32) -> TunerFuture<'a, u32>;

    fn set_center_frequency<'a>(&'a mut self, hz: f64) -> TunerFuture<'a, f64>;

    fn set_frequency_correction_ppm<'a>(&'a mut self, ppm: i32) -> TunerFuture<'a, ()>;

    fn set_gain<'a>(&'a mut self, gain: Gain) -> TunerFuture<'a, ()>;

    fn gain(&self) -> Gain;

    fn set_direct_sampling<'a>(&'a mut self, method: DirectSampling) -> TunerFuture<'a, ()>;

    fn direct_sampling(&self) -> DirectSampling;

    fn enable_bias_tee<'a>(&'a mut self, enabled: bool) -> TunerFuture<'a, ()>;

    fn bias_tee(&self) -> bool;

    fn reset_buffer<'a>(&'a mut self) -> TunerFuture<'a, ()>;

    fn read_samples<'a>(&'a mut self, length: usize) -> TunerFuture<'a, RawBlock>;

    fn close<'a>(&'a mut self) -> TunerFuture<'a, ()>;
}
