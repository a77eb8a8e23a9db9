// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Audio sink contract and sink decorators.

use crate::error::RadioError;
use crate::events::{EventHub, RadioEvent};

/// Anything that accepts paired real-valued audio buffers at a fixed rate.
pub trait AudioSink: Send {
    /// Output sample rate (Hz). The pipeline downsamples to this rate.
    fn sample_rate(&self) -> u32;

    /// Play one block. `left` and `right` have equal lengths.
    fn play(&mut self, left: &[f32], right: &[f32]) -> Result<(), RadioError>;

    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;
}

/// Sink decorator that raises a [`RadioEvent::SampleClick`] after every
/// `⌊sample_rate / ticks_per_second⌋` accumulated samples.
pub struct ClickingSink<S> {
    inner: S,
    events: EventHub,
    interval: usize,
    accumulated: usize,
}

impl<S: AudioSink> ClickingSink<S> {
    pub fn new(inner: S, events: EventHub, ticks_per_second: u32) -> Self {
        let interval = (inner.sample_rate() / ticks_per_second.max(1)).max(1) as usize;
        Self {
            inner,
            events,
            interval,
            accumulated: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AudioSink> AudioSink for ClickingSink<S> {
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn play(&mut self, left: &[f32], right: &[f32]) -> Result<(), RadioError> {
        self.inner.play(left, right)?;
        self.accumulated += left.len();
        while self.accumulated >= self.interval {
            self.accumulated -= self.interval;
            self.events.emit(RadioEvent::SampleClick);
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.inner.set_volume(volume);
    }

    fn volume(&self) -> f32 {
        self.inner.volume()
    }
}

/// Discards all audio. Placeholder before a device sink attaches, and the
/// default sink in tests.
pub struct NullSink {
    sample_rate: u32,
    volume: f32,
}

impl NullSink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            volume: 1.0,
        }
    }
}

impl AudioSink for NullSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&mut self, _left: &[f32], _right: &[f32]) -> Result<(), RadioError> {
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }
}
