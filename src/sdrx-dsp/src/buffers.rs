// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Buffer recycling.
//!
//! Every pipeline stage owns its own [`BufferPool`]; stages acquire scratch
//! buffers on entry and release them on exit, so steady-state block
//! processing does not allocate. Pools are deliberately not thread-safe.

use std::collections::VecDeque;

/// Bounded FIFO of reusable arrays keyed by requested length.
#[derive(Debug)]
pub struct BufferPool<T> {
    slots: VecDeque<Vec<T>>,
    max_slots: usize,
}

impl<T: Clone + Default> BufferPool<T> {
    pub fn new(max_slots: usize) -> Self {
        Self {
            slots: VecDeque::with_capacity(max_slots.max(1)),
            max_slots: max_slots.max(1),
        }
    }

    /// Return the oldest pooled array of exactly `len` elements, or a fresh
    /// zeroed allocation when none matches.
    pub fn acquire(&mut self, len: usize) -> Vec<T> {
        if let Some(pos) = self.slots.iter().position(|buf| buf.len() == len) {
            return self.slots.remove(pos).expect("position came from iter");
        }
        vec![T::default(); len]
    }

    /// Hand a buffer back. When the pool is full the oldest entry is evicted.
    pub fn release(&mut self, buf: Vec<T>) {
        if self.slots.len() == self.max_slots {
            self.slots.pop_front();
        }
        self.slots.push_back(buf);
    }

    pub fn pooled(&self) -> usize {
        self.slots.len()
    }
}

impl<T: Clone + Default> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new(8)
    }
}

/// Fixed-capacity circular store of real samples. On overflow the oldest
/// data is overwritten.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f32>,
    pos: usize,
    filled: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity.max(1)],
            pos: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of samples stored so far, saturating at the capacity.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn push(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.data[self.pos] = sample;
            self.pos = (self.pos + 1) % self.data.len();
        }
        self.filled = (self.filled + samples.len()).min(self.data.len());
    }

    /// Copy the most recent `out.len()` samples into `out`, oldest first.
    /// Positions not yet written read as zero.
    pub fn copy_tail(&self, out: &mut [f32]) {
        let n = out.len().min(self.data.len());
        let cap = self.data.len();
        let start = (self.pos + cap - n) % cap;
        for (k, slot) in out.iter_mut().take(n).enumerate() {
            *slot = self.data[(start + k) % cap];
        }
    }

    /// Mean of the most recent `window` samples.
    pub fn tail_mean(&self, window: usize) -> f32 {
        let n = window.min(self.data.len()).max(1);
        let cap = self.data.len();
        let start = (self.pos + cap - n) % cap;
        let mut sum = 0.0;
        for k in 0..n {
            sum += self.data[(start + k) % cap];
        }
        sum / n as f32
    }
}
