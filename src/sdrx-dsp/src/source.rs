// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Source adapter: turns tuner byte blocks into normalised float I/Q, and
//! drives the receive loop.
//!
//! The loop runs as two tasks joined by a two-slot channel: the reader owns
//! the tuner and always keeps a read outstanding while the demodulation task
//! consumes the previous block. Spent float buffers travel back over a
//! recycle channel so steady-state operation does not allocate.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use sdrx_core::blocks::{byte_to_level, level_to_byte, IqBlock, RawBlock};
use sdrx_core::events::{EventHub, RadioEvent, RadioState};
use sdrx_core::sink::AudioSink;
use sdrx_core::tuner::{DirectSampling, Gain, Tuner, TunerFuture, DIRECT_SAMPLING_LIMIT_HZ};
use sdrx_core::DynResult;

use crate::buffers::BufferPool;
use crate::controller::DemodController;

/// Read lengths are rounded up to a multiple of this many samples.
pub const READ_QUANTUM: usize = 512;

// ---------------------------------------------------------------------------
// Source adapter
// ---------------------------------------------------------------------------

/// Owns the tuner connection and exposes a uniform block-reading interface.
pub struct SampleSource {
    tuner: Box<dyn Tuner>,
    events: EventHub,
    pool: BufferPool<f32>,
    block_length: usize,
    direct_sampling_active: bool,
}

impl SampleSource {
    pub fn new(tuner: Box<dyn Tuner>, events: EventHub, block_length: usize) -> Self {
        let blocks = block_length.max(1).div_ceil(READ_QUANTUM);
        Self {
            tuner,
            events,
            pool: BufferPool::new(8),
            block_length: blocks * READ_QUANTUM,
            direct_sampling_active: false,
        }
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub fn block_length(&self) -> usize {
        self.block_length
    }

    /// Pre-start access to the tuner, for rate/frequency/gain setup.
    pub fn tuner_mut(&mut self) -> &mut dyn Tuner {
        self.tuner.as_mut()
    }

    /// Must run once before the first read.
    pub async fn prepare(&mut self) -> DynResult<()> {
        self.tuner.reset_buffer().await
    }

    /// Read one block and convert it to normalised float I/Q.
    pub async fn read_block(&mut self) -> DynResult<IqBlock> {
        let read = self.tuner.read_samples(self.block_length).await?;
        let n = read.bytes.len() / 2;
        let mut i = self.pool.acquire(n);
        let mut q = self.pool.acquire(n);
        for (k, pair) in read.bytes.chunks_exact(2).enumerate() {
            i[k] = byte_to_level(pair[0]);
            q[k] = byte_to_level(pair[1]);
        }

        if read.direct_sampling != self.direct_sampling_active {
            self.direct_sampling_active = read.direct_sampling;
            self.events.emit(RadioEvent::State(RadioState::DirectSampling(
                read.direct_sampling,
            )));
        }

        Ok(IqBlock {
            i,
            q,
            center_frequency_hz: read.center_frequency_hz,
        })
    }

    /// Return the float buffers of a consumed block to the pool.
    pub fn recycle(&mut self, i: Vec<f32>, q: Vec<f32>) {
        self.pool.release(i);
        self.pool.release(q);
    }

    pub async fn close(&mut self) -> DynResult<()> {
        self.tuner.close().await
    }
}

// ---------------------------------------------------------------------------
// Receive loop
// ---------------------------------------------------------------------------

/// Handle to the running reader/demodulator task pair.
pub struct ReceiverPipeline {
    stop_tx: watch::Sender<bool>,
    read_task: JoinHandle<()>,
    demod_task: JoinHandle<()>,
}

impl ReceiverPipeline {
    /// Spawn the receive loop. The controller stays shared so mode and
    /// offset changes apply between blocks.
    pub fn start<S: AudioSink + 'static>(
        mut source: SampleSource,
        controller: Arc<Mutex<DemodController<S>>>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (block_tx, mut block_rx) = mpsc::channel::<IqBlock>(2);
        let (recycle_tx, mut recycle_rx) = mpsc::channel::<(Vec<f32>, Vec<f32>)>(4);

        let read_stop = stop_rx.clone();
        let read_task = tokio::spawn(async move {
            let events = source.events().clone();
            events.emit(RadioEvent::State(RadioState::Starting));
            if let Err(e) = source.prepare().await {
                tracing::warn!("tuner buffer reset failed: {e}");
                events.emit(RadioEvent::State(RadioState::Error(e.to_string())));
                return;
            }
            loop {
                if *read_stop.borrow() {
                    break;
                }
                while let Ok((i, q)) = recycle_rx.try_recv() {
                    source.recycle(i, q);
                }
                match source.read_block().await {
                    Ok(block) => {
                        if block_tx.send(block).await.is_err() {
                            // Demodulation side ended (fatal sink error).
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("sample read failed: {e}");
                        events.emit(RadioEvent::State(RadioState::Error(e.to_string())));
                        break;
                    }
                }
            }
            events.emit(RadioEvent::State(RadioState::Stopping));
            if let Err(e) = source.close().await {
                tracing::warn!("tuner close failed: {e}");
            }
        });

        let demod_stop = stop_rx;
        let demod_task = tokio::spawn(async move {
            while let Some(block) = block_rx.recv().await {
                if *demod_stop.borrow() {
                    // Resolved in-flight reads after stop are discarded.
                    continue;
                }
                let result = {
                    let mut controller = controller.lock().expect("controller mutex poisoned");
                    controller.receive(&block.i, &block.q, block.center_frequency_hz)
                };
                if let Err(e) = result {
                    tracing::error!("demodulation stopped: {e}");
                    break;
                }
                let _ = recycle_tx.try_send((block.i, block.q));
            }
        });

        Self {
            stop_tx,
            read_task,
            demod_task,
        }
    }

    /// Stop reading, let in-flight reads resolve, close the tuner last.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.read_task.await;
        let _ = self.demod_task.await;
    }
}

// ---------------------------------------------------------------------------
// Simulated tuner
// ---------------------------------------------------------------------------

/// Generator of synthetic baseband: `(center_hz, sample_rate, length)` →
/// equal-length I and Q sequences in `[-1, +1]`.
pub type SampleGenerator = Box<dyn FnMut(f64, u32, usize) -> (Vec<f32>, Vec<f32>) + Send>;

/// Tuner backed by a generator function instead of hardware.
///
/// Generated samples pass through gain emulation, hard clipping, and
/// requantisation to unsigned bytes, so the byte→float code path is exactly
/// the one real hardware exercises.
pub struct SimulatedTuner {
    generator: SampleGenerator,
    sample_rate: u32,
    center_frequency_hz: f64,
    ppm: i32,
    gain: Gain,
    direct_sampling: DirectSampling,
    /// Configured auto direct-sampling method, applied below 29 MHz.
    direct_sampling_method: Option<DirectSampling>,
    bias_tee: bool,
}

impl SimulatedTuner {
    pub fn new(sample_rate: u32, generator: SampleGenerator) -> Self {
        Self {
            generator,
            sample_rate,
            center_frequency_hz: 100_000_000.0,
            ppm: 0,
            gain: Gain::Auto,
            direct_sampling: DirectSampling::Off,
            direct_sampling_method: None,
            bias_tee: false,
        }
    }

    /// Enable the automatic direct-sampling policy with the given channel.
    pub fn with_direct_sampling_method(mut self, method: DirectSampling) -> Self {
        self.direct_sampling_method = Some(method);
        self
    }

    fn apply_direct_sampling_policy(&mut self) {
        if let Some(method) = self.direct_sampling_method {
            self.direct_sampling = if self.center_frequency_hz < DIRECT_SAMPLING_LIMIT_HZ {
                method
            } else {
                DirectSampling::Off
            };
        }
    }

    fn gain_multiplier(&self) -> f32 {
        match self.gain {
            Gain::Auto => 1.0,
            Gain::Db(db) => 10.0_f32.powf((db - 25.0) / 20.0),
        }
    }
}

impl Tuner for SimulatedTuner {
    fn set_sample_rate<'a>(&'a mut self, hz: u32) -> TunerFuture<'a, u32> {
        Box::pin(async move {
            self.sample_rate = hz;
            Ok(hz)
        })
    }

    fn set_center_frequency<'a>(&'a mut self, hz: f64) -> TunerFuture<'a, f64> {
        Box::pin(async move {
            self.center_frequency_hz = hz;
            self.apply_direct_sampling_policy();
            tracing::debug!("simulated tuner centred at {hz:.0} Hz");
            Ok(hz)
        })
    }

    fn set_frequency_correction_ppm<'a>(&'a mut self, ppm: i32) -> TunerFuture<'a, ()> {
        Box::pin(async move {
            self.ppm = ppm;
            Ok(())
        })
    }

    fn set_gain<'a>(&'a mut self, gain: Gain) -> TunerFuture<'a, ()> {
        Box::pin(async move {
            self.gain = gain;
            Ok(())
        })
    }

    fn gain(&self) -> Gain {
        self.gain
    }

    fn set_direct_sampling<'a>(&'a mut self, method: DirectSampling) -> TunerFuture<'a, ()> {
        Box::pin(async move {
            self.direct_sampling = method;
            Ok(())
        })
    }

    fn direct_sampling(&self) -> DirectSampling {
        self.direct_sampling
    }

    fn enable_bias_tee<'a>(&'a mut self, enabled: bool) -> TunerFuture<'a, ()> {
        Box::pin(async move {
            self.bias_tee = enabled;
            Ok(())
        })
    }

    fn bias_tee(&self) -> bool {
        self.bias_tee
    }

    fn reset_buffer<'a>(&'a mut self) -> TunerFuture<'a, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn read_samples<'a>(&'a mut self, length: usize) -> TunerFuture<'a, RawBlock> {
        Box::pin(async move {
            let effective_center =
                self.center_frequency_hz * (1.0 + self.ppm as f64 / 1_000_000.0);
            let (i, q) = (self.generator)(effective_center, self.sample_rate, length);
            debug_assert_eq!(i.len(), length);
            debug_assert_eq!(q.len(), length);

            let mul = self.gain_multiplier();
            let mut bytes = Vec::with_capacity(2 * length);
            for (si, sq) in i.iter().zip(q.iter()) {
                bytes.push(level_to_byte(si * mul));
                bytes.push(level_to_byte(sq * mul));
            }

            Ok(RawBlock {
                bytes,
                center_frequency_hz: self.center_frequency_hz,
                direct_sampling: self.direct_sampling != DirectSampling::Off,
            })
        })
    }

    fn close<'a>(&'a mut self) -> TunerFuture<'a, ()> {
        Box::pin(async move { Ok(()) })
    }
}
