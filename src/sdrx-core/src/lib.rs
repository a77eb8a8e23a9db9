// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod blocks;
pub mod error;
pub mod events;
pub mod mode;
pub mod sink;
pub mod tuner;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use blocks::{AudioBlock, IqBlock, RawBlock};
pub use error::RadioError;
pub use events::{EventHub, RadioEvent, RadioState};
pub use mode::{Mode, Scheme};
pub use sink::AudioSink;
pub use tuner::{DirectSampling, Gain, Tuner};
