// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use thiserror::Error;

/// Error type surfaced by the receiver core.
///
/// Out-of-range mode parameters are deliberately absent: setters clamp
/// instead of failing.
#[derive(Debug, Clone, Error)]
pub enum RadioError {
    /// Tuner I/O failure, invalid handle, or disconnected device.
    #[error("device error: {0}")]
    Device(String),
    /// The requested mode tag does not name a known demodulation scheme.
    #[error("unknown demodulation scheme: {0}")]
    UnknownScheme(String),
    /// The audio sink refused a block; fatal for the current session.
    #[error("audio sink error: {0}")]
    Sink(String),
}
