// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Observability events raised by the receiver.
//!
//! Events fan out over a `tokio::sync::broadcast` channel; emitting never
//! blocks and silently drops when nobody is subscribed.

use serde::Serialize;
use tokio::sync::broadcast;

/// Lifecycle state of the source adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RadioState {
    Starting,
    Stopping,
    /// Direct sampling became active (below the tuner's mixer range) or
    /// inactive again.
    DirectSampling(bool),
    /// A device error stopped the pipeline. Carries the causing error text.
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RadioEvent {
    /// The stereo flag of the last emitted audio block changed.
    StereoStatus(bool),
    State(RadioState),
    /// Periodic tick from a counting sink, for UI refresh.
    SampleClick,
}

/// Owner of the event broadcast channel.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<RadioEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RadioEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: RadioEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_subscribers() {
        let hub = EventHub::new(8);
        let mut rx = hub.subscribe();
        hub.emit(RadioEvent::State(RadioState::Starting));
        hub.emit(RadioEvent::StereoStatus(true));
        assert_eq!(
            rx.try_recv().unwrap(),
            RadioEvent::State(RadioState::Starting)
        );
        assert_eq!(rx.try_recv().unwrap(), RadioEvent::StereoStatus(true));
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let hub = EventHub::new(8);
        hub.emit(RadioEvent::SampleClick);
    }
}
