// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed-cadence frame transmission.

use std::sync::Arc;
use std::time::Duration;

use crate::bus::SharedOutput;
use crate::engine::PeriodicTask;
use crate::error::BusError;
use crate::state::ChannelStore;

/// Default send period (about 33 frames per second).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(30);

/// Sends the current universe to the bus output.
///
/// This is the only component that triggers a physical send. It never
/// writes to the store.
#[derive(Clone)]
pub struct FrameTransmitter {
    store: Arc<ChannelStore>,
    output: SharedOutput,
}

impl std::fmt::Debug for FrameTransmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTransmitter").finish_non_exhaustive()
    }
}

impl FrameTransmitter {
    /// Creates a transmitter reading `store` and driving `output`.
    #[must_use]
    pub fn new(store: Arc<ChannelStore>, output: SharedOutput) -> Self {
        Self { store, output }
    }

    /// Snapshots the store and sends it.
    ///
    /// The store and output locks are taken one after the other, never
    /// together.
    ///
    /// # Errors
    ///
    /// Returns `BusError::LockTimeout` if either lock is busy, or the
    /// output's error if the send fails.
    pub fn tick(&self) -> Result<(), BusError> {
        let frame = self.store.snapshot()?;
        let timeout = self.store.timeouts().write;
        self.output.with(timeout, |out| {
            out.write_frame(&frame)?;
            out.send()
        })?
    }

    /// Starts sending every `period` on a thread named `dmx-transmitter`.
    ///
    /// A failing output is reported once when it starts failing and once
    /// when it recovers.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self, period: Duration) -> std::io::Result<PeriodicTask> {
        let mut failing = false;
        PeriodicTask::spawn("dmx-transmitter", period, move |_| match self.tick() {
            Ok(()) if failing => {
                failing = false;
                tracing::info!("DMX output recovered");
            }
            Ok(()) => {}
            Err(e) if !failing => {
                failing = true;
                tracing::warn!(error = %e, "DMX frame send failed");
            }
            Err(e) => tracing::debug!(error = %e, "DMX frame send still failing"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{DmxOutput, MemoryOutput, shared};
    use crate::types::{UNIVERSE_SIZE, Universe};

    #[test]
    fn tick_sends_current_snapshot() {
        let output = MemoryOutput::new();
        let store = Arc::new(ChannelStore::new());
        store.set_immediate(512, 9).unwrap();

        let transmitter = FrameTransmitter::new(Arc::clone(&store), shared(output.clone()));
        transmitter.tick().unwrap();
        transmitter.tick().unwrap();

        let sent = output.last_sent().unwrap();
        assert_eq!(sent[UNIVERSE_SIZE - 1], 9);
        assert_eq!(output.frames_sent(), 2);
    }

    struct BrokenOutput;

    impl DmxOutput for BrokenOutput {
        fn write_frame(&mut self, _frame: &Universe) -> Result<(), BusError> {
            Ok(())
        }

        fn send(&mut self) -> Result<(), BusError> {
            Err(std::io::Error::other("unplugged").into())
        }
    }

    #[test]
    fn output_errors_surface() {
        let transmitter = FrameTransmitter::new(Arc::new(ChannelStore::new()), shared(BrokenOutput));
        assert!(matches!(transmitter.tick(), Err(BusError::Io(_))));
    }

    #[test]
    fn spawned_transmitter_keeps_sending() {
        let output = MemoryOutput::new();
        let transmitter = FrameTransmitter::new(Arc::new(ChannelStore::new()), shared(output.clone()));
        let task = transmitter.spawn(Duration::from_millis(2)).unwrap();
        std::thread::sleep(Duration::from_millis(40));
        drop(task);
        assert!(output.frames_sent() >= 2);
    }
}
