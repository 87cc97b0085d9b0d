// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Physical bus outputs.
//!
//! The gateway drives the bus through [`DmxOutput`], a two-step interface:
//! [`DmxOutput::write_frame`] stages a full universe and [`DmxOutput::send`]
//! puts the staged frame on the wire. The fade scheduler stages frames when
//! values move; the frame transmitter owns the send cadence.
//!
//! Two outputs are provided:
//!
//! - [`MemoryOutput`] keeps frames in memory, for tests and for running
//!   without hardware
//! - `SerialDmxOutput` (feature `serial`) drives an RS-485 adapter
//!
//! # Examples
//!
//! ```
//! use udp2dmx::bus::{DmxOutput, MemoryOutput};
//! use udp2dmx::types::UNIVERSE_SIZE;
//!
//! let output = MemoryOutput::new();
//! let mut writer = output.clone();
//!
//! let mut frame = [0_u8; UNIVERSE_SIZE];
//! frame[0] = 255;
//! writer.write_frame(&frame).unwrap();
//! writer.send().unwrap();
//!
//! assert_eq!(output.last_sent().map(|f| f[0]), Some(255));
//! assert_eq!(output.frames_sent(), 1);
//! ```

#[cfg(feature = "serial")]
mod serial;

#[cfg(feature = "serial")]
pub use serial::SerialDmxOutput;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::BusError;
use crate::state::Guarded;
use crate::types::{UNIVERSE_SIZE, Universe};

/// A device that transmits DMX frames.
pub trait DmxOutput: Send {
    /// Stages a full frame for the next [`DmxOutput::send`].
    ///
    /// # Errors
    ///
    /// Returns an error if the device rejects the frame.
    fn write_frame(&mut self, frame: &Universe) -> Result<(), BusError>;

    /// Transmits the staged frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the transmission fails.
    fn send(&mut self) -> Result<(), BusError>;
}

impl<T: DmxOutput + ?Sized> DmxOutput for Box<T> {
    fn write_frame(&mut self, frame: &Universe) -> Result<(), BusError> {
        (**self).write_frame(frame)
    }

    fn send(&mut self) -> Result<(), BusError> {
        (**self).send()
    }
}

/// An output shared between the scheduler and the transmitter.
pub type SharedOutput = Arc<Guarded<Box<dyn DmxOutput>>>;

/// Wraps an output for sharing between tasks.
#[must_use]
pub fn shared(output: impl DmxOutput + 'static) -> SharedOutput {
    let output: Box<dyn DmxOutput> = Box::new(output);
    Arc::new(Guarded::new("bus output", output))
}

#[derive(Debug, Default)]
struct Frames {
    staged: Option<Universe>,
    sent: Option<Universe>,
    written: u64,
    sends: u64,
}

/// An in-memory output.
///
/// Clones share the same frames, so a test can keep one handle and give
/// another to the gateway.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    frames: Arc<Mutex<Frames>>,
}

impl MemoryOutput {
    /// Creates an output with nothing staged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently staged frame.
    #[must_use]
    pub fn staged(&self) -> Option<Universe> {
        self.frames.lock().staged
    }

    /// The frame put on the wire by the last send.
    #[must_use]
    pub fn last_sent(&self) -> Option<Universe> {
        self.frames.lock().sent
    }

    /// Number of frames staged so far.
    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.frames.lock().written
    }

    /// Number of sends so far.
    #[must_use]
    pub fn frames_sent(&self) -> u64 {
        self.frames.lock().sends
    }
}

impl DmxOutput for MemoryOutput {
    fn write_frame(&mut self, frame: &Universe) -> Result<(), BusError> {
        let mut frames = self.frames.lock();
        frames.staged = Some(*frame);
        frames.written += 1;
        Ok(())
    }

    fn send(&mut self) -> Result<(), BusError> {
        let mut frames = self.frames.lock();
        // an unstaged bus idles dark
        frames.sent = Some(frames.staged.unwrap_or([0; UNIVERSE_SIZE]));
        frames.sends += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn send_without_staging_is_dark() {
        let output = MemoryOutput::new();
        output.clone().send().unwrap();
        assert_eq!(output.last_sent(), Some([0; UNIVERSE_SIZE]));
        assert_eq!(output.staged(), None);
        assert_eq!(output.frames_written(), 0);
    }

    #[test]
    fn send_repeats_last_staged_frame() {
        let output = MemoryOutput::new();
        let mut writer = output.clone();
        let frame = [42; UNIVERSE_SIZE];
        writer.write_frame(&frame).unwrap();
        writer.send().unwrap();
        writer.send().unwrap();
        assert_eq!(output.last_sent(), Some(frame));
        assert_eq!(output.frames_written(), 1);
        assert_eq!(output.frames_sent(), 2);
    }

    #[test]
    fn shared_output_forwards_through_box() {
        let output = MemoryOutput::new();
        let bus = shared(output.clone());
        bus.with(Duration::from_millis(10), |out| out.write_frame(&[1; UNIVERSE_SIZE]))
            .unwrap()
            .unwrap();
        assert_eq!(output.staged(), Some([1; UNIVERSE_SIZE]));
        assert_eq!(bus.name(), "bus output");
    }
}
