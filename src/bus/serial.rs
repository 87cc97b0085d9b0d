// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! DMX-512 over a serial RS-485 adapter.

use std::io::Write;
use std::thread;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::bus::DmxOutput;
use crate::error::BusError;
use crate::types::{UNIVERSE_SIZE, Universe};

/// DMX line rate.
pub const BAUD_RATE: u32 = 250_000;

/// Break length; the standard minimum is 88 µs.
const BREAK: Duration = Duration::from_micros(110);

/// Mark-after-break length; the standard minimum is 8 µs.
const MARK_AFTER_BREAK: Duration = Duration::from_micros(16);

/// Null start code for dimmer data.
const START_CODE: u8 = 0x00;

const PACKET_LEN: usize = UNIVERSE_SIZE + 1;

/// A DMX transmitter on a serial port (250 kBd, 8N2).
///
/// Each [`DmxOutput::send`] emits a break, a mark-after-break, the start code
/// and all 512 channel bytes.
pub struct SerialDmxOutput {
    port: Box<dyn SerialPort>,
    packet: [u8; PACKET_LEN],
}

impl std::fmt::Debug for SerialDmxOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDmxOutput")
            .field("port", &self.port.name())
            .finish_non_exhaustive()
    }
}

impl SerialDmxOutput {
    /// Opens and configures the serial device at `path`.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Serial` if the port cannot be opened or configured.
    pub fn open(path: &str) -> Result<Self, BusError> {
        let port = serialport::new(path, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::Two)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(50))
            .open()?;
        tracing::info!(port = path, baud = BAUD_RATE, "DMX serial output opened");

        Ok(Self {
            port,
            packet: [START_CODE; PACKET_LEN],
        })
    }
}

fn stage(packet: &mut [u8; PACKET_LEN], frame: &Universe) {
    packet[0] = START_CODE;
    packet[1..].copy_from_slice(frame);
}

impl DmxOutput for SerialDmxOutput {
    fn write_frame(&mut self, frame: &Universe) -> Result<(), BusError> {
        stage(&mut self.packet, frame);
        Ok(())
    }

    fn send(&mut self) -> Result<(), BusError> {
        self.port.set_break()?;
        thread::sleep(BREAK);
        self.port.clear_break()?;
        thread::sleep(MARK_AFTER_BREAK);
        self.port.write_all(&self.packet)?;
        self.port.flush()?;
        Ok(())
    }
}
