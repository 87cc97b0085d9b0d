// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `udp2dmx` gateway.
//!
//! Every failure in the command path is a typed value: the decoder, the
//! executor and the channel store never panic on bad input. Callers log the
//! error and drop the offending packet, since UDP commands are never
//! acknowledged.

use thiserror::Error;

use crate::command::CommandType;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A decoded command could not be applied.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// A text datagram could not be decoded into a command.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The gateway configuration is unreadable or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The physical bus output failed.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// A socket or thread operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A datagram matched neither the full-universe nor the text format.
    #[error("unrecognized packet of {len} bytes")]
    InvalidPacket {
        /// Length of the rejected datagram.
        len: usize,
    },
}

/// Failures while applying a command to the channel store.
///
/// This is the complete taxonomy seen by the command path. Each variant
/// aborts only the command that produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The channel span does not fit inside the universe.
    #[error("channel {channel} cannot address {width} slot(s)")]
    InvalidChannel {
        /// The requested start channel (1-based).
        channel: i32,
        /// Number of contiguous slots the command needs.
        width: usize,
    },

    /// A packed value lies outside its numeric envelope.
    #[error("value {value} is not valid for {command} commands")]
    InvalidValue {
        /// The command type carrying the value.
        command: CommandType,
        /// The raw decimal value.
        value: i32,
    },

    /// The color-temperature range for a channel pair is empty or inverted.
    #[error("no usable color temperature range for channel {channel}")]
    ConfigMissing {
        /// The first channel of the pair.
        channel: u16,
    },

    /// The channel store could not be locked in time.
    #[error(transparent)]
    LockTimeout(#[from] LockTimeout),
}

/// A guarded resource could not be acquired within its timeout.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("timed out after {timeout_ms} ms waiting for {resource}")]
pub struct LockTimeout {
    /// Name of the guarded resource.
    pub resource: &'static str,
    /// The timeout that elapsed.
    pub timeout_ms: u64,
}

/// Reasons a text datagram is not a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than four characters.
    #[error("command too short ({0} bytes)")]
    TooShort(usize),

    /// The text does not start with the `DMX` marker.
    #[error("missing DMX marker")]
    BadMarker,

    /// The type letter is not one of `C`, `P`, `R`, `W`, `L`.
    #[error("unknown command type '{0}'")]
    UnknownType(char),

    /// No `#`-separated value follows the channel.
    #[error("missing value field")]
    MissingValue,

    /// The datagram is not valid UTF-8.
    #[error("command is not valid UTF-8")]
    NotUtf8,
}

/// Errors related to loading and validating the gateway configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid JSON for the expected shape.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value outside its allowed range.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Description of the constraint that failed.
        message: String,
    },
}

/// Errors raised by a physical bus output.
#[derive(Debug, Error)]
pub enum BusError {
    /// Writing to the device failed.
    #[error("bus I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The serial port could not be opened or configured.
    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The output is held by another task.
    #[error(transparent)]
    LockTimeout(#[from] LockTimeout),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
