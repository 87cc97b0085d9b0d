// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Text command protocol.
//!
//! A command is an ASCII string sent in a single UDP datagram:
//!
//! ```text
//! DMX <type> <channel> # <value> [ # <speed> ]
//! ```
//!
//! | Type | Purpose | Slots | Value |
//! |------|---------|-------|-------|
//! | `C` | Raw channel | 1 | 0-255 |
//! | `P` | Percentage | 1 | 0-100 |
//! | `R` | RGB | 3 | packed `BBBGGGRRR` |
//! | `W` | Tunable white | 2 | packed `WWWCCC` |
//! | `L` | Brightness + color temperature | 2 | packed `2BBBKKKK` |
//!
//! # Examples
//!
//! ```
//! use udp2dmx::command::{decode, CommandType};
//!
//! let cmd = decode("DMXR5#3066012#50").unwrap();
//! assert_eq!(cmd.command_type(), CommandType::Rgb);
//! assert_eq!(cmd.channel(), 5);
//! assert_eq!(cmd.speed().duration_ms(), 29_550);
//!
//! assert!(decode("ABCC1#2").is_err());
//! ```

mod color_mix;
mod decoder;
mod executor;

pub use color_mix::{WhiteMix, mix_white};
pub use decoder::{COMMAND_MARKER, decode};
pub use executor::CommandExecutor;

use std::fmt;

use crate::types::SpeedCode;

/// The kind of a text command, identified by its type letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CommandType {
    /// `C`: set one channel to a raw 0-255 value.
    Channel,
    /// `P`: set one channel to a percentage.
    Percentage,
    /// `R`: set three channels from a packed RGB value.
    Rgb,
    /// `W`: set two channels from a packed warm/cool pair.
    TunableWhite,
    /// `L`: mix two white channels from brightness and color temperature.
    LightCt,
}

impl CommandType {
    /// Looks up a command type by its wire letter.
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'C' => Some(Self::Channel),
            'P' => Some(Self::Percentage),
            'R' => Some(Self::Rgb),
            'W' => Some(Self::TunableWhite),
            'L' => Some(Self::LightCt),
            _ => None,
        }
    }

    /// Returns the wire letter.
    #[must_use]
    pub const fn code(&self) -> char {
        match self {
            Self::Channel => 'C',
            Self::Percentage => 'P',
            Self::Rgb => 'R',
            Self::TunableWhite => 'W',
            Self::LightCt => 'L',
        }
    }

    /// Number of contiguous channels the command writes.
    #[must_use]
    pub const fn required_slots(&self) -> usize {
        match self {
            Self::Channel | Self::Percentage => 1,
            Self::TunableWhite | Self::LightCt => 2,
            Self::Rgb => 3,
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A decoded text command.
///
/// Commands are immutable; the channel and value are kept raw so that range
/// checks happen in one place, the [`CommandExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    command_type: CommandType,
    channel: i32,
    raw_value: i32,
    speed: SpeedCode,
}

impl Command {
    /// Creates an instant command.
    #[must_use]
    pub const fn new(command_type: CommandType, channel: i32, raw_value: i32) -> Self {
        Self {
            command_type,
            channel,
            raw_value,
            speed: SpeedCode::INSTANT,
        }
    }

    /// Sets the speed code.
    #[must_use]
    pub const fn with_speed(mut self, speed: SpeedCode) -> Self {
        self.speed = speed;
        self
    }

    /// Returns the command type.
    #[must_use]
    pub const fn command_type(&self) -> CommandType {
        self.command_type
    }

    /// Returns the start channel as sent (not yet validated).
    #[must_use]
    pub const fn channel(&self) -> i32 {
        self.channel
    }

    /// Returns the raw decimal value as sent.
    #[must_use]
    pub const fn raw_value(&self) -> i32 {
        self.raw_value
    }

    /// Returns the speed code.
    #[must_use]
    pub const fn speed(&self) -> SpeedCode {
        self.speed
    }
}

/// Formats the command in wire syntax, omitting an instant speed.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{COMMAND_MARKER}{}{}#{}",
            self.command_type, self.channel, self.raw_value
        )?;
        if self.speed != SpeedCode::INSTANT {
            write!(f, "#{}", self.speed)?;
        }
        Ok(())
    }
}
